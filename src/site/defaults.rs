use serde_json::{Map, Value, json};

use crate::settings::{STRUCTURED_KEYS, SettingsMap, StructuredShape};

pub const MAX_FACILITY_CARDS: usize = 6;

fn empty_card() -> Value {
    json!({ "iconClass": "", "title": "", "description": "" })
}

/// Values the site falls back to for every setting an operator has not saved.
#[must_use]
pub fn default_settings() -> SettingsMap {
    let defaults = json!({
        "schoolName": "",
        "defaultHeroTitle": "Welcome to Our School",
        "schoolTagline": "",
        "defaultHeroTagline": "Nurturing Future Leaders",
        "schoolLocationFooter": "",
        "defaultSchoolLocationFooter": "No location available contact admin.",
        "logoURL": "",
        "defaultLogoURL": "/uploads/logo-default.png",
        "aboutUsImageURL": "",
        "defaultAboutImageURL": "/uploads/about-us-default.jpg",
        "academicsImageURL": "",
        "defaultAcademicsImageURL": "/uploads/academics-default.jpg",
        "schoolFont": "'Poppins', sans-serif",
        "schoolTheme": "light",
        "aboutUsText": "<p>Default About Us. Configure in admin.</p>",
        "academics": "<p>Default Academics. Configure in admin.</p>",
        "admission": "<p>Default Admissions. Configure in admin.</p>",
        "facilitiesText": "<p>Default Facilities Overview. Configure in admin.</p>",
        "socialLinks": { "facebook": "", "twitter": "", "instagram": "", "linkedin": "", "youtube": "" },
        "socialWhatsapp": "",
        "contactMapEmbedURL": "",
        "facilityCards": vec![empty_card(); MAX_FACILITY_CARDS],
        "aboutGradient": { "color1": "#e0c3fc", "color2": "#8ec5fc", "color3": "#000000", "color4": "#000000", "direction": "to right" },
        "admissionsGradient": { "color1": "#007bff", "color2": "#6f42c1", "color3": "#000000", "color4": "#000000", "direction": "135deg" },
        "academicsGradient": { "color1": "#f8f9fa", "color2": "#e9ecef", "color3": "#000000", "color4": "#000000", "direction": "to bottom right" },
        "facilitiesGradient": { "color1": "#f8f9fa", "color2": "#ffffff", "color3": "#000000", "color4": "#000000", "direction": "to right" },
        "contactGradient": { "color1": "#ffffff", "color2": "#e9ecef", "color3": "#000000", "color4": "#000000", "direction": "to right" },
        "heroGradient": { "color1": "#007bff", "color2": "#6f42c1", "color3": "#fd7e14", "color4": "#00c6ff", "direction": "45deg" },
        "defaultCarouselImageURL": "/uploads/placeholder-carousel.jpg",
        "defaultCarouselAltText": "Our Beautiful Campus",
        "defaultCarouselLink": "#about",
        "contactFormAction": "whatsapp",
        "schoolContactEmail": "",
        "adminSchoolWhatsappNumber": ""
    });
    match defaults {
        Value::Object(map) => map.into_iter().collect(),
        _ => SettingsMap::new(),
    }
}

fn merge_object(default: &Value, stored: Option<&Value>) -> Value {
    let mut merged = default.as_object().cloned().unwrap_or_default();
    if let Some(Value::Object(fields)) = stored {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

fn merge_cards(default: &Value, stored: Option<&Value>) -> Value {
    let mut cards: Vec<Value> = match stored {
        Some(Value::Array(list)) if !list.is_empty() => list
            .iter()
            .take(MAX_FACILITY_CARDS)
            .map(|card| merge_object(&empty_card(), Some(card)))
            .collect(),
        _ => default.as_array().cloned().unwrap_or_default(),
    };
    while cards.len() < MAX_FACILITY_CARDS {
        cards.push(empty_card());
    }
    Value::Array(cards)
}

/// Overlay stored settings on the defaults.
///
/// Stored values win key by key. Object-shaped structured keys merge field by field.
/// `facilityCards` uses the stored list when it is non-empty, with every card given the
/// full set of fields, and is always exactly six cards long.
#[must_use]
pub fn merge_settings(stored: &SettingsMap) -> SettingsMap {
    let defaults = default_settings();
    let mut merged = defaults.clone();
    for (key, value) in stored {
        merged.insert(key.clone(), value.clone());
    }
    for (key, shape) in STRUCTURED_KEYS {
        let default = defaults
            .get(*key)
            .cloned()
            .unwrap_or_else(|| shape.empty());
        let value = match shape {
            StructuredShape::Object => merge_object(&default, stored.get(*key)),
            StructuredShape::List => merge_cards(&default, stored.get(*key)),
        };
        merged.insert((*key).to_string(), value);
    }
    merged
}

/// Non-empty string value of a setting.
#[must_use]
pub fn setting_text<'a>(settings: &'a SettingsMap, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

pub(crate) fn object_fields(value: Option<&Value>) -> Map<String, Value> {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}
