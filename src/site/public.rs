use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::defaults::{MAX_FACILITY_CARDS, merge_settings, object_fields, setting_text};
use crate::carousel::{CarouselImage, CarouselLedger};
use crate::error::SiteError;
use crate::settings::{SettingsMap, SettingsStore};

const FALLBACK_NAME: &str = "Our School";
const FALLBACK_TAGLINE: &str = "Nurturing Young Minds";
const FALLBACK_ALT_TEXT: &str = "School image";
const FALLBACK_CARD_ICON: &str = "bi-check-circle-fill";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideLink {
    pub href: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselSlide {
    pub image_url: String,
    pub alt_text: String,
    pub link: Option<SlideLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityCard {
    pub icon_class: String,
    pub title: String,
    pub description: String,
}

/// Everything the public page shows, with every fallback already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicSite {
    pub school_name: String,
    pub tagline: String,
    pub location_footer: String,
    pub logo_url: String,
    pub about_image_url: String,
    pub academics_image_url: String,
    pub theme: String,
    pub font: String,
    pub slides: Vec<CarouselSlide>,
    pub facility_cards: Vec<FacilityCard>,
    pub social_links: BTreeMap<String, String>,
}

/// Link target for a slide. External URLs are kept as-is, anchors get a leading `#`,
/// and blank links or a bare `#` mean no link.
#[must_use]
pub fn slide_link(raw: Option<&str>) -> Option<SlideLink> {
    let link = raw?.trim();
    if link.is_empty() || link == "#" {
        return None;
    }
    if link.starts_with("http") {
        return Some(SlideLink {
            href: link.to_string(),
            external: true,
        });
    }
    let href = if link.starts_with('#') {
        link.to_string()
    } else {
        format!("#{link}")
    };
    Some(SlideLink {
        href,
        external: false,
    })
}

fn first_text(settings: &SettingsMap, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| setting_text(settings, key))
        .map(str::to_string)
}

fn facility_cards(settings: &SettingsMap) -> Vec<FacilityCard> {
    let cards = settings
        .get("facilityCards")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    cards
        .iter()
        .filter_map(|card| {
            let field = |name: &str| card.get(name).and_then(Value::as_str).unwrap_or_default();
            let title = field("title");
            if title.is_empty() {
                return None;
            }
            let icon = field("iconClass");
            Some(FacilityCard {
                icon_class: if icon.is_empty() { FALLBACK_CARD_ICON } else { icon }.to_string(),
                title: title.to_string(),
                description: field("description").to_string(),
            })
        })
        .take(MAX_FACILITY_CARDS)
        .collect()
}

impl PublicSite {
    /// Build the public view from merged settings and the carousel in display order.
    ///
    /// An empty carousel shows one slide with the configured default image, or no slide
    /// at all when that default is blank.
    #[must_use]
    pub fn assemble(settings: &SettingsMap, images: &[CarouselImage]) -> Self {
        let school_name = first_text(settings, &["schoolName", "defaultHeroTitle"])
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let tagline = first_text(settings, &["schoolTagline", "defaultHeroTagline"])
            .unwrap_or_else(|| FALLBACK_TAGLINE.to_string());

        let slides = if images.is_empty() {
            setting_text(settings, "defaultCarouselImageURL")
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| CarouselSlide {
                    image_url: url.to_string(),
                    alt_text: first_text(settings, &["defaultCarouselAltText"])
                        .unwrap_or_else(|| FALLBACK_ALT_TEXT.to_string()),
                    link: slide_link(setting_text(settings, "defaultCarouselLink")),
                })
                .into_iter()
                .collect()
        } else {
            images
                .iter()
                .map(|image| CarouselSlide {
                    image_url: image.image_url.clone(),
                    alt_text: image
                        .alt_text
                        .clone()
                        .filter(|alt| !alt.is_empty())
                        .unwrap_or_else(|| FALLBACK_ALT_TEXT.to_string()),
                    link: slide_link(image.link_url.as_deref()),
                })
                .collect()
        };

        let social_links = object_fields(settings.get("socialLinks"))
            .into_iter()
            .filter_map(|(name, url)| match url {
                Value::String(url) if !url.is_empty() => Some((name, url)),
                _ => None,
            })
            .collect();

        Self {
            location_footer: first_text(
                settings,
                &["schoolLocationFooter", "defaultSchoolLocationFooter"],
            )
            .unwrap_or_default(),
            logo_url: first_text(settings, &["logoURL", "defaultLogoURL"]).unwrap_or_default(),
            about_image_url: first_text(settings, &["aboutUsImageURL", "defaultAboutImageURL"])
                .unwrap_or_default(),
            academics_image_url: first_text(
                settings,
                &["academicsImageURL", "defaultAcademicsImageURL"],
            )
            .unwrap_or_default(),
            theme: first_text(settings, &["schoolTheme"]).unwrap_or_else(|| "light".to_string()),
            font: first_text(settings, &["schoolFont"])
                .unwrap_or_else(|| "'Poppins', sans-serif".to_string()),
            facility_cards: facility_cards(settings),
            school_name,
            tagline,
            slides,
            social_links,
        }
    }
}

/// Read settings and the carousel, merge with defaults, and assemble the public view.
///
/// # Errors
/// Returns `SiteError::DataAccess` if either table cannot be read.
pub async fn load_public_site(
    settings: &SettingsStore,
    carousel: &CarouselLedger,
) -> Result<PublicSite, SiteError> {
    let stored = settings.read_all().await?;
    let images = carousel.list().await?;
    Ok(PublicSite::assemble(&merge_settings(&stored), &images))
}
