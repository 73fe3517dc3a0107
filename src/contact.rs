//! Routing for the public contact form.
//!
//! The form is either turned into a WhatsApp deep link or into an email handed to an
//! external mailer. Which one, and the destination, come from settings first and the
//! process configuration second.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;

use crate::error::SiteError;
use crate::settings::{SettingsMap, SettingsStore};
use crate::site::setting_text;

pub const DEFAULT_EMAIL_FROM: &str = "noreply@example.com";

const ACTION_KEY: &str = "contactFormAction";
const EMAIL_KEY: &str = "schoolContactEmail";
const WHATSAPP_KEY: &str = "adminSchoolWhatsappNumber";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSubmission {
    pub contact_name: String,
    pub contact_email: String,
    pub phone_number: String,
    pub contact_subject: String,
    pub contact_message: String,
}

impl ContactSubmission {
    fn validate(&self) -> Result<(), SiteError> {
        let required = [
            &self.contact_name,
            &self.contact_subject,
            &self.contact_message,
            &self.phone_number,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(SiteError::BadRequest("All fields are required.".to_string()));
        }
        Ok(())
    }

    fn whatsapp_body(&self) -> String {
        format!(
            "*New Contact Form Submission:*\n-----------------------------\n\
             *Name:* {}\n*Email:* {}\n*Phone Number*: {}\n*Subject:* {}\n\
             -----------------------------\n*Message:*\n{}\n\
             -----------------------------\nSent from the school website.",
            self.contact_name,
            self.contact_email,
            self.phone_number,
            self.contact_subject,
            self.contact_message
        )
    }

    fn email(&self, from_address: &str, to: String) -> OutgoingEmail {
        let text = format!(
            "You have a new contact form submission:\n\nName: {}\nEmail: {}\nPhone Number: {}\nSubject: {}\n\nMessage:\n{}",
            self.contact_name,
            self.contact_email,
            self.phone_number,
            self.contact_subject,
            self.contact_message
        );
        let html = format!(
            "<p><strong>You have a new contact form submission:</strong></p><ul>\
             <li><strong>Name:</strong> {}</li><li><strong>Email:</strong> {}</li>\
             <li><strong>Phone Number:</strong> {}</li><li><strong>Subject:</strong> {}</li></ul>\
             <p><strong>Message:</strong></p><p>{}</p>",
            escape_html(&self.contact_name),
            escape_html(&self.contact_email),
            escape_html(&self.phone_number),
            escape_html(&self.contact_subject),
            escape_html(&self.contact_message).replace('\n', "<br>")
        );
        OutgoingEmail {
            from: format!("\"{} via School Website\" <{from_address}>", self.contact_name),
            reply_to: self.contact_email.clone(),
            to,
            subject: format!("New Contact Form: {}", self.contact_subject),
            text,
            html,
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Message for the external mailer. Sending it is not this crate's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEmail {
    pub from: String,
    pub reply_to: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ContactOutcome {
    #[serde(rename_all = "camelCase")]
    Whatsapp { whatsapp_url: String },
    Email(OutgoingEmail),
}

/// Fallbacks from the process environment, used when settings leave a value blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDefaults {
    pub action: String,
    pub email_to: Option<String>,
    pub whatsapp_number: Option<String>,
    pub email_from: String,
}

impl Default for ContactDefaults {
    fn default() -> Self {
        Self {
            action: "whatsapp".to_string(),
            email_to: None,
            whatsapp_number: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactAction {
    Whatsapp,
    Email,
}

impl fmt::Display for ContactAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactAction::Whatsapp => f.write_str("whatsapp"),
            ContactAction::Email => f.write_str("email"),
        }
    }
}

fn parse_action(raw: &str) -> Result<ContactAction, SiteError> {
    match raw {
        "whatsapp" => Ok(ContactAction::Whatsapp),
        "email" => Ok(ContactAction::Email),
        other => Err(SiteError::Config(format!(
            "Invalid contact form action `{other}`."
        ))),
    }
}

#[derive(Clone)]
pub struct ContactRouter {
    settings: SettingsStore,
    defaults: ContactDefaults,
}

impl ContactRouter {
    #[must_use]
    pub fn new(settings: SettingsStore, defaults: ContactDefaults) -> Self {
        Self { settings, defaults }
    }

    /// Decide where a submission goes.
    ///
    /// # Errors
    /// `SiteError::BadRequest` when a required field is blank; `SiteError::Config` when the
    /// action is unknown or its destination is not configured.
    pub async fn route(&self, submission: &ContactSubmission) -> Result<ContactOutcome, SiteError> {
        submission.validate()?;

        let stored = match self
            .settings
            .read_scalars(&[ACTION_KEY, EMAIL_KEY, WHATSAPP_KEY])
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "failed to read contact settings, using defaults");
                SettingsMap::new()
            }
        };

        let action = parse_action(
            setting_text(&stored, ACTION_KEY).unwrap_or(self.defaults.action.as_str()),
        )?;
        info!(%action, "contact form action determined");

        match action {
            ContactAction::Whatsapp => {
                let number = setting_text(&stored, WHATSAPP_KEY)
                    .map(str::to_string)
                    .or_else(|| self.defaults.whatsapp_number.clone())
                    .filter(|number| !number.is_empty())
                    .ok_or_else(|| {
                        SiteError::Config("WhatsApp number not set.".to_string())
                    })?;
                let url = Url::parse_with_params(
                    &format!("https://wa.me/{number}"),
                    [("text", submission.whatsapp_body())],
                )
                .map_err(|e| SiteError::Config(format!("invalid WhatsApp number `{number}`: {e}")))?;
                Ok(ContactOutcome::Whatsapp {
                    whatsapp_url: url.into(),
                })
            }
            ContactAction::Email => {
                let to = setting_text(&stored, EMAIL_KEY)
                    .map(str::to_string)
                    .or_else(|| self.defaults.email_to.clone())
                    .filter(|to| !to.is_empty())
                    .ok_or_else(|| {
                        SiteError::Config("Email recipient not set.".to_string())
                    })?;
                Ok(ContactOutcome::Email(
                    submission.email(&self.defaults.email_from, to),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            contact_name: "Ada".into(),
            contact_email: "ada@example.org".into(),
            phone_number: "555".into(),
            contact_subject: "Visit".into(),
            contact_message: "Hello\n<b>there</b>".into(),
        }
    }

    #[test]
    fn missing_phone_is_rejected() {
        let mut incomplete = submission();
        incomplete.phone_number = "  ".into();
        assert!(matches!(incomplete.validate(), Err(SiteError::BadRequest(_))));
        assert!(submission().validate().is_ok());
    }

    #[test]
    fn email_html_is_escaped_and_keeps_line_breaks() {
        let email = submission().email(DEFAULT_EMAIL_FROM, "office@example.org".into());
        assert!(email.html.contains("Hello<br>&lt;b&gt;there&lt;/b&gt;"));
        assert_eq!(email.subject, "New Contact Form: Visit");
        assert_eq!(email.reply_to, "ada@example.org");
        assert_eq!(email.from, "\"Ada via School Website\" <noreply@example.com>");
        assert!(email.text.ends_with("Message:\nHello\n<b>there</b>"));
    }

    #[test]
    fn unknown_action_is_a_config_error() {
        assert!(matches!(parse_action("sms"), Err(SiteError::Config(_))));
        assert_eq!(parse_action("email").ok(), Some(ContactAction::Email));
    }

    #[test]
    fn form_fields_use_camel_case() -> Result<(), serde_json::Error> {
        let parsed: ContactSubmission = serde_json::from_str(
            r#"{"contactName":"A","contactEmail":"e","phoneNumber":"1","contactSubject":"s","contactMessage":"m"}"#,
        )?;
        assert_eq!(parsed.phone_number, "1");
        Ok(())
    }
}
