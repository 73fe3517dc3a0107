use std::sync::Arc;

use serde_json::json;
use sitekeeper::prelude::*;
use tempfile::tempdir;

fn submission() -> ContactSubmission {
    ContactSubmission {
        contact_name: "Ada".into(),
        contact_email: "ada@example.org".into(),
        phone_number: "555 0100".into(),
        contact_subject: "Open day".into(),
        contact_message: "When is it?".into(),
    }
}

#[test]
fn public_view_falls_back_to_defaults_on_an_empty_database() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let settings = SettingsStore::new(manager.database());
        let ledger = CarouselLedger::new(
            manager.database(),
            Arc::new(MemoryObjectStore::new()),
            UploadPolicy::default(),
        );

        let site = load_public_site(&settings, &ledger).await?;
        assert_eq!(site.school_name, "Welcome to Our School");
        assert_eq!(site.logo_url, "/uploads/logo-default.png");
        assert_eq!(site.slides.len(), 1);
        assert_eq!(site.slides[0].image_url, "/uploads/placeholder-carousel.jpg");
        assert!(site.facility_cards.is_empty());

        settings.replace("schoolName", &json!("Hillside Academy")).await?;
        settings.replace("logoURL", &json!("https://cdn.example/logo.png")).await?;
        let created = ledger
            .create(NewCarouselImage {
                file: UploadedFile::new("campus.jpg", "image/jpeg", vec![1, 2, 3]),
                alt_text: Some("Campus".into()),
                link_url: Some("admissions".into()),
            })
            .await?;

        let site = load_public_site(&settings, &ledger).await?;
        assert_eq!(site.school_name, "Hillside Academy");
        assert_eq!(site.logo_url, "https://cdn.example/logo.png");
        assert_eq!(site.slides.len(), 1);
        assert_eq!(site.slides[0].image_url, created.image_url);
        assert_eq!(site.slides[0].alt_text, "Campus");
        assert_eq!(
            site.slides[0].link.as_ref().map(|link| link.href.as_str()),
            Some("#admissions")
        );

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn contact_form_routes_by_stored_action() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let settings = SettingsStore::new(manager.database());

        // nothing configured: whatsapp by default, but no number anywhere
        let bare = ContactRouter::new(settings.clone(), ContactDefaults::default());
        assert!(matches!(bare.route(&submission()).await, Err(SiteError::Config(_))));

        let with_number = ContactRouter::new(
            settings.clone(),
            ContactDefaults {
                whatsapp_number: Some("15550100".into()),
                ..ContactDefaults::default()
            },
        );
        match with_number.route(&submission()).await? {
            ContactOutcome::Whatsapp { whatsapp_url } => {
                assert!(whatsapp_url.starts_with("https://wa.me/15550100?text="));
                assert!(whatsapp_url.contains("Open"));
            }
            other => panic!("expected whatsapp, got {other:?}"),
        }

        settings.replace("contactFormAction", &json!("email")).await?;
        assert!(matches!(bare.route(&submission()).await, Err(SiteError::Config(_))));

        settings.replace("schoolContactEmail", &json!("office@example.org")).await?;
        match bare.route(&submission()).await? {
            ContactOutcome::Email(email) => {
                assert_eq!(email.to, "office@example.org");
                assert_eq!(email.reply_to, "ada@example.org");
                assert_eq!(email.subject, "New Contact Form: Open day");
            }
            other => panic!("expected email, got {other:?}"),
        }

        settings.replace("contactFormAction", &json!("carrier-pigeon")).await?;
        assert!(matches!(bare.route(&submission()).await, Err(SiteError::Config(_))));

        let mut incomplete = submission();
        incomplete.contact_message.clear();
        assert!(matches!(bare.route(&incomplete).await, Err(SiteError::BadRequest(_))));

        manager.close().await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn contact_defaults_survive_a_closed_database() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::embedded(dir.path().join("school.db")).await?;
        let router = ContactRouter::new(
            SettingsStore::new(manager.database()),
            ContactDefaults {
                whatsapp_number: Some("15550100".into()),
                ..ContactDefaults::default()
            },
        );
        manager.close().await?;

        let outcome = router.route(&submission()).await?;
        assert!(matches!(outcome, ContactOutcome::Whatsapp { .. }));
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}

#[test]
fn asset_upload_to_local_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let uploads = dir.path().join("uploads");
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let store = Arc::new(LocalDirStore::new(&uploads, "/uploads"));
        let uploader = AssetUploader::new(store, UploadPolicy::default());
        let asset = uploader
            .upload_asset(
                AssetKind::Logo,
                &UploadedFile::new("School Logo.png", "image/png", vec![1, 2, 3, 4]),
            )
            .await?;
        assert!(asset.url.starts_with("/uploads/"));
        let name = asset.url.trim_start_matches("/uploads/");
        assert_eq!(std::fs::read(uploads.join(name)).map_err(UploadError::Io)?, vec![1, 2, 3, 4]);
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}
