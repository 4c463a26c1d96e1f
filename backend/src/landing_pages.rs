use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dynamodb::keys::{self, LANDING_PAGE_ENTITY};
use crate::dynamodb::{
    entity_item, from_item, update_existing, Store, StoreResult, Update, WriteCondition,
};
use crate::utils::time;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Hero,
    Features,
    Benefits,
    Testimonials,
    Cta,
    Faq,
}

/// A block of generated copy. The shape of `content` depends on the section type, eg. a
/// features section holds `{"items": [{"title", "description", "icon"}]}`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Section {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub content: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#2563eb".to_string(),
            secondary_color: "#1e40af".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#1f2937".to_string(),
            font_family: "Inter, system-ui, sans-serif".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LandingPage {
    pub project_id: String,
    pub headline: String,
    pub subheadline: String,
    pub sections: Vec<Section>,
    pub theme: Theme,
    pub cta_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,
    pub seo_title: String,
    pub seo_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    /// Starts at 1 and goes up by exactly 1 on every update.
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct NewLandingPage {
    pub project_id: String,
    pub headline: String,
    pub subheadline: String,
    pub sections: Vec<Section>,
    pub theme: Theme,
    pub cta_text: String,
    pub cta_url: Option<String>,
    pub seo_title: String,
    pub seo_description: String,
    pub og_image: Option<String>,
    pub custom_css: Option<String>,
}

/// Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingPageChanges {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub sections: Option<Vec<Section>>,
    pub theme: Option<Theme>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub og_image: Option<String>,
    pub custom_css: Option<String>,
}

/// Creates version 1 of a project's landing page. Fails with `ConditionalCheckFailed` if the
/// project already has one.
pub async fn create_landing_page(
    store: &dyn Store,
    input: NewLandingPage,
) -> StoreResult<LandingPage> {
    let timestamp = time::now_iso_str();
    let landing_page = LandingPage {
        project_id: input.project_id,
        headline: input.headline,
        subheadline: input.subheadline,
        sections: input.sections,
        theme: input.theme,
        cta_text: input.cta_text,
        cta_url: input.cta_url,
        seo_title: input.seo_title,
        seo_description: input.seo_description,
        og_image: input.og_image,
        custom_css: input.custom_css,
        version: 1,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    let item = entity_item(
        &landing_page,
        &keys::landing_page_key(&landing_page.project_id),
        None,
        LANDING_PAGE_ENTITY,
    )?;
    store
        .put_item(item, Some(WriteCondition::KeyNotExists))
        .await?;
    Ok(landing_page)
}

pub async fn get_landing_page(
    store: &dyn Store,
    project_id: &str,
) -> StoreResult<Option<LandingPage>> {
    match store.get_item(&keys::landing_page_key(project_id)).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

/// Applies the changes and bumps `version` atomically. `None` if there is no landing page.
pub async fn update_landing_page(
    store: &dyn Store,
    project_id: &str,
    changes: &LandingPageChanges,
) -> StoreResult<Option<LandingPage>> {
    let update = Update::new(keys::landing_page_key(project_id))
        .set("updatedAt", &time::now_iso_str())?
        .set_opt("headline", changes.headline.as_ref())?
        .set_opt("subheadline", changes.subheadline.as_ref())?
        .set_opt("sections", changes.sections.as_ref())?
        .set_opt("theme", changes.theme.as_ref())?
        .set_opt("ctaText", changes.cta_text.as_ref())?
        .set_opt("ctaUrl", changes.cta_url.as_ref())?
        .set_opt("seoTitle", changes.seo_title.as_ref())?
        .set_opt("seoDescription", changes.seo_description.as_ref())?
        .set_opt("ogImage", changes.og_image.as_ref())?
        .set_opt("customCss", changes.custom_css.as_ref())?
        .increment(&["version"], 1);
    match update_existing(store, update).await? {
        Some(item) => Ok(Some(from_item(item)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use serde_json::json;

    use crate::dynamodb::{MemoryStore, StoreError};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    pub fn new_landing_page(project_id: &str) -> NewLandingPage {
        let content = json!({
            "items": [
                {"title": "Fast", "description": "Ships in a day", "icon": "zap"},
                {"title": "Safe", "description": "No surprises", "icon": "shield"}
            ]
        });
        NewLandingPage {
            project_id: project_id.to_string(),
            headline: "Validate ideas fast".to_string(),
            subheadline: "Launch a landing page in minutes".to_string(),
            sections: vec![Section {
                section_type: SectionType::Features,
                content: content.as_object().cloned().unwrap_or_default(),
            }],
            theme: Theme::default(),
            cta_text: "Join the waitlist".to_string(),
            cta_url: None,
            seo_title: "Validate ideas fast".to_string(),
            seo_description: "Launch a landing page in minutes".to_string(),
            og_image: None,
            custom_css: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_landing_page() -> TestResult {
        let store = MemoryStore::new();
        let page = create_landing_page(&store, new_landing_page("p_1")).await?;
        assert_eq!(page.version, 1);
        assert_eq!(page.theme.primary_color, "#2563eb");

        let found = get_landing_page(&store, "p_1").await?;
        assert_eq!(found.as_ref(), Some(&page));
        assert!(get_landing_page(&store, "p_2").await?.is_none());

        let again = create_landing_page(&store, new_landing_page("p_1")).await;
        assert!(matches!(again, Err(StoreError::ConditionalCheckFailed)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_bumps_version_by_one() -> TestResult {
        let store = MemoryStore::new();
        let mut page = create_landing_page(&store, new_landing_page("p_1")).await?;
        for i in 0..5 {
            let changes = LandingPageChanges {
                headline: Some(format!("Headline {}", i)),
                ..Default::default()
            };
            let updated = update_landing_page(&store, "p_1", &changes)
                .await?
                .unwrap();
            assert_eq!(updated.version, page.version + 1);
            assert!(updated.updated_at >= page.updated_at);
            assert_eq!(updated.headline, format!("Headline {}", i));
            assert_eq!(updated.subheadline, page.subheadline);
            assert_eq!(updated.sections, page.sections);
            assert_eq!(updated.created_at, page.created_at);
            page = updated;
        }
        assert_eq!(page.version, 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_theme_and_optional_fields() -> TestResult {
        let store = MemoryStore::new();
        create_landing_page(&store, new_landing_page("p_1")).await?;
        let theme = Theme {
            primary_color: "#000000".to_string(),
            ..Theme::default()
        };
        let changes = LandingPageChanges {
            theme: Some(theme.clone()),
            cta_url: Some("https://example.com/join".to_string()),
            ..Default::default()
        };
        let updated = update_landing_page(&store, "p_1", &changes)
            .await?
            .unwrap();
        assert_eq!(updated.theme, theme);
        assert_eq!(updated.cta_url.as_deref(), Some("https://example.com/join"));
        assert_eq!(updated.og_image, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_landing_page() -> TestResult {
        let store = MemoryStore::new();
        let changes = LandingPageChanges {
            headline: Some("Nope".to_string()),
            ..Default::default()
        };
        assert!(update_landing_page(&store, "p_1", &changes).await?.is_none());
        assert!(store.is_empty());
        Ok(())
    }
}
