//! Publishes landing pages as static files.
//!
//! A published page lives under its project's slug in an object store bucket:
//!
//!   {slug}/index.html
//!   {slug}/tracking.js
//!
//! and is served by a CDN at `https://{slug}.{landing_domain}`. After every upload or delete
//! the CDN is told to drop its cached copies of the slug's paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusoto_cloudfront::{
    CloudFront, CloudFrontClient, CreateInvalidationRequest, InvalidationBatch, Paths,
};
use rusoto_s3::{DeleteObjectRequest, PutObjectRequest, S3Client, S3};
use thiserror::Error;

use crate::landing_pages::LandingPage;
use crate::projects::Project;
use crate::utils::time;

pub mod render;

pub use render::{render_landing_page, render_tracking_script};

const CACHE_CONTROL: &str = "public, max-age=3600";
const HTML_CONTENT_TYPE: &str = "text/html";
const SCRIPT_CONTENT_TYPE: &str = "application/javascript";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("object storage error: {0}")]
    Storage(String),
    #[error("CDN invalidation error: {0}")]
    Cdn(String),
    #[error("could not render landing page: {0}")]
    Render(#[from] askama::Error),
}

pub type PublishResult<T> = Result<T, PublishError>;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> PublishResult<()>;

    async fn delete_object(&self, key: &str) -> PublishResult<()>;
}

#[async_trait]
pub trait CdnInvalidator: Send + Sync {
    async fn invalidate(&self, paths: Vec<String>, caller_reference: &str) -> PublishResult<()>;
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> PublishResult<()> {
        let input = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            body: Some(body.into()),
            content_type: Some(content_type.to_string()),
            cache_control: Some(cache_control.to_string()),
            ..Default::default()
        };
        self.client
            .put_object(input)
            .await
            .map_err(|e| PublishError::Storage(format!("put {}: {}", key, e)))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> PublishResult<()> {
        let input = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            ..Default::default()
        };
        self.client
            .delete_object(input)
            .await
            .map_err(|e| PublishError::Storage(format!("delete {}: {}", key, e)))?;
        Ok(())
    }
}

pub struct CloudFrontInvalidator {
    client: CloudFrontClient,
    distribution_id: String,
}

impl CloudFrontInvalidator {
    pub fn new(client: CloudFrontClient, distribution_id: String) -> Self {
        Self {
            client,
            distribution_id,
        }
    }
}

#[async_trait]
impl CdnInvalidator for CloudFrontInvalidator {
    async fn invalidate(&self, paths: Vec<String>, caller_reference: &str) -> PublishResult<()> {
        let input = CreateInvalidationRequest {
            distribution_id: self.distribution_id.clone(),
            invalidation_batch: InvalidationBatch {
                caller_reference: caller_reference.to_string(),
                paths: Paths {
                    quantity: paths.len() as i64,
                    items: Some(paths),
                },
            },
        };
        self.client
            .create_invalidation(input)
            .await
            .map_err(|e| PublishError::Cdn(e.to_string()))?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

/// Keeps objects in memory. Used when running locally without a bucket.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.objects.lock() {
            Ok(objects) => objects.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> PublishResult<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> PublishResult<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        objects.remove(key);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub url: String,
    pub published_at: String,
}

/// Uploads and removes landing pages. `cdn` is optional so local runs can skip invalidation.
#[derive(Clone)]
pub struct Publisher {
    storage: Arc<dyn ObjectStorage>,
    cdn: Option<Arc<dyn CdnInvalidator>>,
    landing_domain: String,
    api_url: String,
}

fn html_key(slug: &str) -> String {
    format!("{}/index.html", slug)
}

fn script_key(slug: &str) -> String {
    format!("{}/tracking.js", slug)
}

impl Publisher {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        cdn: Option<Arc<dyn CdnInvalidator>>,
        landing_domain: &str,
        api_url: &str,
    ) -> Self {
        Self {
            storage,
            cdn,
            landing_domain: landing_domain.to_string(),
            api_url: api_url.to_string(),
        }
    }

    pub fn page_url(&self, slug: &str) -> String {
        format!("https://{}.{}", slug, self.landing_domain)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Renders and uploads the page and its tracking script, then invalidates the slug's
    /// cached paths. Publishing again overwrites both files.
    pub async fn publish(
        &self,
        project: &Project,
        landing_page: &LandingPage,
    ) -> PublishResult<Published> {
        let slug = &project.slug;
        let html = render_landing_page(project, landing_page, &self.api_url)?;
        let script = render_tracking_script(slug, &self.api_url)?;
        self.storage
            .put_object(
                &html_key(slug),
                html.into_bytes(),
                HTML_CONTENT_TYPE,
                CACHE_CONTROL,
            )
            .await?;
        self.storage
            .put_object(
                &script_key(slug),
                script.into_bytes(),
                SCRIPT_CONTENT_TYPE,
                CACHE_CONTROL,
            )
            .await?;
        self.invalidate(
            vec![format!("/{}/*", slug), format!("/{}/index.html", slug)],
            &format!("{}-{}", slug, Utc::now().timestamp_millis()),
        )
        .await?;
        log::info!("Published landing page for project {} at {}", project.id, slug);
        Ok(Published {
            url: self.page_url(slug),
            published_at: time::now_iso_str(),
        })
    }

    /// Deletes the page and its tracking script, then invalidates the slug's cached paths.
    pub async fn unpublish(&self, project: &Project) -> PublishResult<()> {
        let slug = &project.slug;
        self.storage.delete_object(&html_key(slug)).await?;
        self.storage.delete_object(&script_key(slug)).await?;
        self.invalidate(
            vec![format!("/{}/*", slug)],
            &format!("{}-unpublish-{}", slug, Utc::now().timestamp_millis()),
        )
        .await?;
        log::info!("Unpublished landing page for project {}", project.id);
        Ok(())
    }

    async fn invalidate(&self, paths: Vec<String>, caller_reference: &str) -> PublishResult<()> {
        match &self.cdn {
            Some(cdn) => cdn.invalidate(paths, caller_reference).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use crate::landing_pages;
    use crate::projects::ProjectStatus;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// Records every invalidation instead of calling a CDN.
    #[derive(Default)]
    pub struct RecordingCdn {
        pub invalidations: Mutex<Vec<(Vec<String>, String)>>,
    }

    #[async_trait]
    impl CdnInvalidator for RecordingCdn {
        async fn invalidate(
            &self,
            paths: Vec<String>,
            caller_reference: &str,
        ) -> PublishResult<()> {
            self.invalidations
                .lock()
                .unwrap()
                .push((paths, caller_reference.to_string()));
            Ok(())
        }
    }

    fn project() -> Project {
        Project {
            id: "p_1".to_string(),
            user_id: "u_1".to_string(),
            name: "Demo".to_string(),
            slug: "demo-abcd1234".to_string(),
            description: "A test project description".to_string(),
            target_audience: "Testers".to_string(),
            problem: "Problem text here".to_string(),
            solution: "Solution text here".to_string(),
            status: ProjectStatus::Ready,
            published_at: None,
            created_at: time::now_iso_str(),
            updated_at: time::now_iso_str(),
        }
    }

    fn landing_page() -> LandingPage {
        let new = landing_pages::tests::new_landing_page("p_1");
        LandingPage {
            project_id: new.project_id,
            headline: new.headline,
            subheadline: new.subheadline,
            sections: new.sections,
            theme: new.theme,
            cta_text: new.cta_text,
            cta_url: new.cta_url,
            seo_title: new.seo_title,
            seo_description: new.seo_description,
            og_image: new.og_image,
            custom_css: new.custom_css,
            version: 1,
            created_at: time::now_iso_str(),
            updated_at: time::now_iso_str(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_unpublish() -> TestResult {
        let storage = Arc::new(MemoryStorage::new());
        let cdn = Arc::new(RecordingCdn::default());
        let publisher = Publisher::new(
            storage.clone(),
            Some(cdn.clone() as Arc<dyn CdnInvalidator>),
            "maistro.live",
            "https://api.test",
        );

        let published = publisher.publish(&project(), &landing_page()).await?;
        assert_eq!(published.url, "https://demo-abcd1234.maistro.live");
        assert_eq!(
            storage.keys(),
            vec!["demo-abcd1234/index.html", "demo-abcd1234/tracking.js"]
        );
        let html = storage.get("demo-abcd1234/index.html").unwrap();
        assert_eq!(html.content_type, "text/html");
        assert_eq!(html.cache_control, "public, max-age=3600");
        assert!(String::from_utf8(html.body)?.contains("Validate ideas fast"));
        let script = storage.get("demo-abcd1234/tracking.js").unwrap();
        assert_eq!(script.content_type, "application/javascript");

        publisher.unpublish(&project()).await?;
        assert!(storage.keys().is_empty());

        let invalidations = cdn.invalidations.lock().unwrap();
        assert_eq!(invalidations.len(), 2);
        assert_eq!(
            invalidations[0].0,
            vec!["/demo-abcd1234/*", "/demo-abcd1234/index.html"]
        );
        assert!(invalidations[0].1.starts_with("demo-abcd1234-"));
        assert_eq!(invalidations[1].0, vec!["/demo-abcd1234/*"]);
        assert!(invalidations[1].1.starts_with("demo-abcd1234-unpublish-"));
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_without_cdn() -> TestResult {
        let storage = Arc::new(MemoryStorage::new());
        let publisher = Publisher::new(storage.clone(), None, "maistro.live", "https://api.test");
        publisher.publish(&project(), &landing_page()).await?;
        assert_eq!(storage.keys().len(), 2);
        Ok(())
    }
}
