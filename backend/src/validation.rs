//! Request body validation.
//!
//! Handlers deserialize a body into one of the request types below and call `validate`, which
//! either returns the typed input for the data layer or an `ApiError` whose details map each
//! offending field to a message, eg. `{"description": "Description must be at least 10
//! characters"}`. Lengths are counted in characters.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::events::EventType;
use crate::landing_pages::{LandingPageChanges, Section, Theme};
use crate::projects::{NewProject, ProjectChanges, ProjectStatus};
use crate::users::UserChanges;

pub const MAX_PAGE_SIZE: i64 = 100;
const MAX_SECTIONS: usize = 20;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref HEX_COLOR_REGEX: Regex =
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap();
    // Rendered raw into a style block.
    static ref FONT_FAMILY_REGEX: Regex = Regex::new(r#"^[A-Za-z0-9 ,'"-]+$"#).unwrap();
}

/// Collects field errors.
#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        // The first problem found for a field wins.
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn length(
        &mut self,
        field: &str,
        value: &str,
        bounds: (usize, usize),
        messages: (&str, &str),
    ) {
        let len = value.chars().count();
        if len < bounds.0 {
            self.add(field, messages.0);
        } else if len > bounds.1 {
            self.add(field, messages.1);
        }
    }

    pub fn max_length(&mut self, field: &str, value: Option<&String>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.add(field, &format!("Must be at most {} characters", max));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.add(field, "Invalid email address");
        }
    }

    /// An empty string counts as no URL.
    pub fn url_or_empty(&mut self, field: &str, value: Option<&String>) {
        if let Some(value) = value {
            if !value.is_empty() && !is_valid_url(value) {
                self.add(field, "Invalid url");
            }
        }
    }

    pub fn hex_color(&mut self, field: &str, value: &str) {
        if !HEX_COLOR_REGEX.is_match(value) {
            self.add(field, "Invalid hex color");
        }
    }

    pub fn font_family(&mut self, field: &str, value: &str) {
        self.length(
            field,
            value,
            (1, 100),
            ("Font family is required", "Font family is too long"),
        );
        if !value.is_empty() && !FONT_FAMILY_REGEX.is_match(value) {
            self.add(field, "Invalid font family");
        }
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Absolute http or https URL.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Parses a JSON request body. A missing or unparseable body is rejected outright. A body of
/// the wrong shape is a validation failure.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(Value::Null) | Err(_) => return Err(ApiError::bad_request("Request body is required")),
        Ok(value) => value,
    };
    serde_json::from_value(value).map_err(|e| {
        let mut details = FieldErrors::new();
        details.insert("body".to_string(), e.to_string());
        ApiError::validation(details)
    })
}

/// Parses an optional JSON body, treating an empty body as the type's default.
pub fn parse_optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    parse_body(body)
}

fn project_fields(
    v: &mut Validator,
    name: Option<&String>,
    description: Option<&String>,
    target_audience: Option<&String>,
    problem: Option<&String>,
    solution: Option<&String>,
) {
    if let Some(name) = name {
        v.length("name", name, (1, 100), ("Name is required", "Name is too long"));
    }
    if let Some(description) = description {
        v.length(
            "description",
            description,
            (10, 500),
            (
                "Description must be at least 10 characters",
                "Description is too long",
            ),
        );
    }
    if let Some(target_audience) = target_audience {
        v.length(
            "targetAudience",
            target_audience,
            (5, 200),
            ("Target audience is required", "Target audience is too long"),
        );
    }
    if let Some(problem) = problem {
        v.length(
            "problem",
            problem,
            (10, 500),
            ("Problem must be at least 10 characters", "Problem is too long"),
        );
    }
    if let Some(solution) = solution {
        v.length(
            "solution",
            solution,
            (10, 500),
            ("Solution must be at least 10 characters", "Solution is too long"),
        );
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
}

impl CreateProjectRequest {
    pub fn validate(self) -> ApiResult<NewProject> {
        let mut v = Validator::new();
        for (field, value) in [
            ("name", &self.name),
            ("description", &self.description),
            ("targetAudience", &self.target_audience),
            ("problem", &self.problem),
            ("solution", &self.solution),
        ] {
            if value.is_none() {
                v.add(field, "Required");
            }
        }
        project_fields(
            &mut v,
            self.name.as_ref(),
            self.description.as_ref(),
            self.target_audience.as_ref(),
            self.problem.as_ref(),
            self.solution.as_ref(),
        );
        v.finish()?;
        Ok(NewProject {
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            target_audience: self.target_audience.unwrap_or_default(),
            problem: self.problem.unwrap_or_default(),
            solution: self.solution.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub status: Option<String>,
}

impl UpdateProjectRequest {
    pub fn validate(self) -> ApiResult<ProjectChanges> {
        let mut v = Validator::new();
        project_fields(
            &mut v,
            self.name.as_ref(),
            self.description.as_ref(),
            self.target_audience.as_ref(),
            self.problem.as_ref(),
            self.solution.as_ref(),
        );
        let status = match self.status.as_deref() {
            None => None,
            Some(s) => {
                let status = ProjectStatus::parse(s);
                if status.is_none() {
                    v.add(
                        "status",
                        "Invalid enum value. Expected 'draft' | 'generating' | 'ready' | \
                         'published' | 'archived'",
                    );
                }
                status
            }
        };
        v.finish()?;
        Ok(ProjectChanges {
            name: self.name,
            description: self.description,
            target_audience: self.target_audience,
            problem: self.problem,
            solution: self.solution,
            status,
            published_at: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSignupRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub referrer: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl CaptureSignupRequest {
    pub fn validate(self) -> ApiResult<Self> {
        let mut v = Validator::new();
        if self.project_id.is_empty() {
            v.add("projectId", "Project ID is required");
        }
        v.email("email", &self.email);
        v.max_length("name", self.name.as_ref(), 100);
        v.max_length("source", self.source.as_ref(), 50);
        v.url_or_empty("referrer", self.referrer.as_ref());
        v.finish()?;
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub name: Option<String>,
    pub properties: Option<Map<String, Value>>,
    pub session_id: Option<String>,
    pub visitor_id: Option<String>,
    /// The page's own referrer. The request's `Referer` header names the landing page itself.
    pub referrer: Option<String>,
}

/// A tracked event that passed validation.
#[derive(Debug)]
pub struct ValidEvent {
    pub project_id: String,
    pub event_type: EventType,
    pub name: Option<String>,
    pub properties: Option<Map<String, Value>>,
    pub session_id: Option<String>,
    pub visitor_id: Option<String>,
    pub referrer: Option<String>,
}

impl TrackEventRequest {
    pub fn validate(self) -> ApiResult<ValidEvent> {
        let mut v = Validator::new();
        if self.project_id.is_empty() {
            v.add("projectId", "Project ID is required");
        }
        let event_type = EventType::parse(&self.event_type);
        if event_type.is_none() {
            v.add("type", "Invalid event type");
        }
        v.max_length("name", self.name.as_ref(), 100);
        v.finish()?;
        Ok(ValidEvent {
            project_id: self.project_id,
            event_type: event_type.unwrap_or(EventType::Custom),
            name: self.name,
            properties: self.properties,
            session_id: self.session_id,
            visitor_id: self.visitor_id,
            // App referrers such as android-app:// are dropped, not rejected.
            referrer: self.referrer.filter(|r| is_valid_url(r)),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLandingPageRequest {
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

impl UpdateLandingPageRequest {
    pub fn validate(self) -> ApiResult<LandingPageChanges> {
        let mut v = Validator::new();
        if let Some(headline) = self.headline.as_ref() {
            v.length(
                "headline",
                headline,
                (1, 200),
                ("Headline is required", "Headline is too long"),
            );
        }
        v.max_length("subheadline", self.subheadline.as_ref(), 500);
        if let Some(cta_text) = self.cta_text.as_ref() {
            v.length(
                "ctaText",
                cta_text,
                (1, 50),
                ("CTA text is required", "CTA text is too long"),
            );
        }
        v.url_or_empty("ctaUrl", self.cta_url.as_ref());
        v.max_length("seoTitle", self.seo_title.as_ref(), 70);
        v.max_length("seoDescription", self.seo_description.as_ref(), 160);
        v.url_or_empty("ogImage", self.og_image.as_ref());
        v.max_length("customCss", self.custom_css.as_ref(), 10_000);
        if let Some(sections) = self.sections.as_ref() {
            if sections.len() > MAX_SECTIONS {
                v.add(
                    "sections",
                    &format!("At most {} sections are allowed", MAX_SECTIONS),
                );
            }
        }
        if let Some(theme) = self.theme.as_ref() {
            v.hex_color("theme.primaryColor", &theme.primary_color);
            v.hex_color("theme.secondaryColor", &theme.secondary_color);
            v.hex_color("theme.backgroundColor", &theme.background_color);
            v.hex_color("theme.textColor", &theme.text_color);
            v.font_family("theme.fontFamily", &theme.font_family);
        }
        v.finish()?;
        Ok(LandingPageChanges {
            headline: self.headline,
            subheadline: self.subheadline,
            sections: self.sections,
            theme: self.theme,
            cta_text: self.cta_text,
            cta_url: self.cta_url,
            seo_title: self.seo_title,
            seo_description: self.seo_description,
            og_image: self.og_image,
            custom_css: self.custom_css,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> ApiResult<UserChanges> {
        let mut v = Validator::new();
        if let Some(name) = self.name.as_ref() {
            v.length("name", name, (1, 100), ("Name is required", "Name is too long"));
        }
        if let Some(avatar_url) = self.avatar_url.as_ref() {
            if !is_valid_url(avatar_url) {
                v.add("avatarUrl", "Invalid url");
            }
        }
        v.finish()?;
        Ok(UserChanges {
            name: self.name,
            avatar_url: self.avatar_url,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractIdeaRequest {
    #[serde(default)]
    pub input: String,
}

impl ExtractIdeaRequest {
    pub fn validate(self) -> ApiResult<String> {
        let mut v = Validator::new();
        v.length(
            "input",
            self.input.trim(),
            (10, 5000),
            (
                "Describe your idea in at least 10 characters",
                "Input is too long",
            ),
        );
        v.finish()?;
        Ok(self.input)
    }
}

/// `?limit=&cursor=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

impl PaginationQuery {
    /// Returns the limit, or `default` when none was given.
    pub fn limit(&self, default: i64) -> ApiResult<i64> {
        let limit = match self.limit.as_deref() {
            None | Some("") => return Ok(default),
            Some(s) => s.trim().parse::<i64>().ok(),
        };
        match limit {
            Some(limit) if (1..=MAX_PAGE_SIZE).contains(&limit) => Ok(limit),
            _ => {
                let mut v = Validator::new();
                v.add(
                    "limit",
                    &format!("Limit must be a number between 1 and {}", MAX_PAGE_SIZE),
                );
                v.finish().map(|_| default)
            }
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}
