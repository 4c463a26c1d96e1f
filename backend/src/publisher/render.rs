//! Turns a stored landing page into the static files that get uploaded.

use askama::Template;
use chrono::{Datelike, Utc};
use serde_json::Value;

use crate::landing_pages::{LandingPage, Section, SectionType, Theme};
use crate::projects::Project;

pub struct Feature {
    pub title: String,
    pub description: String,
}

pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Template)]
#[template(path = "landing_page.html")]
struct LandingPageTemplate<'a> {
    title: &'a str,
    description: &'a str,
    og_image: Option<&'a str>,
    theme: &'a Theme,
    custom_css: Option<String>,
    headline: &'a str,
    subheadline: &'a str,
    cta_href: &'a str,
    cta_text: &'a str,
    features: Vec<Feature>,
    faqs: Vec<Faq>,
    api_url: &'a str,
    slug: &'a str,
    year: i32,
    project_name: &'a str,
}

#[derive(Template)]
#[template(path = "tracking.js", escape = "none")]
struct TrackingScriptTemplate {
    slug_json: String,
    api_url_json: String,
}

fn items(section: &Section) -> impl Iterator<Item = &serde_json::Map<String, Value>> {
    section
        .content
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn text(item: &serde_json::Map<String, Value>, field: &str) -> String {
    item.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Items of every features and benefits section, in page order.
fn features(sections: &[Section]) -> Vec<Feature> {
    sections
        .iter()
        .filter(|s| matches!(s.section_type, SectionType::Features | SectionType::Benefits))
        .flat_map(items)
        .map(|item| Feature {
            title: text(item, "title"),
            description: text(item, "description"),
        })
        .collect()
}

fn faqs(sections: &[Section]) -> Vec<Faq> {
    sections
        .iter()
        .filter(|s| s.section_type == SectionType::Faq)
        .flat_map(items)
        .map(|item| Faq {
            question: text(item, "question"),
            answer: text(item, "answer"),
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Renders the full HTML page. Every piece of copy is HTML-escaped. Custom CSS is inserted raw
/// into the style block with any `<` removed, so it cannot close the block.
pub fn render_landing_page(
    project: &Project,
    landing_page: &LandingPage,
    api_url: &str,
) -> Result<String, askama::Error> {
    let title = if landing_page.seo_title.is_empty() {
        &project.name
    } else {
        &landing_page.seo_title
    };
    let description = if landing_page.seo_description.is_empty() {
        &project.description
    } else {
        &landing_page.seo_description
    };
    let template = LandingPageTemplate {
        title,
        description,
        og_image: non_empty(&landing_page.og_image),
        theme: &landing_page.theme,
        custom_css: non_empty(&landing_page.custom_css).map(|css| css.replace('<', "")),
        headline: &landing_page.headline,
        subheadline: &landing_page.subheadline,
        cta_href: non_empty(&landing_page.cta_url).unwrap_or("#signup"),
        cta_text: &landing_page.cta_text,
        features: features(&landing_page.sections),
        faqs: faqs(&landing_page.sections),
        api_url: api_url.trim_end_matches('/'),
        slug: &project.slug,
        year: Utc::now().year(),
        project_name: &project.name,
    };
    template.render()
}

/// Renders the script that reports page views, clicks and time on page for `slug`.
pub fn render_tracking_script(slug: &str, api_url: &str) -> Result<String, askama::Error> {
    let template = TrackingScriptTemplate {
        slug_json: Value::from(slug).to_string(),
        api_url_json: Value::from(api_url.trim_end_matches('/')).to_string(),
    };
    template.render()
}
