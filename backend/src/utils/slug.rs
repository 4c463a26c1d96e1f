//! Public landing pages live at `https://<slug>.<landing domain>`. A slug is the project name
//! reduced to lowercase ASCII words joined by hyphens, plus a random 8 character suffix that
//! keeps it globally unique.

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

const SUFFIX_LEN: usize = 8;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_BASE_LEN: usize = 40;

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Lowercase the text, drop everything but ASCII letters and digits, and join the remaining
/// words with single hyphens. eg. "My  App!" becomes "my-app".
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }
    if slug.len() > MAX_BASE_LEN {
        slug.truncate(MAX_BASE_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// eg. "Demo" becomes "demo-x8k2m0qa". Names with no usable characters fall back to "project".
pub fn create_unique_slug(name: &str) -> String {
    let base = slugify(name);
    let base = if base.is_empty() { "project" } else { &base };
    format!("{}-{}", base, random_suffix())
}

pub fn is_valid_slug(slug: &str) -> bool {
    (3..=50).contains(&slug.len()) && SLUG_REGEX.is_match(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Demo"), "demo");
        assert_eq!(slugify("  My   Great App!  "), "my-great-app");
        assert_eq!(slugify("Rust_and-Go"), "rust-and-go");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_unique_slug_format() {
        let re = Regex::new(r"^demo-[a-z0-9]{8}$").unwrap();
        let slug = create_unique_slug("Demo");
        assert!(re.is_match(&slug), "unexpected slug {}", slug);
        assert!(is_valid_slug(&slug));

        assert!(create_unique_slug("???").starts_with("project-"));
    }

    #[test]
    fn test_same_name_gets_different_slugs() {
        let slugs: HashSet<String> = (0..1000).map(|_| create_unique_slug("Demo")).collect();
        assert_eq!(slugs.len(), 1000);
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("demo-abc12345"));
        assert!(!is_valid_slug("Demo-abc12345"));
        assert!(!is_valid_slug("demo--abc"));
        assert!(!is_valid_slug("-demo"));
        assert!(!is_valid_slug("ab"));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let slug = create_unique_slug(&"word ".repeat(30));
        assert!(is_valid_slug(&slug), "unexpected slug {}", slug);
    }
}
