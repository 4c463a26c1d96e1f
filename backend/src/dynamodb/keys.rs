//! Key construction for every entity stored in the table.
//!
//! | entity       | PK               | SK                               | GSI1PK          | GSI1SK    |
//! |--------------|------------------|----------------------------------|-----------------|-----------|
//! | user         | `USER#<user>`    | `PROFILE`                        | `EMAIL#<email>` | `USER`    |
//! | project      | `USER#<user>`    | `PROJECT#<project>`              | `SLUG#<slug>`   | `PROJECT` |
//! | landing page | `PROJECT#<proj>` | `LANDING_PAGE`                   |                 |           |
//! | signup       | `PROJECT#<proj>` | `SIGNUP#<created at>#<signup>`   |                 |           |
//! | event        | `PROJECT#<proj>` | `EVENT#<created at>#<event>`     |                 |           |
//! | daily stats  | `PROJECT#<proj>` | `STATS#<date>`                   |                 |           |
//! | visitor      | `PROJECT#<proj>` | `VISITOR#<date>#<visitor>`       |                 |           |
//!
//! Creation timestamps are fixed-width ISO 8601 strings, so signups and events sort
//! chronologically by `SK`.

use super::Key;

pub const ENTITY_TYPE: &str = "entityType";

pub const USER_ENTITY: &str = "USER";
pub const PROJECT_ENTITY: &str = "PROJECT";
pub const LANDING_PAGE_ENTITY: &str = "LANDING_PAGE";
pub const SIGNUP_ENTITY: &str = "SIGNUP";
pub const EVENT_ENTITY: &str = "EVENT";
pub const STATS_ENTITY: &str = "STATS";
pub const VISITOR_ENTITY: &str = "VISITOR";

pub const PROJECT_PREFIX: &str = "PROJECT#";
pub const SIGNUP_PREFIX: &str = "SIGNUP#";
pub const EVENT_PREFIX: &str = "EVENT#";
pub const STATS_PREFIX: &str = "STATS#";

pub fn user_pk(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

pub fn user_key(user_id: &str) -> Key {
    Key::new(user_pk(user_id), "PROFILE".to_string())
}

pub fn user_gsi1pk(email: &str) -> String {
    format!("EMAIL#{}", email)
}

pub const USER_GSI1SK: &str = "USER";

pub fn project_key(user_id: &str, project_id: &str) -> Key {
    Key::new(user_pk(user_id), format!("{}{}", PROJECT_PREFIX, project_id))
}

pub fn project_gsi1pk(slug: &str) -> String {
    format!("SLUG#{}", slug)
}

pub const PROJECT_GSI1SK: &str = "PROJECT";

/// Partition holding a project's landing page, signups, events and stats.
pub fn project_pk(project_id: &str) -> String {
    format!("{}{}", PROJECT_PREFIX, project_id)
}

pub fn landing_page_key(project_id: &str) -> Key {
    Key::new(project_pk(project_id), "LANDING_PAGE".to_string())
}

pub fn signup_key(project_id: &str, created_at: &str, signup_id: &str) -> Key {
    Key::new(
        project_pk(project_id),
        format!("{}{}#{}", SIGNUP_PREFIX, created_at, signup_id),
    )
}

pub fn event_key(project_id: &str, created_at: &str, event_id: &str) -> Key {
    Key::new(
        project_pk(project_id),
        format!("{}{}#{}", EVENT_PREFIX, created_at, event_id),
    )
}

pub fn stats_sk(date: &str) -> String {
    format!("{}{}", STATS_PREFIX, date)
}

pub fn stats_key(project_id: &str, date: &str) -> Key {
    Key::new(project_pk(project_id), stats_sk(date))
}

pub fn visitor_key(project_id: &str, date: &str, visitor_id: &str) -> Key {
    Key::new(
        project_pk(project_id),
        format!("VISITOR#{}#{}", date, visitor_id),
    )
}
