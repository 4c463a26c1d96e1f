use std::str::FromStr;

use anyhow::{anyhow, Context};
use clap::{App, Arg, ArgMatches};

pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const BLOCKED_EMAIL_DOMAINS_ENV_VAR: &str = "BLOCKED_EMAIL_DOMAINS";
pub const AUTH_TRIGGER_SECRET_ENV_VAR: &str = "AUTH_TRIGGER_SECRET";

/// Which `Store` implementation backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    DynamoDb,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamodb" => Ok(StoreKind::DynamoDb),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(anyhow!("Unknown store {}. Expected dynamodb or memory", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub log_level: log::LevelFilter,
    pub store: StoreKind,
    /// Table name prefix, eg. "local", "staging", "production".
    pub dynamodb_env: String,
    /// Custom endpoint, eg. DynamoDB Local at "http://127.0.0.1:8000".
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub landing_pages_bucket: String,
    /// CDN invalidation is skipped when there is no distribution.
    pub cdn_distribution_id: Option<String>,
    pub landing_domain: String,
    /// Public base URL of this API. Published pages post signups and events to it.
    pub api_url: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub model: String,
    pub fast_model: String,
    pub blocked_email_domains: Vec<String>,
    pub auth_trigger_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: log::LevelFilter::Info,
            store: StoreKind::DynamoDb,
            dynamodb_env: "local".to_string(),
            dynamodb_endpoint: None,
            aws_region: "us-east-1".to_string(),
            landing_pages_bucket: "landing-pages".to_string(),
            cdn_distribution_id: None,
            landing_domain: "maistro.live".to_string(),
            api_url: "http://localhost:8080".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: String::new(),
            model: "gpt-4o".to_string(),
            fast_model: "gpt-4o-mini".to_string(),
            blocked_email_domains: Vec::new(),
            auth_trigger_secret: None,
        }
    }
}

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("backend")
        .version("0.1")
        .arg(
            Arg::with_name("port")
                .long("port")
                .help("The port for the HTTP server")
                .takes_value(true)
                .value_name("PORT")
                .default_value("8080"),
        )
        .arg(
            Arg::with_name("log_level")
                .long("log_level")
                .help("One of error, warn, info, debug, trace")
                .takes_value(true)
                .value_name("LEVEL")
                .default_value("info"),
        )
        .arg(
            Arg::with_name("store")
                .long("store")
                .help("Where items are stored: dynamodb, or memory for local development")
                .takes_value(true)
                .value_name("STORE")
                .possible_values(&["dynamodb", "memory"])
                .default_value("dynamodb"),
        )
        .arg(
            Arg::with_name("dynamodb_env")
                .long("dynamodb_env")
                .help("Prefix of the DynamoDB table name, eg. local, staging, production")
                .takes_value(true)
                .value_name("ENV")
                .default_value("local"),
        )
        .arg(
            Arg::with_name("dynamodb_endpoint")
                .long("dynamodb_endpoint")
                .help("Custom DynamoDB endpoint, eg. http://127.0.0.1:8000 for DynamoDB Local")
                .takes_value(true)
                .value_name("URL"),
        )
        .arg(
            Arg::with_name("aws_region")
                .long("aws_region")
                .help("AWS region of the table, bucket and distribution")
                .takes_value(true)
                .value_name("REGION")
                .default_value("us-east-1"),
        )
        .arg(
            Arg::with_name("landing_pages_bucket")
                .long("landing_pages_bucket")
                .help("S3 bucket that holds published landing pages")
                .takes_value(true)
                .value_name("BUCKET")
                .default_value("landing-pages"),
        )
        .arg(
            Arg::with_name("cdn_distribution_id")
                .long("cdn_distribution_id")
                .help("CloudFront distribution in front of the landing pages bucket")
                .takes_value(true)
                .value_name("ID"),
        )
        .arg(
            Arg::with_name("landing_domain")
                .long("landing_domain")
                .help("Published pages are served at https://<slug>.<landing_domain>")
                .takes_value(true)
                .value_name("DOMAIN")
                .default_value("maistro.live"),
        )
        .arg(
            Arg::with_name("api_url")
                .long("api_url")
                .help("Public base URL of this API")
                .takes_value(true)
                .value_name("URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::with_name("openai_base_url")
                .long("openai_base_url")
                .help("Base URL of the chat completions API")
                .takes_value(true)
                .value_name("URL")
                .default_value("https://api.openai.com/v1"),
        )
        .arg(
            Arg::with_name("model")
                .long("model")
                .help("Model for landing page copy and results summaries")
                .takes_value(true)
                .value_name("MODEL")
                .default_value("gpt-4o"),
        )
        .arg(
            Arg::with_name("fast_model")
                .long("fast_model")
                .help("Model for idea extraction")
                .takes_value(true)
                .value_name("MODEL")
                .default_value("gpt-4o-mini"),
        )
}

pub fn parse_command_line_flags() -> anyhow::Result<Config> {
    let matches = app().get_matches();
    config_from_matches(&matches, |name| std::env::var(name).ok())
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("Missing flag {}", name))
}

fn optional(matches: &ArgMatches, name: &str) -> Option<String> {
    matches
        .value_of(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Comma separated, case insensitive, eg. "mailinator.com, TempMail.com".
pub fn parse_domain_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

fn config_from_matches<F>(matches: &ArgMatches, env: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let port = required(matches, "port")?
        .parse::<u16>()
        .context("Invalid --port")?;
    let log_level = required(matches, "log_level")?
        .parse::<log::LevelFilter>()
        .context("Invalid --log_level")?;
    Ok(Config {
        port,
        log_level,
        store: required(matches, "store")?.parse()?,
        dynamodb_env: required(matches, "dynamodb_env")?.to_string(),
        dynamodb_endpoint: optional(matches, "dynamodb_endpoint"),
        aws_region: required(matches, "aws_region")?.to_string(),
        landing_pages_bucket: required(matches, "landing_pages_bucket")?.to_string(),
        cdn_distribution_id: optional(matches, "cdn_distribution_id"),
        landing_domain: required(matches, "landing_domain")?.to_string(),
        api_url: required(matches, "api_url")?
            .trim_end_matches('/')
            .to_string(),
        openai_base_url: required(matches, "openai_base_url")?
            .trim_end_matches('/')
            .to_string(),
        openai_api_key: env(OPENAI_API_KEY_ENV_VAR).unwrap_or_default(),
        model: required(matches, "model")?.to_string(),
        fast_model: required(matches, "fast_model")?.to_string(),
        blocked_email_domains: env(BLOCKED_EMAIL_DOMAINS_ENV_VAR)
            .map(|s| parse_domain_list(&s))
            .unwrap_or_default(),
        auth_trigger_secret: env(AUTH_TRIGGER_SECRET_ENV_VAR).filter(|s| !s.is_empty()),
    })
}
