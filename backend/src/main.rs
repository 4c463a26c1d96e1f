mod ai;
mod analytics;
mod auth;
mod config;
mod dynamodb;
mod error;
mod events;
mod http;
mod ids;
mod landing_pages;
mod projects;
mod publisher;
mod signups;
mod stats;
#[cfg(test)]
mod testing;
mod users;
mod utils;
mod validation;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use rusoto_cloudfront::CloudFrontClient;
use rusoto_core::request::HttpClient;
use rusoto_core::Region;
use rusoto_credential::DefaultCredentialsProvider;
use rusoto_dynamodb::DynamoDbClient;
use rusoto_s3::S3Client;

use ai::{LanguageModel, Models, OpenAiClient};
use config::{Config, StoreKind};
use dynamodb::{DynamoStore, MemoryStore, Store};
use publisher::{
    CdnInvalidator, CloudFrontInvalidator, MemoryStorage, ObjectStorage, Publisher, S3Storage,
};

/// Shared by every request handler.
pub struct BackendService {
    pub store: Arc<dyn Store>,
    pub language_model: Arc<dyn LanguageModel>,
    pub models: Models,
    pub publisher: Publisher,
    pub config: Config,
}

fn aws_region(config: &Config) -> anyhow::Result<Region> {
    config
        .aws_region
        .parse::<Region>()
        .with_context(|| format!("Invalid AWS region {}", config.aws_region))
}

fn create_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.store == StoreKind::Memory {
        log::warn!("Using the in-memory store. Nothing will be persisted.");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let region = match &config.dynamodb_endpoint {
        Some(endpoint) => Region::Custom {
            name: config.aws_region.clone(),
            endpoint: endpoint.clone(),
        },
        None => aws_region(config)?,
    };
    let client = DynamoDbClient::new_with(
        HttpClient::new()?,
        DefaultCredentialsProvider::new()?,
        region,
    );
    let table_name =
        dynamodb_schema::env_table_name(&config.dynamodb_env, dynamodb_schema::TABLE_NAME);
    log::info!("Using DynamoDB table {}", &table_name);
    Ok(Arc::new(DynamoStore::new(client, table_name)))
}

fn create_publisher(config: &Config) -> anyhow::Result<Publisher> {
    if config.store == StoreKind::Memory {
        let storage: Arc<dyn ObjectStorage> = Arc::new(MemoryStorage::new());
        return Ok(Publisher::new(
            storage,
            None,
            &config.landing_domain,
            &config.api_url,
        ));
    }
    let region = aws_region(config)?;
    let s3_client = S3Client::new_with(
        HttpClient::new()?,
        DefaultCredentialsProvider::new()?,
        region.clone(),
    );
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(
        s3_client,
        config.landing_pages_bucket.clone(),
    ));
    let cdn = match &config.cdn_distribution_id {
        Some(distribution_id) => {
            let client = CloudFrontClient::new_with(
                HttpClient::new()?,
                DefaultCredentialsProvider::new()?,
                region,
            );
            let cdn: Arc<dyn CdnInvalidator> =
                Arc::new(CloudFrontInvalidator::new(client, distribution_id.clone()));
            Some(cdn)
        }
        None => {
            log::warn!("No CDN distribution configured. Cached pages will not be invalidated.");
            None
        }
    };
    Ok(Publisher::new(
        storage,
        cdn,
        &config.landing_domain,
        &config.api_url,
    ))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = config::parse_command_line_flags()?;
    simple_logger::SimpleLogger::new()
        .with_level(config.log_level)
        .init()?;

    if config.openai_api_key.is_empty() {
        log::warn!(
            "{} is not set. Generation endpoints will fail.",
            config::OPENAI_API_KEY_ENV_VAR
        );
    }
    let language_model: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
    ));
    let service = web::Data::new(BackendService {
        store: create_store(&config)?,
        language_model,
        models: Models {
            main: config.model.clone(),
            fast: config.fast_model.clone(),
        },
        publisher: create_publisher(&config)?,
        config: config.clone(),
    });

    log::info!("Starting HTTP server on port {}", config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(http::configure)
            .default_service(web::to(http::route_not_found))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}
