use std::env;

use anyhow::{Context, Result};
use tracing::info;

pub struct Config {
    pub bind_addr: String,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub payment_api_base: String,
    pub payment_secret_key: String,
    pub public_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            bind_addr: with_default("BIND_ADDR", "0.0.0.0:8080"),
            mongodb_uri: with_default("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: with_default("MONGODB_DB", "puddle_market"),
            payment_api_base: with_default("PAYMENT_API_BASE", "https://api.paystack.co"),
            payment_secret_key: required("PAYMENT_SECRET_KEY")?,
            public_base_url: with_default("PUBLIC_BASE_URL", "http://localhost:8080"),
        })
    }
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("environment variable {key} is required"))
}
