use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::RetryConfig;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub rabbitmq_url: String,
    pub notifications_queue_name: String,

    pub database_url: String,

    pub mailer_url: String,
    pub mailer_from: String,

    pub processing_interval_ms: u64,
    pub max_retry_attempts: u32,
    pub operation_timeout_seconds: u64,

    pub server_port: u16,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|_| anyhow!("Invalid or missing environmental variable"))?;
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            operation_timeout_seconds: self.operation_timeout_seconds,
        }
    }
}
