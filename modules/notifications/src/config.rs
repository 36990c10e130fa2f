use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    /// Delivery channel: "log" (dev/test) or "webhook"
    pub notify_channel: String,
    /// Target for the webhook channel; required when notify_channel=webhook
    pub webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8092".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let notify_channel = env::var("NOTIFY_CHANNEL").unwrap_or_else(|_| "log".to_string());

        let webhook_url = env::var("WEBHOOK_URL").ok();

        if notify_channel == "webhook" && webhook_url.is_none() {
            return Err("WEBHOOK_URL must be set when NOTIFY_CHANNEL=webhook".to_string());
        }

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            notify_channel,
            webhook_url,
        })
    }
}
