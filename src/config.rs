use std::env;

pub const DEFAULT_PAYPAL_API_BASE: &str = "https://api-m.paypal.com";

/// PayPal service credentials, exchanged for short-lived bearer tokens.
#[derive(Debug, Clone)]
pub struct PayPalCredentials {
    pub client_id: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// API base for the payment provider (overridable for testing).
    pub paypal_api_base: String,
    /// Missing credentials are the only process-fatal configuration error:
    /// without them the webhook verifier cannot establish ground truth.
    pub paypal: Option<PayPalCredentials>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("BINDERY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let paypal = match (env::var("PAYPAL_CLIENT_ID"), env::var("PAYPAL_SECRET")) {
            (Ok(client_id), Ok(secret)) => Some(PayPalCredentials { client_id, secret }),
            _ => None,
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "bindery.db".to_string()),
            paypal_api_base: env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| DEFAULT_PAYPAL_API_BASE.to_string()),
            paypal,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
