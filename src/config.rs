use anyhow::Result;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub client_base_url: String,
    pub store: StoreKind,
    /// Whether approving leave may block slots that already carry bookings.
    pub leave_blocks_booked_slots: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/clinic_roster".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "your-super-secret-jwt-key-change-this-in-production-12345".to_string()
            }),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            client_base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            store: match env::var("STORE").map(|s| s.to_lowercase()).as_deref() {
                Ok("memory") => StoreKind::Memory,
                _ => StoreKind::Postgres,
            },
            leave_blocks_booked_slots: env::var("LEAVE_BLOCKS_BOOKED_SLOTS")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
