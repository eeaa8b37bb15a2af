use crate::error::{Error, Result};
use crate::services::ownership::OfferOwnership;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Who may touch what, when the legacy endpoints and the hardened ones disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Reviewer check on status updates, employer/admin check on offer creation.
    Strict,
    /// Permissive checks for deployments whose clients rely on them.
    Legacy,
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(AccessPolicy::Strict),
            "legacy" => Ok(AccessPolicy::Legacy),
            other => Err(format!("unknown access policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub uploads_dir: String,
    pub session_ttl_hours: i64,
    pub session_cookie_secure: bool,
    pub offer_ownership: OfferOwnership,
    pub access_policy: AccessPolicy,
    pub public_rps: u32,
    pub api_rps: u32,
    pub cors_origin: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
    pub log_format: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            session_ttl_hours: get_env_parse_or("SESSION_TTL_HOURS", 168)?,
            session_cookie_secure: get_env_parse_or("SESSION_COOKIE_SECURE", false)?,
            offer_ownership: get_env_parse_or("OFFER_OWNERSHIP", OfferOwnership::EmployerKey)?,
            access_policy: get_env_parse_or("ACCESS_POLICY", AccessPolicy::Strict)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            api_rps: get_env_parse_or("API_RPS", 100)?,
            cors_origin: env::var("CORS_ORIGIN").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_name: env::var("ADMIN_NAME").ok(),
            log_format: env::var("LOG_FORMAT").ok(),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_policy_parses_case_insensitively() {
        assert_eq!("LEGACY".parse::<AccessPolicy>(), Ok(AccessPolicy::Legacy));
        assert_eq!(" strict ".parse::<AccessPolicy>(), Ok(AccessPolicy::Strict));
        assert!("lenient".parse::<AccessPolicy>().is_err());
    }
}
