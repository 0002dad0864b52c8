use std::env;
use std::path::PathBuf;

use crate::api::API_URL;

/// Runtime configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    pub api_url: String,
    pub poll_interval_secs: u64,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let email = env::var("OILFOX_EMAIL")
            .map_err(|_| "OILFOX_EMAIL not set. Configure your OilFox account credentials.")?;
        let password = env::var("OILFOX_PASSWORD")
            .map_err(|_| "OILFOX_PASSWORD not set. Configure your OilFox account credentials.")?;

        Ok(Config {
            email,
            password,
            api_url: env::var("OILFOX_API_URL").unwrap_or_else(|_| API_URL.to_string()),
            poll_interval_secs: env::var("TANKWATCH_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()?,
            data_dir: env::var("TANKWATCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
        })
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".tankwatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_dir_ends_with_tankwatch() {
        let dir = default_data_dir();
        assert!(dir.ends_with(".tankwatch"));
    }
}
