use crate::constants::*;

/// Server configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub data_path: String,
    pub token_secret: String,
    pub token_expiry_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let data_path = std::env::var("DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());

        port.parse::<u16>()
            .map_err(|_| format!("PORT must be a valid port number, got '{}'", port))?;

        let token_secret =
            std::env::var("TOKEN_SECRET").map_err(|_| "TOKEN_SECRET must be set".to_string())?;
        if token_secret.len() < MIN_TOKEN_SECRET_LENGTH {
            return Err(format!(
                "TOKEN_SECRET must be at least {} bytes",
                MIN_TOKEN_SECRET_LENGTH
            ));
        }

        let token_expiry_hours = match std::env::var("TOKEN_EXPIRY_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| format!("TOKEN_EXPIRY_HOURS must be a positive integer, got '{}'", raw))?,
            Err(_) => DEFAULT_TOKEN_EXPIRY_HOURS,
        };

        Ok(Config {
            host,
            port,
            data_path,
            token_secret,
            token_expiry_hours,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
