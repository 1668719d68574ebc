use crate::config::parse_or;
use crate::core::Result;

/// Server configuration for HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            workers: 4,
        }
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            parse_or(lookup, "PORT", 8000)?,
        );
        config.workers = parse_or(lookup, "WORKERS", config.workers)?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
