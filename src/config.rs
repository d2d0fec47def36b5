use crate::error::{AppError, AppResult};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => 10000,
        };

        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        Ok(Self { port, static_dir })
    }

    /// The entry document served for both the root and per-room pages.
    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }
}
