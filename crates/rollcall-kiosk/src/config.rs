//! Kiosk configuration: optional TOML file, overridden by `ROLLCALL_*`
//! environment variables, with built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Similarity above which a probe embedding is accepted as a registered
/// identity. Strictly-greater-than comparison.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Optional on-disk settings (`rollcall.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    db_path: Option<PathBuf>,
    similarity_threshold: Option<f32>,
}

/// Resolved kiosk configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub similarity_threshold: f32,
}

impl Config {
    /// Load configuration: file (if present), then environment, then defaults.
    ///
    /// The file is looked up at `ROLLCALL_CONFIG` or
    /// `$XDG_CONFIG_HOME/rollcall/rollcall.toml`; a missing file is fine,
    /// a malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match config_file_path() {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => FileConfig::default(),
        };

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .ok()
            .or(file.db_path)
            .unwrap_or_else(default_db_path);

        let similarity_threshold = env_f32("ROLLCALL_SIMILARITY_THRESHOLD")
            .or(file.similarity_threshold)
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);

        tracing::debug!(
            db_path = %db_path.display(),
            similarity_threshold,
            "configuration resolved"
        );

        Ok(Self {
            db_path,
            similarity_threshold,
        })
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("ROLLCALL_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            std::env::var("HOME").map(|home| PathBuf::from(home).join(".config"))
        })
        .ok()?;
    Some(config_dir.join("rollcall/rollcall.toml"))
}

fn default_db_path() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/attendance.db")
}

fn env_f32(key: &str) -> Option<f32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
