use crate::error::{BlockchainError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Leading zero bits a block hash must carry
pub const DEFAULT_TARGET_BITS: u32 = 24;

const CONFIG_FILE_KEY: &str = "LEDGER_CONFIG";
const DB_PATH_KEY: &str = "LEDGER_DB_PATH";
const TARGET_BITS_KEY: &str = "LEDGER_TARGET_BITS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub target_bits: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data").join("blockchain"),
            target_bits: DEFAULT_TARGET_BITS,
        }
    }
}

impl Settings {
    pub fn new(db_path: impl Into<PathBuf>, target_bits: u32) -> Result<Settings> {
        let settings = Settings {
            db_path: db_path.into(),
            target_bits,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults, then the file named by `LEDGER_CONFIG`, then env overrides
    pub fn load() -> Result<Settings> {
        let mut settings = match env::var(CONFIG_FILE_KEY) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Settings::default(),
        };

        if let Ok(path) = env::var(DB_PATH_KEY) {
            settings.db_path = PathBuf::from(path);
        }
        if let Ok(bits) = env::var(TARGET_BITS_KEY) {
            settings.target_bits = bits.parse().map_err(|e| {
                BlockchainError::Config(format!("{TARGET_BITS_KEY}={bits} is not a number: {e}"))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let raw = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Settings {
        self.db_path = db_path.into();
        self
    }

    pub fn with_target_bits(mut self, target_bits: u32) -> Result<Settings> {
        self.target_bits = target_bits;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=255).contains(&self.target_bits) {
            return Err(BlockchainError::Config(format!(
                "target_bits must be between 1 and 255, got {}",
                self.target_bits
            )));
        }
        Ok(())
    }
}
