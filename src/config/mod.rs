use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub core: Core,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            name: String::from("Unknown"),
            email: String::from("unknown@example.com"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Core {
    /// Whether the executable bit is tracked and compared at all.
    /// Mirrors git's `core.filemode`; defaults to `true`.
    #[serde(default = "default_filemode")]
    pub filemode: bool,
}

fn default_filemode() -> bool {
    true
}

impl Default for Core {
    fn default() -> Self {
        Self { filemode: true }
    }
}

impl Config {
    /// Read config from `<repo>/config`.
    pub fn read(repo_dir: &Path) -> io::Result<Self> {
        let config_path = repo_dir.join("config");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)?;
        toml::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse config: {}", e),
            )
        })
    }

    /// Write config to `<repo>/config`.
    pub fn write(&self, repo_dir: &Path) -> io::Result<()> {
        let config_path = repo_dir.join("config");
        let content = toml::to_string_pretty(self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize config: {}", e),
            )
        })?;

        fs::write(config_path, content)
    }

    /// Get user name and email in format "Name <email>"
    pub fn get_user_string(&self) -> String {
        format!("{} <{}>", self.user.name, self.user.email)
    }

    /// `core.filemode`: whether the executable bit is tracked.
    pub fn filemode(&self) -> bool {
        self.core.filemode
    }
}

/// Set a config value (`user.name`, `user.email`, or `core.filemode`).
pub fn set_config(repo_dir: &Path, key: &str, value: &str) -> io::Result<()> {
    let mut config = Config::read(repo_dir)?;

    match key {
        "user.name" => config.user.name = value.to_string(),
        "user.email" => config.user.email = value.to_string(),
        "core.filemode" => {
            config.core.filemode = value.parse::<bool>().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "core.filemode expects true/false")
            })?;
        }
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Unknown config key: {}", key),
            ));
        }
    }

    config.write(repo_dir)?;
    log::debug!("set config {} = {}", key, value);
    Ok(())
}

/// Get a config value.
pub fn get_config(repo_dir: &Path, key: &str) -> io::Result<String> {
    let config = Config::read(repo_dir)?;

    let value = match key {
        "user.name" => config.user.name.clone(),
        "user.email" => config.user.email.clone(),
        "core.filemode" => config.core.filemode.to_string(),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Unknown config key: {}", key),
            ));
        }
    };

    Ok(value)
}
