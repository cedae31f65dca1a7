use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

// Application settings, stored as JSON under the app data directory.
#[derive(Serialize, Deserialize, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>, // Optional API key for OpenAI services.
    pub model: String,
    // When true, every suspect's secret stays visible in every prompt, so
    // suspects can react to each other's hidden motives. Secrets are
    // hidden by default.
    #[serde(default)]
    pub shared_secrets: bool,
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None,
            model: "gpt-4o-mini".to_string(),
            shared_secrets: false,
            debug_mode: false,
        }
    }
}

// Per-user data directory for settings, the log file and generated
// portraits.
pub fn data_dir() -> PathBuf {
    dir::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gumshoe")
        .join("data")
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // Load settings from the default file path.
    pub fn load() -> io::Result<Self> {
        Self::load_from_file(data_dir().join("settings.json"))
    }

    // Save current settings to the default file path.
    pub fn save(&self) -> io::Result<()> {
        self.save_to_file(data_dir().join("settings.json"))
    }

    pub fn load_from_file(path: PathBuf) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: PathBuf) -> io::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }
}
