use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/navalbot/config.toml";
const STORE_PATH_REL_HOME: &str = ".config/navalbot/store.toml";

/// Bot configuration
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub commits: Commits,
    /// Where this configuration was read from, so that it can be reloaded
    #[serde(skip)]
    path: PathBuf,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    /// The one user allowed to run owner-only commands
    pub owner_id: u64,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_game_text")]
    pub game_text: String,
    #[serde(default)]
    pub disabled_plugins: Vec<String>,
    #[serde(default)]
    pub locale_dir: Option<PathBuf>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Commits {
    pub enabled: bool,
    pub token: String,
    pub channel_id: u64,
    pub repo: String,
    pub poll_interval_seconds: u64,
}

impl Default for Commits {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            channel_id: 0,
            repo: String::new(),
            poll_interval_seconds: 60,
        }
    }
}

fn default_command_prefix() -> String {
    "?".to_owned()
}

fn default_game_text() -> String {
    "Type ?info for help!".to_owned()
}

fn home_path(rel: &str) -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(rel))
        .ok_or(anyhow!("Could not find home directory"))
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        home_path(CONFIG_PATH_REL_HOME)
    }

    pub fn from_toml(contents: &str, path: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;
        config.path = path.to_owned();

        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::from_toml(&contents, path)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load(&self.path).await?;
        *self = new;
        Ok(())
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.general.store_path {
            Some(path) => Ok(path.clone()),
            None => home_path(STORE_PATH_REL_HOME),
        }
    }
}
