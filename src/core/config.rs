use crate::core::channel::WriteOptions;
use crate::core::signing::pairs::APK_CHANNEL_BLOCK_ID;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "apkchannel.toml";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Every group carries `#[serde(default)]`: omitting one of them falls
    /// back to its defaults instead of failing the whole file.
    #[serde(default)]
    pub block: BlockConfig,

    #[serde(default)]
    pub write: WriteConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BlockConfig {
    #[serde(default = "default_id")]
    pub id: u32,
}

fn default_id() -> u32 {
    APK_CHANNEL_BLOCK_ID
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self { id: default_id() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WriteConfig {
    #[serde(default = "default_true")]
    pub atomic: bool,
    #[serde(default = "default_true")]
    pub sync: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            atomic: true,
            sync: true,
        }
    }
}

impl ChannelConfig {
    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Reading config `{}`", path.display()))
            }
        };
        toml::from_str(&content).with_context(|| format!("Parsing config `{}`", path.display()))
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            atomic: self.write.atomic,
            sync: self.write.sync,
        }
    }
}
