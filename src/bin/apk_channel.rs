use anyhow::{Context, Result};
use apkchannel::core::channel::{read_id_values, read_payload, write_payload};
use apkchannel::core::config::{ChannelConfig, CONFIG_FILE};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Config file, `apkchannel.toml` in the working directory by default
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = ChannelConfig::load(&config_path)?;
    args.command.run(&config)
}

#[derive(Subcommand)]
enum Commands {
    /// Print the payload stored in the APK Signing Block
    Get {
        apk: PathBuf,
        /// Entry id, decimal or 0x-prefixed hex
        #[clap(long, value_parser = parse_id)]
        id: Option<u32>,
        /// Write the payload bytes as-is instead of as text
        #[clap(long)]
        raw: bool,
    },
    /// Store a payload in the APK Signing Block
    Put {
        apk: PathBuf,
        payload: String,
        /// Entry id, decimal or 0x-prefixed hex
        #[clap(long, value_parser = parse_id)]
        id: Option<u32>,
        /// Copy the APK here and modify the copy
        #[clap(long)]
        output: Option<PathBuf>,
        /// Rewrite the file directly instead of through a scratch copy
        #[clap(long)]
        in_place: bool,
    },
    /// List the entries of the APK Signing Block
    List { apk: PathBuf },
}

impl Commands {
    pub fn run(self, config: &ChannelConfig) -> Result<()> {
        match self {
            Self::Get { apk, id, raw } => {
                let id = id.unwrap_or(config.block.id);
                let payload = read_payload(&apk, id).with_context(|| {
                    format!("Reading entry 0x{:08x} of `{}`", id, apk.display())
                })?;
                let mut stdout = std::io::stdout().lock();
                if raw {
                    stdout.write_all(&payload)?;
                } else {
                    writeln!(stdout, "{}", String::from_utf8_lossy(&payload))?;
                }
            }
            Self::Put {
                apk,
                payload,
                id,
                output,
                in_place,
            } => {
                let id = id.unwrap_or(config.block.id);
                let target = match output {
                    Some(output) => {
                        copy_apk(&apk, &output)?;
                        output
                    }
                    None => apk,
                };
                let mut opts = config.write_options();
                if in_place {
                    opts.atomic = false;
                }
                write_payload(&target, id, payload.as_bytes(), &opts).with_context(|| {
                    format!("Writing entry 0x{:08x} of `{}`", id, target.display())
                })?;
                tracing::info!("wrote {} bytes to `{}`", payload.len(), target.display());
            }
            Self::List { apk } => {
                let id_values = read_id_values(&apk)
                    .with_context(|| format!("Reading APK Signing Block of `{}`", apk.display()))?;
                let mut stdout = std::io::stdout().lock();
                for (id, value) in &id_values {
                    writeln!(stdout, "0x{:08x}\t{} bytes", id, value.len())?;
                }
            }
        }
        Ok(())
    }
}

fn copy_apk(source: &Path, dest: &Path) -> Result<()> {
    // Copying a file onto itself truncates it.
    if dest.exists() && fs::canonicalize(source)? == fs::canonicalize(dest)? {
        tracing::info!("`{}` is the input APK, writing in place", dest.display());
        return Ok(());
    }
    fs::copy(source, dest)
        .with_context(|| format!("Copying `{}` to `{}`", source.display(), dest.display()))?;
    Ok(())
}

fn parse_id(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
