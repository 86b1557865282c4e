//! SafeMask - Sensitive Data Masking Engine
//!
//! Command line front-end: mask text from arguments or stdin, list
//! detections as JSON, print configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use safemask::{config::SafeMaskConfig, DlpEngine};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "safemask")]
#[command(version)]
#[command(about = "Sensitive data masking engine")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SAFEMASK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask text given as an argument, or stdin line by line
    Mask {
        /// Mask as this type only
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Use the hardened path
        #[arg(long, conflicts_with = "kind")]
        secure: bool,

        /// Client id for rate limiting on the hardened path
        #[arg(long, default_value = "cli")]
        client: String,

        /// Text to mask
        text: Option<String>,
    },

    /// Print detected sensitive data as JSON, grouped by type
    Detect {
        /// Text to scan
        text: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so masked output stays clean on stdout
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("safemask={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => SafeMaskConfig::load(path)?,
        None => SafeMaskConfig::default(),
    };

    match cli.command {
        Commands::Mask {
            kind,
            secure,
            client,
            text,
        } => {
            let engine = DlpEngine::from_config(&config)?;
            let masker = Masker {
                engine: &engine,
                kind,
                secure,
                client,
            };
            match text {
                Some(text) => println!("{}", masker.mask(&text)?),
                None => mask_stdin(&masker).await?,
            }
        }
        Commands::Detect { text } => {
            let engine = DlpEngine::from_config(&config)?;
            let found = engine.detect_sensitive_info(&text);
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        Commands::Config { default } => {
            let shown = if default {
                SafeMaskConfig::default()
            } else {
                config
            };
            println!("{}", shown.to_toml_string()?);
        }
    }

    Ok(())
}

struct Masker<'a> {
    engine: &'a DlpEngine,
    kind: Option<String>,
    secure: bool,
    client: String,
}

impl Masker<'_> {
    fn mask(&self, text: &str) -> Result<String> {
        if self.secure {
            return Ok(self.engine.secure_desensitize(&self.client, text)?);
        }
        Ok(match &self.kind {
            Some(kind) => self.engine.try_desensitize_specific_type(text, kind)?,
            None => self.engine.desensitize_text(text),
        })
    }
}

async fn mask_stdin(masker: &Masker<'_>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut count = 0usize;

    while let Some(line) = lines.next_line().await? {
        count += 1;
        if line.is_empty() {
            stdout.write_all(b"\n").await?;
            continue;
        }
        let masked = match masker.mask(&line) {
            Ok(masked) => masked,
            Err(e) => match e.downcast_ref::<safemask::Error>() {
                Some(err) if err.is_fail_open() => {
                    tracing::warn!(line = count, error = %err, "Line passed through unmasked");
                    line
                }
                // Rejected lines are dropped, never echoed
                Some(err) if err.security_violation().is_some() => {
                    tracing::warn!(line = count, error = %err, "Line rejected");
                    continue;
                }
                _ => return Err(e),
            },
        };
        stdout.write_all(masked.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;

    tracing::debug!(lines = count, "Stdin processed");
    Ok(())
}
