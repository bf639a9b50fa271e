//! OTR Analytics CLI
//!
//! Emits and inspects device-trust analytics events.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use clap::{Parser, Subcommand};
use otr_analytics::config::{default_config_path, Config, SinkKind};
use otr_analytics::sinks::{build_analytics, read_events};
use otr_events::{Analytics, Attributes, DeviceTrustEvents, Envelope, OwnerType, VerificationType};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// OTR Analytics - device-trust event tagger.
#[derive(Parser, Debug)]
#[command(name = "otr-analytics")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Tag a device-trust event
    #[command(subcommand)]
    Tag(TagCommands),

    /// Inspect recorded events
    #[command(subcommand)]
    Events(EventsCommands),

    /// Show or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for tagging events.
#[derive(Subcommand, Debug, Clone)]
pub enum TagCommands {
    /// A device was removed
    DeleteDevice,

    /// A device's verification state changed
    ChangeVerification {
        /// New state (verified, unverified)
        #[arg(long)]
        verification: VerificationType,

        /// Device owner (self, other)
        #[arg(long)]
        owner: OwnerType,
    },

    /// Every device in a conversation is verified
    ConversationVerified,

    /// The user viewed their own device list
    SelfDeviceList,

    /// The user viewed another participant's device list
    OtherDeviceList,

    /// A message could not be decrypted
    CannotDecrypt {
        /// Attribute as KEY=VALUE; VALUE is parsed as JSON when possible
        #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
        attributes: Vec<(String, serde_json::Value)>,
    },
}

/// Subcommands for recorded events.
#[derive(Subcommand, Debug, Clone)]
pub enum EventsCommands {
    /// List events recorded by the file sink
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Subcommands for configuration.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Parses a `KEY=VALUE` attribute argument.
fn parse_attribute(arg: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("attribute key is empty in '{}'", arg));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing before the config is read so override warnings show
    let default_level = if cli.verbose { "debug" } else { "info" };
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    tracing::debug!("Using config file: {:?}", config_path);

    let mut out = io::stdout();
    match cli.command {
        // Never reads the existing file, so a broken config can be replaced
        Commands::Config(ConfigCommands::Init { force }) => {
            init_config(&config_path, force, &mut out)
        }
        Commands::Config(ConfigCommands::Show) => {
            let config = load_config(&config_path, cli.verbose, &filter_handle)?;
            write!(out, "{}", config.to_toml()?)?;
            Ok(())
        }
        Commands::Tag(command) => {
            let config = load_config(&config_path, cli.verbose, &filter_handle)?;
            let analytics = build_analytics(&config);
            run_tag(&analytics, command, &mut out)
        }
        Commands::Events(EventsCommands::List { json }) => {
            let config = load_config(&config_path, cli.verbose, &filter_handle)?;
            list_events(&config, json, &mut out)
        }
    }
}

/// Loads, overrides and validates the configuration, then applies its log
/// level unless `--verbose` already chose one.
fn load_config(
    path: &Path,
    verbose: bool,
    filter_handle: &reload::Handle<EnvFilter, Registry>,
) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides();
    config.validate()?;

    if !verbose {
        let level = config.analytics.log_level.to_lowercase();
        if let Err(e) = filter_handle.reload(EnvFilter::new(level)) {
            tracing::warn!("Failed to apply configured log level: {}", e);
        }
    }
    Ok(config)
}

/// Writes a default configuration to `path`.
fn init_config(path: &Path, force: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)?;
    writeln!(out, "Wrote default configuration to {}", path.display())?;
    Ok(())
}

/// Tags one event and reports what happened to it.
///
/// A dropped event is an error so scripts can detect a broken sink.
fn run_tag(
    analytics: &Analytics,
    command: TagCommands,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        TagCommands::DeleteDevice => analytics.tag_delete_device(),
        TagCommands::ChangeVerification {
            verification,
            owner,
        } => analytics.tag_change_device_verification(verification, owner),
        TagCommands::ConversationVerified => analytics.tag_conversation_is_verified(),
        TagCommands::SelfDeviceList => analytics.tag_self_device_list(),
        TagCommands::OtherDeviceList => analytics.tag_other_device_list(),
        TagCommands::CannotDecrypt { attributes } => {
            let attributes: Attributes = attributes.into_iter().collect();
            analytics.tag_cannot_decrypt_message_with_attributes(attributes);
        }
    }
    analytics.flush();

    let stats = analytics.stats();
    if stats.suppressed > 0 {
        writeln!(out, "Analytics disabled, event not recorded")?;
    } else if stats.dropped > 0 {
        anyhow::bail!("Sink rejected the event (see log for details)");
    } else {
        writeln!(out, "Event tagged")?;
    }
    Ok(())
}

/// Prints the events recorded by the file sink.
///
/// Each CLI call runs its own tagger, so sequence numbers restart at 1 per
/// invocation and are not shown in the table.
fn list_events(config: &Config, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if config.analytics.sink != SinkKind::File {
        tracing::warn!(
            "Configured sink is {:?}; listing events from {:?} anyway",
            config.analytics.sink,
            config.file.path
        );
    }

    let events = read_events(&config.file.path)?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&events)?)?;
        return Ok(());
    }

    if events.is_empty() {
        writeln!(out, "No events recorded.")?;
        return Ok(());
    }

    writeln!(out, "{:>12}  {:<30}  ATTRIBUTES", "TIME", "EVENT")?;
    for envelope in &events {
        writeln!(out, "{}", format_event_row(envelope))?;
    }
    Ok(())
}

fn format_event_row(envelope: &Envelope) -> String {
    let secs = envelope
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let attributes = envelope.event.attributes();
    let attributes = if attributes.is_empty() {
        "-".to_string()
    } else {
        serde_json::to_string(&attributes).unwrap_or_else(|_| "?".to_string())
    };
    format!("{:>12}  {:<30}  {}", secs, envelope.name(), attributes)
}
