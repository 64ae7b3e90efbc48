//! HLX Ctl - command-line control client.
//!
//! Connects to a controller (hardware, simulator, or proxy), synchronizes
//! a local mirror, and runs one-shot commands or streams live state-change
//! events. The scripting-friendly face of the client library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hlx_core::model::{GroupId, SourceId, ZoneId};
use hlx_core::{ClientController, Config, Event, HostAddress};

/// HLX Ctl - talk to a multi-zone audio controller.
#[derive(Parser, Debug)]
#[command(name = "hlx-ctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Controller address (`telnet://host:port`, `host:port`, or `host`).
    #[arg(short = 'A', long, env = "HLX_ADDRESS")]
    address: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "HLX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Path to a core configuration file (JSON) for non-default capacity.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synchronize and print a summary of the controller state.
    Status,
    /// Synchronize, then stream state-change events as JSON lines.
    Watch,
    /// Operate on one zone.
    Zone {
        /// Zone identifier (1-based).
        id: u8,
        #[command(subcommand)]
        action: ZoneAction,
    },
    /// Operate on one group.
    Group {
        /// Group identifier (1-based).
        id: u8,
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Ask the controller to save its configuration now.
    Save,
    /// Ask the controller to reload its saved configuration.
    Load,
    /// Reset the controller configuration to factory defaults.
    Reset,
}

#[derive(Subcommand, Debug)]
enum ZoneAction {
    /// Set the volume level (-80..=0).
    Volume {
        #[arg(allow_hyphen_values = true)]
        level: i8,
    },
    /// Step the volume up one notch.
    Up,
    /// Step the volume down one notch.
    Down,
    /// Mute the zone.
    Mute,
    /// Unmute the zone.
    Unmute,
    /// Toggle the mute state.
    ToggleMute,
    /// Select the zone's source.
    Source { source: u8 },
    /// Rename the zone.
    Name { name: String },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// Set every member zone's volume level (-80..=0).
    Volume {
        #[arg(allow_hyphen_values = true)]
        level: i8,
    },
    /// Mute every member zone.
    Mute,
    /// Unmute every member zone.
    Unmute,
    /// Toggle the group's derived mute state.
    ToggleMute,
    /// Select every member zone's source.
    Source { source: u8 },
    /// Add a zone to the group.
    Add { zone: u8 },
    /// Remove a zone from the group.
    Remove { zone: u8 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    let config: Config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => Config::default(),
    };
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    let address: HostAddress = args
        .address
        .parse()
        .with_context(|| format!("Bad controller address {:?}", args.address))?;

    let client = ClientController::new(config);
    client
        .connect(&address)
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;

    let result = run(&client, args.command).await;
    client.disconnect();
    result
}

async fn run(client: &Arc<ClientController>, command: Command) -> Result<()> {
    match command {
        Command::Status => {
            client.refresh().await.context("Refresh failed")?;
            print_status(client);
        }
        Command::Watch => {
            let mut events = client.subscribe();
            client.refresh().await.context("Refresh failed")?;
            println!("# synchronized; streaming events (ctrl-c to stop)");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = events.recv() => match event {
                        Ok(Event::State(change)) => {
                            println!("{}", serde_json::to_string(&change)?);
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            eprintln!("# lagged, dropped {n} events");
                        }
                        Err(_) => break,
                    },
                }
            }
        }
        Command::Zone { id, action } => {
            let zone = ZoneId::new(id).map_err(anyhow::Error::msg)?;
            match action {
                ZoneAction::Volume { level } => {
                    let confirmed = client.set_zone_volume(zone, level).await?;
                    println!("zone {id} volume {confirmed}");
                }
                ZoneAction::Up => {
                    let confirmed = client.increase_zone_volume(zone).await?;
                    println!("zone {id} volume {confirmed}");
                }
                ZoneAction::Down => {
                    let confirmed = client.decrease_zone_volume(zone).await?;
                    println!("zone {id} volume {confirmed}");
                }
                ZoneAction::Mute => {
                    client.set_zone_mute(zone, true).await?;
                    println!("zone {id} muted");
                }
                ZoneAction::Unmute => {
                    client.set_zone_mute(zone, false).await?;
                    println!("zone {id} unmuted");
                }
                ZoneAction::ToggleMute => {
                    let muted = client.toggle_zone_mute(zone).await?;
                    println!("zone {id} {}", if muted { "muted" } else { "unmuted" });
                }
                ZoneAction::Source { source } => {
                    let source = SourceId::new(source).map_err(anyhow::Error::msg)?;
                    client.set_zone_source(zone, source).await?;
                    println!("zone {id} source {source}");
                }
                ZoneAction::Name { name } => {
                    client.set_zone_name(zone, &name).await?;
                    println!("zone {id} named {name:?}");
                }
            }
        }
        Command::Group { id, action } => {
            let group = GroupId::new(id).map_err(anyhow::Error::msg)?;
            match action {
                GroupAction::Volume { level } => {
                    client.set_group_volume(group, level).await?;
                    println!("group {id} volume {level}");
                }
                GroupAction::Mute => {
                    client.set_group_mute(group, true).await?;
                    println!("group {id} muted");
                }
                GroupAction::Unmute => {
                    client.set_group_mute(group, false).await?;
                    println!("group {id} unmuted");
                }
                GroupAction::ToggleMute => {
                    let muted = client.toggle_group_mute(group).await?;
                    println!("group {id} {}", if muted { "muted" } else { "unmuted" });
                }
                GroupAction::Source { source } => {
                    let source = SourceId::new(source).map_err(anyhow::Error::msg)?;
                    client.set_group_source(group, source).await?;
                    println!("group {id} source {source}");
                }
                GroupAction::Add { zone } => {
                    let zone = ZoneId::new(zone).map_err(anyhow::Error::msg)?;
                    client.add_zone_to_group(group, zone).await?;
                    println!("group {id} added zone {zone}");
                }
                GroupAction::Remove { zone } => {
                    let zone = ZoneId::new(zone).map_err(anyhow::Error::msg)?;
                    client.remove_zone_from_group(group, zone).await?;
                    println!("group {id} removed zone {zone}");
                }
            }
        }
        Command::Save => {
            client.save_configuration().await?;
            println!("saving");
        }
        Command::Load => {
            client.load_configuration().await?;
            println!("loaded");
        }
        Command::Reset => {
            client.reset_configuration().await?;
            println!("reset");
        }
    }
    Ok(())
}

fn print_status(client: &Arc<ClientController>) {
    client.with_model(|model| {
        if let Ok(address) = model.network.host_address() {
            let mac = model
                .network
                .ethernet_eui48()
                .map(|m| m.to_string())
                .unwrap_or_default();
            println!("controller {address} ({mac})");
        }

        println!("sources:");
        for source in model.sources.iter() {
            let name = source.name().unwrap_or_else(|_| "-".to_string());
            println!("  {:>2}  {}", source.identifier(), name);
        }

        println!("zones:");
        for zone in model.zones.iter() {
            let name = zone.name().unwrap_or_else(|_| "-".to_string());
            let level = zone
                .volume()
                .level()
                .map(|l| l.to_string())
                .unwrap_or_else(|_| "?".to_string());
            let muted = match zone.volume().mute() {
                Ok(true) => " muted",
                _ => "",
            };
            let source = zone
                .source_opt()
                .map(|s| s.get().to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "  {:>2}  {:<16}  source {:<2}  volume {}{}",
                zone.identifier(),
                name,
                source,
                level,
                muted
            );
        }

        println!("groups:");
        for group in model.groups.iter() {
            let name = group.name().unwrap_or_else(|_| "-".to_string());
            let members: Vec<String> = group.members().map(|z| z.to_string()).collect();
            if members.is_empty() {
                println!("  {:>2}  {:<16}  (empty)", group.identifier(), name);
                continue;
            }
            let derived = group.derive_state(&model.zones).ok();
            let volume = derived
                .and_then(|d| d.volume)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            let muted = match derived.map(|d| d.mute) {
                Some(true) => " muted",
                _ => "",
            };
            println!(
                "  {:>2}  {:<16}  zones [{}]  volume {}{}",
                group.identifier(),
                name,
                members.join(", "),
                volume,
                muted
            );
        }
    });
}
