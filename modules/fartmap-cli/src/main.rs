//! Command-line client: keeps the local device identity and talks to the
//! FartMap API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;

use fartmap_common::{BoundingBox, EventSubmission, LocalIdentity, LocationSource};
use fartmap_stats::TimeWindow;

mod client;
use client::FartMapClient;

#[derive(Parser)]
#[command(name = "fartmap")]
#[command(about = "Leave your mark on the FartMap")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, env = "FARTMAP_URL", default_value = "http://localhost:3000", global = true)]
    url: String,

    /// Shared API secret
    #[arg(long, env = "FARTMAP_API_KEY", global = true)]
    api_key: Option<String>,

    /// Where the local identity is kept
    #[arg(long, env = "FARTMAP_IDENTITY", global = true)]
    identity: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show this device's identity (created on first use)
    Whoami,

    /// Change the display name
    Rename {
        /// New display name (at least 3 characters)
        name: String,
    },

    /// Record an event at a position
    Submit {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Position accuracy in meters
        #[arg(long)]
        accuracy: Option<f64>,

        /// gps or ip
        #[arg(long, default_value = "gps")]
        source: LocationSource,

        /// Short note (cut to 120 characters by the server)
        #[arg(long)]
        note: Option<String>,
    },

    /// List events
    Events {
        #[arg(long, default_value = "all")]
        window: TimeWindow,
    },

    /// Show hot zones
    Zones {
        #[arg(long, default_value = "day")]
        window: TimeWindow,

        /// Viewport as south,west,north,east
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,
    },

    /// Show the leaderboard and your own count
    Leaderboard {
        #[arg(long, default_value = "all")]
        window: TimeWindow,
    },

    /// Show your XP, level, streaks and achievements
    Profile {
        #[arg(long, default_value = "all")]
        window: TimeWindow,
    },

    /// Delete every event (admin only)
    Clear {
        #[arg(long, env = "FARTMAP_ADMIN_KEY")]
        admin_key: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let identity_path = cli.identity.clone().unwrap_or_else(default_identity_path);

    match cli.command {
        Commands::Whoami => {
            let identity = LocalIdentity::load_or_create(&identity_path)?;
            println!("{} {}", style("Name:  ").dim(), style(&identity.display_name).bold());
            println!("{} {}", style("Device:").dim(), identity.device_id);
            println!("{} {}", style("Stored:").dim(), identity_path.display());
        }
        Commands::Rename { name } => {
            let mut identity = LocalIdentity::load_or_create(&identity_path)?;
            identity.rename(&name)?;
            identity.save(&identity_path)?;
            println!("Now known as {}", style(&identity.display_name).bold());
        }
        Commands::Submit {
            lat,
            lng,
            accuracy,
            source,
            note,
        } => {
            let identity = LocalIdentity::load_or_create(&identity_path)?;
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let submission = EventSubmission {
                latitude: Some(lat),
                longitude: Some(lng),
                accuracy,
                source: Some(source),
                timestamp: Some(Utc::now()),
                device_id: Some(identity.device_id),
                display_name: Some(identity.display_name),
                note,
            };
            let event = client.submit(&submission).await?;
            println!(
                "💨 Recorded at ({:.4}, {:.4})",
                event.latitude, event.longitude
            );
        }
        Commands::Events { window } => {
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let events = client.events(window).await?;
            for event in &events {
                println!(
                    "{}  ({:>9.4}, {:>9.4})  {:<4} {}{}",
                    event.timestamp.format("%Y-%m-%d %H:%M"),
                    event.latitude,
                    event.longitude,
                    event.source,
                    event.label(),
                    event
                        .note
                        .as_deref()
                        .map(|n| format!(" \"{n}\""))
                        .unwrap_or_default(),
                );
            }
            println!("{} events ({window})", style(events.len()).bold());
        }
        Commands::Zones { window, bbox } => {
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let zones = client.hot_zones(window, bbox.as_ref()).await?;
            if zones.is_empty() {
                println!("No hot zones ({window})");
            }
            for zone in zones {
                println!(
                    "🔥 ({:.4}, {:.4}) {} {} events",
                    zone.latitude,
                    zone.longitude,
                    style(zone.geohash).dim(),
                    style(zone.count).bold()
                );
            }
        }
        Commands::Leaderboard { window } => {
            let identity = LocalIdentity::load_or_create(&identity_path)?;
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let board = client.leaderboard(window, &identity.device_id).await?;
            for (rank, entry) in board.entries.iter().enumerate() {
                let mine = entry.device_id.as_deref() == Some(identity.device_id.as_str());
                let line = format!("{:>2}. {:<30} {}", rank + 1, entry.label, entry.count);
                if mine {
                    println!("{}", style(line).green().bold());
                } else {
                    println!("{line}");
                }
            }
            println!(
                "You: {} of {} events ({window})",
                style(board.my_count).bold(),
                board.total
            );
        }
        Commands::Profile { window } => {
            let identity = LocalIdentity::load_or_create(&identity_path)?;
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let stats = client.profile(&identity.device_id, window).await?;
            println!(
                "{}: Level {} ({} XP, {:.0}% to next)",
                style(&identity.display_name).bold(),
                stats.level,
                stats.xp,
                stats.level_progress * 100.0
            );
            println!(
                "Streak: {} day(s), longest {}",
                stats.current_streak, stats.longest_streak
            );
            for achievement in &stats.achievements {
                println!("  🏆 {achievement}");
            }
            println!("{} events in window ({window})", stats.events.len());
        }
        Commands::Clear { admin_key } => {
            let client = client(&cli.url, cli.api_key.as_deref())?;
            let cleared = client.clear(&admin_key).await?;
            println!("🧹 Cleared {cleared} events");
        }
    }

    Ok(())
}

fn client(url: &str, api_key: Option<&str>) -> Result<FartMapClient> {
    let api_key = api_key
        .filter(|k| !k.is_empty())
        .context("an API key is required (set FARTMAP_API_KEY or pass --api-key)")?;
    FartMapClient::new(url, api_key)
}

fn default_identity_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fartmap")
        .join("identity.json")
}
