//! Burrow CLI entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rhizome_burrow_core::{SeedError, World, WorldDefinition, basic_world};
use rhizome_burrow_runtime::BurrowRuntime;
use rhizome_burrow_transport_text::{Server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "burrow")]
#[command(about = "Multi-player text adventure server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port for plain-text clients
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Port for WebSocket clients (disabled when omitted)
        #[arg(long)]
        ws_port: Option<u16>,

        /// World definition file (TOML); a built-in world is used when omitted
        #[arg(short, long)]
        world: Option<PathBuf>,

        /// Longest accepted input line, in bytes
        #[arg(long, default_value = "4096")]
        max_line_len: usize,
    },

    /// Validate a world definition file
    Check {
        /// World definition file (TOML)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("burrow=info".parse()?)
                .add_directive("rhizome_burrow=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            ws_port,
            world,
            max_line_len,
        } => {
            info!("Starting Burrow server");

            let world = load_world(world.as_deref())?;
            let runtime = Arc::new(BurrowRuntime::new(world));
            let config = ServerConfig {
                host,
                port,
                ws_port,
                max_line_len,
            };

            let server = Server::bind(runtime, config).await?;
            tokio::select! {
                result = server.run() => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }

        Commands::Check { file } => {
            println!("{}", check(&file)?);
        }
    }

    Ok(())
}

fn load_world(path: Option<&Path>) -> Result<World, SeedError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading world");
            Ok(WorldDefinition::load(path)?.build()?.world)
        }
        None => {
            info!("no world file given, using the built-in world");
            Ok(basic_world())
        }
    }
}

/// Load and build a world file, returning a one-line summary.
fn check(path: &Path) -> Result<String, SeedError> {
    let definition = WorldDefinition::load(path)?;
    let seeded = definition.build()?;
    Ok(format!(
        "{}: {} locations, {} objects, {} start locations",
        path.display(),
        definition.locations.len(),
        definition.objects.len(),
        seeded.world.start_locations().len()
    ))
}
