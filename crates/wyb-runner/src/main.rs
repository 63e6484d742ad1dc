//! `wyb`: run the watch side, the phone simulator, or both in one process.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wyb_runner::{link, loopback, CatalogConfig, WatchConfig};

#[derive(Parser, Debug)]
#[command(name = "wyb")]
#[command(about = "Barcode watch protocol runner")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "wyb_engine=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the watch side against a phone simulator
    Watch {
        /// Watch configuration file (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Phone address, overriding the configuration
        #[arg(long)]
        connect: Option<String>,

        /// Menu row to open once the catalog has loaded
        #[arg(long)]
        select: Option<u8>,

        /// Exit once the selected image (or the catalog) is done
        #[arg(long)]
        once: bool,
    },

    /// Serve a barcode catalog as the companion phone
    Phone {
        /// Catalog file (YAML)
        #[arg(long)]
        catalog: PathBuf,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:9450")]
        listen: String,
    },

    /// Run watch and phone in one process, without sockets
    Demo {
        /// Catalog file (YAML)
        #[arg(long)]
        catalog: PathBuf,

        /// Menu row to open once the catalog has loaded
        #[arg(long)]
        select: Option<u8>,

        /// Do not print images
        #[arg(long)]
        no_render: bool,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Watch {
            config,
            connect,
            select,
            once,
        } => {
            let mut watch = match config {
                Some(path) => WatchConfig::load(path)?,
                None => WatchConfig::default(),
            };
            if let Some(address) = connect {
                watch.connect = address;
            }
            if select.is_some() {
                watch.select = select;
            }
            watch.once |= once;

            init_tracing(cli.log_level.as_deref().unwrap_or(&watch.log_level));
            wyb_engine::metrics::describe_metrics();
            link::FRAMES_DROPPED.describe();

            let report = link::run_watch(watch).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Phone { catalog, listen } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("info"));
            link::FRAMES_DROPPED.describe();
            let catalog = CatalogConfig::load(catalog)?;
            link::run_phone(&listen, catalog).await?;
        }

        Commands::Demo {
            catalog,
            select,
            no_render,
        } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("info"));
            wyb_engine::metrics::describe_metrics();

            let catalog = CatalogConfig::load(catalog)?;
            let config = WatchConfig {
                select,
                render: !no_render,
                once: true,
                ..WatchConfig::default()
            };
            let report = loopback::run_demo(catalog, config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
