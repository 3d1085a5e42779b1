use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use mx2482::{mixer, MemoryPorts, MixerConfig, Transport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "The MX2482 developers",
    version = crate_version!(),
    about = "A headless software mixing console."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the console on the configured audio devices until a line is read from stdin.
    Run {
        /// Path to a config file (YAML, TOML or JSON). MX2482_* environment variables override it.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// State file to load before starting.
        #[arg(short, long)]
        state: Option<PathBuf>,
        /// Where to save the state when stopping.
        #[arg(long)]
        save: Option<PathBuf>,
        /// Run without audio devices, on a test tone.
        #[arg(long)]
        dummy: bool,
    },
    /// Writes a state file with every control at rest.
    InitState {
        /// Where to write the state. The .mx2482 extension is appended if missing.
        path: PathBuf,
        /// Number of channel strips.
        #[arg(short, long, default_value_t = 24)]
        channels: u32,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            state,
            save,
            dummy,
        } => {
            let config = MixerConfig::load(config.as_deref())?;
            let transport = if dummy {
                Transport::dummy(&config)?
            } else {
                Transport::start(&config)?
            };

            if let Some(state) = state {
                transport.mixer().load_state(state)?;
            }

            info!(
                channels = config.channels,
                sample_rate = transport.sample_rate(),
                "Console running, press enter to stop"
            );
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;

            if let Some(save) = save {
                let path = transport.mixer().save_state(save)?;
                println!("Saved state to {}", path.display());
            }
        }
        Commands::InitState { path, channels } => {
            let mut ports = MemoryPorts::new(48_000, 1);
            let (mixer, _engine) = mixer(channels, 1, 48_000, &mut ports)?;
            let path = mixer.save_state(path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
