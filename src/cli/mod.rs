pub mod replay;
#[cfg(test)]
pub mod replay_test;

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use replay::handle_replay;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Feed a capture of raw trackpad packets through the report pipeline
    Replay {
        /// Capture file with one hex encoded packet per line
        capture: PathBuf,
        /// Trackpad configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Delay in milliseconds before each hardware read completes
        #[arg(short, long, default_value_t = 8)]
        interval: u64,
    },
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    match args.cmd {
        Commands::Replay {
            capture,
            config,
            interval,
        } => handle_replay(capture, config, interval).await?,
    }

    Ok(())
}
