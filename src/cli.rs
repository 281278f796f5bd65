use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML config file
    #[clap(long, global = true, env = "OGP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve link-preview metadata over HTTP
    Serve {
        /// Address to listen on (overrides config)
        #[clap(short, long)]
        listen: Option<String>,
    },

    /// Fetch metadata for a single url and print it
    Fetch {
        /// Page url
        url: String,

        /// Language to fetch the page in (en, ja)
        #[clap(short, long)]
        lang: Option<String>,

        /// User-Agent sent to the page
        #[clap(short = 'A', long)]
        user_agent: Option<String>,
    },
}
