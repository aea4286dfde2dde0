//! E4 command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Derive an Ed25519 keypair from a password: writes ./admin and ./admin.pub
//! e4 keygen --name admin --password admin-super-secret-password
//!
//! # Control topic a client must subscribe to
//! e4 control-topic --client alice
//!
//! # Symmetric and public-key flows end to end over an in-process broker
//! e4 simulate --dir ./demo-state --admin-key admin
//! ```

#![forbid(unsafe_code)]

mod error;
mod keygen;
mod simulate;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use e4_crypto::derive_identifier;
use e4_proto::control_topic_path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::simulate::SimulateOptions;

/// E4 key management tooling
#[derive(Parser, Debug)]
#[command(name = "e4")]
#[command(about = "End-to-end key management for pub/sub messaging")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive an Ed25519 keypair from a password and write it to disk
    Keygen {
        /// Private key file; the public key goes to `<name>.pub`
        #[arg(short, long)]
        name: PathBuf,

        /// Password to derive the keypair from (at least 16 characters)
        #[arg(short, long)]
        password: String,
    },

    /// Print the control topic of a client
    ControlTopic {
        /// Client name
        #[arg(short, long)]
        client: String,
    },

    /// Run the symmetric and public-key flows over an in-process broker
    Simulate(SimulateOptions),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match args.command {
        Commands::Keygen { name, password } => {
            keygen::run(&name, &password)?;
        },
        Commands::ControlTopic { client } => {
            let path = control_topic_path(&derive_identifier(&client));
            writeln!(io::stdout().lock(), "{path}")?;
        },
        Commands::Simulate(options) => simulate::run(&options)?,
    }

    Ok(())
}
