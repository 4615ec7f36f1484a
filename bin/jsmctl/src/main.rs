//! ---
//! jsm_section: "05-external-interfaces"
//! jsm_subsection: "binary"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Command console for the JSON translator."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsm_common::config::CoercionPolicy;

mod exec;
mod serve;
mod session;

const CONFIG_CANDIDATES: [&str; 2] = ["jsm.toml", "configs/jsm.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "JSON command console for DDS238 smart meters",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to JSM_CONFIG, ./jsm.toml or ./configs/jsm.toml).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Indent responses.
    #[arg(long, global = true)]
    pretty: bool,

    /// Override how mistyped payload fields are handled.
    #[arg(long, value_name = "POLICY", global = true)]
    coercion: Option<CoercionPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read one JSON request per line on stdin and answer on stdout.
    Serve(serve::ServeArgs),
    /// Run a single command chosen by name.
    Exec(exec::ExecArgs),
    /// List the supported commands.
    Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut loaded = session::load_config(cli.config.as_deref(), &CONFIG_CANDIDATES)?;
    loaded.init_logging()?;
    if cli.pretty {
        loaded.config.translator.pretty = true;
    }
    if let Some(policy) = cli.coercion {
        loaded.config.translator.coercion = policy;
    }

    match cli.command {
        Commands::Serve(args) => serve::run(&loaded, args),
        Commands::Exec(args) => exec::run(&loaded, args),
        Commands::Commands => {
            session::print_commands();
            Ok(())
        }
    }
}
