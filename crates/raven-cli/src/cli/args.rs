use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{keygen, request, sign, verify};

#[derive(Parser, Debug)]
#[command(
    name = "raven",
    version,
    about = "Validate, issue and request Raven / Ucam-WebAuth (WAA2WLS) responses"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a WLS response token
    Verify(verify::VerifyArgs),
    /// Issue a signed response token (development WLS)
    Sign(sign::SignArgs),
    /// Generate an RSA keypair for a development WLS
    Keygen(keygen::KeygenArgs),
    /// Print the WLS authentication request URL
    Request(request::RequestArgs),
}

/// Where validator settings come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Settings file (YAML): validator config, trusted keys, access policy
    #[arg(long, short, env = "RAVEN_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Override the return URL from the settings file
    #[arg(long)]
    pub return_url: Option<String>,
}
