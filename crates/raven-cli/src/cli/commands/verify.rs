//! `raven verify` - Validate a WLS response token.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, ValueEnum};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use raven_core::codec::format_timestamp;
use raven_core::{ErrorKind, PolicyError, Response, ResponseValidator, WlsError};

use super::parse_time;
use crate::cli::args::SettingsArgs;
use crate::exit_codes;
use crate::settings::CliSettings;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Response token (`WLS-Response` value); read from stdin when omitted or `-`
    pub token: Option<String>,

    /// Read the token from a file
    #[arg(long, conflicts_with = "token")]
    pub token_file: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Validate as if the current time were this (RFC 3339 or YYYYMMDDThhmmssZ)
    #[arg(long)]
    pub at: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Skip the access policy from the settings file
    #[arg(long)]
    pub skip_policy: bool,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn cmd_verify(args: VerifyArgs) -> i32 {
    match run_verify(&args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            if let Some(wls_err) = e.downcast_ref::<WlsError>() {
                match wls_err.kind {
                    ErrorKind::MalformedResponse => exit_codes::MALFORMED,
                    ErrorKind::InvalidResponse => exit_codes::INVALID,
                    ErrorKind::PublicKeyNotFound => exit_codes::KEY_NOT_FOUND,
                }
            } else if e.is::<PolicyError>() {
                exit_codes::POLICY_DENIED
            } else {
                exit_codes::ERROR
            }
        }
    }
}

fn run_verify(args: &VerifyArgs) -> Result<()> {
    let settings = CliSettings::load(
        args.settings.settings.as_deref(),
        args.settings.return_url.as_deref(),
    )?;
    let validator = ResponseValidator::from_config(settings.config.clone())
        .context("failed to load trusted keys")?;
    if validator.keys().is_empty() {
        tracing::warn!("no trusted keys configured; signed responses will be rejected");
    }

    let token = read_token(args)?;
    let now = match &args.at {
        Some(at) => parse_time(at)?,
        None => Utc::now(),
    };

    let response = validator.validate_at(&token, now)?;
    if !args.skip_policy {
        settings.policy.check(&response)?;
    }

    if !args.quiet {
        match args.format {
            OutputFormat::Text => print_text(&response),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        }
    }
    Ok(())
}

fn read_token(args: &VerifyArgs) -> Result<String> {
    let raw = match (&args.token, &args.token_file) {
        (Some(token), _) if token != "-" => token.clone(),
        (_, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read token file: {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read token from stdin")?;
            buf
        }
    };
    Ok(raw.trim().to_string())
}

fn print_text(response: &Response) {
    println!("status:    {}", response.status);
    if let Some(principal) = &response.principal {
        println!("principal: {principal}");
    }
    if !response.ptags.is_empty() {
        let ptags: Vec<&str> = response.ptags.iter().map(String::as_str).collect();
        println!("ptags:     {}", ptags.join(","));
    }
    if let Some(auth) = &response.auth {
        println!("auth:      {auth}");
    } else if !response.sso.is_empty() {
        println!("sso:       {}", response.sso.join(","));
    }
    println!("issue:     {}", format_timestamp(&response.issue));
    println!("id:        {}", response.ident);
    if let Some(life) = response.life {
        println!("life:      {life}s");
    }
    if !response.raw_params.is_empty() {
        println!("params:    {}", response.raw_params);
    }
    if let Some(msg) = &response.msg {
        println!("msg:       {msg}");
    }
    if let Some(kid) = &response.key_id {
        println!("kid:       {kid}");
    }
}
