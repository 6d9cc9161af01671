//! `raven sign` - Issue a signed response token, as a development WLS would.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use std::fs;
use std::path::PathBuf;

use raven_core::{IssuedResponse, KeyId, Status, TokenIssuer, LATEST_VERSION};

use super::parse_time;
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Private key file (PKCS#8 or PKCS#1 PEM)
    #[arg(long)]
    pub key: PathBuf,

    /// Key id written into the token
    #[arg(long)]
    pub kid: KeyId,

    /// Return URL the token is addressed to
    #[arg(long)]
    pub url: String,

    /// Authenticated principal (ignored for failure statuses)
    #[arg(long, default_value = "")]
    pub principal: String,

    /// Status code
    #[arg(long, default_value_t = 200)]
    pub status: u16,

    /// Protocol version
    #[arg(long, default_value_t = LATEST_VERSION)]
    pub ver: u8,

    /// Comma-separated ptags (version 3 only)
    #[arg(long, value_delimiter = ',')]
    pub ptags: Vec<String>,

    /// Interactive authentication method
    #[arg(long, default_value = "pwd", conflicts_with = "sso")]
    pub auth: String,

    /// Comma-separated methods of earlier authentications (single sign-on)
    #[arg(long, value_delimiter = ',')]
    pub sso: Vec<String>,

    /// Remaining session life in seconds
    #[arg(long)]
    pub life: Option<u64>,

    /// Params to echo back
    #[arg(long, default_value = "")]
    pub params: String,

    /// Message for the WAA
    #[arg(long, default_value = "")]
    pub msg: String,

    /// Issue time (RFC 3339 or YYYYMMDDThhmmssZ); defaults to now
    #[arg(long)]
    pub issue: Option<String>,

    /// Response id; derived from the issue time when omitted
    #[arg(long)]
    pub ident: Option<String>,
}

pub fn cmd_sign(args: SignArgs) -> i32 {
    match run_sign(args) {
        Ok(token) => {
            println!("{token}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::ERROR
        }
    }
}

fn run_sign(args: SignArgs) -> Result<String> {
    let pem = fs::read_to_string(&args.key)
        .with_context(|| format!("failed to read private key: {}", args.key.display()))?;
    let issuer = TokenIssuer::from_pem(&pem, args.kid.clone())?;

    let status = Status::try_from(args.status)?;
    let issue = match &args.issue {
        Some(s) => parse_time(s)?,
        None => Utc::now(),
    };

    let mut response = if status.is_success() {
        if args.principal.is_empty() {
            anyhow::bail!("--principal is required for status 200");
        }
        IssuedResponse::success(args.url, args.principal, issue)
    } else {
        IssuedResponse::failure(args.url, status, issue)
    };

    response = response
        .with_version(args.ver)
        .with_ptags(args.ptags)
        .with_params(args.params)
        .with_msg(args.msg);
    if status.is_success() {
        response = if args.sso.is_empty() {
            response.with_auth(args.auth)
        } else {
            response.with_sso(args.sso)
        };
    }
    if let Some(life) = args.life {
        response = response.with_life(life);
    }
    if let Some(ident) = args.ident {
        response = response.with_ident(ident);
    }

    let token = issuer.sign(&response)?;
    tracing::debug!(kid = %args.kid, status = status.code(), "issued token");
    Ok(token)
}
