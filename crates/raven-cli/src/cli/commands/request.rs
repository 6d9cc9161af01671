//! `raven request` - Print the URL that sends a user to the WLS login page.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use raven_core::AuthRequest;

use crate::cli::args::SettingsArgs;
use crate::exit_codes;
use crate::settings::CliSettings;

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// WLS login page (default: settings `login_url`, then the Raven service)
    #[arg(long)]
    pub login_url: Option<String>,

    /// Resource description shown on the login page
    #[arg(long)]
    pub desc: Option<String>,

    /// Why authentication is being requested
    #[arg(long)]
    pub msg: Option<String>,

    /// Data the WLS echoes back in the response
    #[arg(long)]
    pub params: Option<String>,

    /// Send the current time as `date`
    #[arg(long)]
    pub date: bool,

    /// Let the WLS handle errors itself instead of returning them
    #[arg(long)]
    pub fail: bool,
}

pub fn cmd_request(args: RequestArgs) -> i32 {
    match run_request(args) {
        Ok(url) => {
            println!("{url}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::ERROR
        }
    }
}

fn run_request(args: RequestArgs) -> Result<String> {
    let settings = CliSettings::load(
        args.settings.settings.as_deref(),
        args.settings.return_url.as_deref(),
    )?;

    let mut request = AuthRequest::from_config(&settings.config).with_fail(args.fail);
    if let Some(desc) = args.desc {
        request = request.with_desc(desc);
    }
    if let Some(msg) = args.msg {
        request = request.with_msg(msg);
    }
    if let Some(params) = args.params {
        request = request.with_params(params);
    }
    if args.date {
        request = request.with_date(Utc::now());
    }

    let login_url = args
        .login_url
        .as_deref()
        .unwrap_or_else(|| settings.login_url());
    let url = request
        .to_url(login_url)
        .with_context(|| format!("invalid login URL: {login_url}"))?;
    Ok(url.to_string())
}
