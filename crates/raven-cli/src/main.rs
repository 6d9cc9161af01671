use clap::Parser;

mod cli;
pub mod exit_codes;
mod logging;
mod settings;

use cli::args::Cli;
use cli::commands::dispatch;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    std::process::exit(dispatch(cli));
}
