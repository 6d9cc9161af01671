use super::super::args::{Cli, Command};

pub fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Verify(args) => super::verify::cmd_verify(args),
        Command::Sign(args) => super::sign::cmd_sign(args),
        Command::Keygen(args) => super::keygen::cmd_keygen(args),
        Command::Request(args) => super::request::cmd_request(args),
    }
}
