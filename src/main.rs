use clap::Parser;
use sppcast::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
