use clap::Parser;
use energy_forecast::Cli;
use energy_forecast::logging::*;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log = DEFAULT.new(o!("function" => "main"));
    debug!(log, "starting");

    if let Err(err) = energy_forecast::run(cli).await {
        error!(log, "command failed"; "error" => format!("{:#}", err));
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
