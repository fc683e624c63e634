mod app;
mod args;
mod bench;
mod logging;
mod resources;
mod video;

use crate::args::Cli;
use anyhow::Result;
use clap::Parser;
use tracing::error;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet);
    if let Err(err) = try_run(cli) {
        error!(error = %err, "vggt-probe failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_run(cli: Cli) -> Result<()> {
    app::run(cli)
}
