use anyhow::Result;
use tracing::info;
use vggt_probe_config::{AppConfig, LocalFileSystem};

use crate::{
    args::{Cli, Command},
    bench, video,
};

pub const APP_NAME: &str = "vggt-probe";

pub fn run(cli: Cli) -> Result<()> {
    let fs = LocalFileSystem::new(APP_NAME);
    let (mut config, descriptor) = AppConfig::load_or_init(&fs, cli.config.as_deref())?;
    config += &cli;
    config.normalise()?;
    info!(
        "Using configuration {}",
        descriptor.location.display_with(&fs)?
    );

    match &cli.command {
        Command::Bench(args) => bench::run(&fs, &config, args.report.as_deref()),
        Command::DebugVideo(args) => video::debug(&config.video, args.video.as_deref()),
        Command::ExtractSpeed(args) => video::extract_speed(&config.video, args.video.as_deref()),
        Command::Probe(args) => video::probe(&config.video, &args.video),
        Command::Layout(args) => video::layout(&args.video),
    }
}
