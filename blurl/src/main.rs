use blurl::{Args, Commands, Logger};
use clap::{ColorChoice, Parser};
use colored::Colorize;
use std::{
    io::{IsTerminal, stderr},
    process,
};

static LOGGER: Logger = Logger;

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Auto => colored::control::set_override(stderr().is_terminal()),
        ColorChoice::Never => colored::control::set_override(false),
    }

    log::set_logger(&LOGGER).map_err(|x| anyhow::anyhow!("{x}"))?;
    log::set_max_level(Logger::level(args.verbose, args.quiet));

    match args.command {
        Commands::Download(args) => tokio::runtime::Runtime::new()?.block_on(args.execute())?,
        Commands::Key(args) => args.execute()?,
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
