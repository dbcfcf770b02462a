// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use chapterline_config::ConfigManager;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

mod commands;
mod player;

fn build_cli() -> Command {
    Command::new("chapterline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Audiobook playback session simulator")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("simulate")
                .about("Play a synthetic book on the virtual engine and print what happens")
                .arg(Arg::new("chapters").long("chapters").value_name("N").help("Number of chapters").value_parser(value_parser!(usize)).default_value("3"))
                .arg(Arg::new("chapter-secs").long("chapter-secs").value_name("SECS").help("Length of each chapter").value_parser(value_parser!(u64)).default_value("20"))
                .arg(Arg::new("guest").long("guest").help("Listen as a guest (preview limits apply)").action(ArgAction::SetTrue))
                .arg(Arg::new("sleep-minutes").long("sleep-minutes").value_name("MIN").help("Arm the sleep timer").value_parser(value_parser!(u32)))
                .arg(Arg::new("silent-after-secs").long("silent-after-secs").value_name("SECS").help("Mute the device after this many seconds").value_parser(value_parser!(u64)))
                .arg(Arg::new("confirm-silent").long("confirm-silent").help("Keep playing when asked about a silent device").action(ArgAction::SetTrue))
                .arg(Arg::new("run-secs").long("run-secs").value_name("SECS").help("How long to run").value_parser(value_parser!(u64)).default_value("30"))
                .arg(Arg::new("rate").long("rate").value_name("RATE").help("Playback rate").value_parser(value_parser!(f32))),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config file"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("validate").about("Check the config file for problems")),
        )
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<PathBuf>("config-dir") {
        Some(dir) => Ok(ConfigManager::with_directory(dir.clone())),
        None => ConfigManager::new().context("Failed to locate config directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    match matches.subcommand() {
        Some(("simulate", sub_matches)) => {
            let config = manager
                .load_with_env_overrides()
                .context("Failed to load config")?;
            player::simulate(&config, sub_matches).await
        }
        Some(("config", sub_matches)) => match sub_matches.subcommand() {
            Some(("init", _)) => commands::config_init(&manager),
            Some(("show", _)) => commands::config_show(&manager),
            Some(("validate", _)) => commands::config_validate(&manager),
            _ => anyhow::bail!("Unknown config subcommand"),
        },
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
