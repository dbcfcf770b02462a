// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use chapterline_config::{Config, ConfigManager};
use console::style;

/// Write a default config file unless one exists
pub fn config_init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to initialize config file")?;

    if created {
        println!(
            "{} Created {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!(
            "Config already exists at {}",
            style(manager.config_path().display()).dim()
        );
    }
    Ok(())
}

/// Print the effective configuration as TOML
pub fn config_show(manager: &ConfigManager) -> Result<()> {
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load config")?;
    println!("# {}", manager.config_path().display());
    print!("{}", render_config(&config)?);
    Ok(())
}

/// Check the stored file and fail if it has problems
pub fn config_validate(manager: &ConfigManager) -> Result<()> {
    let problems = manager.validate().context("Failed to read config")?;

    if problems.is_empty() {
        println!("{} Configuration is valid", style("✓").green().bold());
        return Ok(());
    }

    for problem in &problems {
        println!("  {} {}", style("✗").red(), problem);
    }
    bail!("{} configuration problem(s) found", problems.len());
}

fn render_config(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}
