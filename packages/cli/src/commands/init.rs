use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use trellis_editor::{EditorConfig, DEFAULT_CONFIG_NAME};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!("{} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME.bright_white());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let content = serde_json::to_string_pretty(&EditorConfig::default())?;
    fs::write(&config_path, content + "\n")?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    Ok(())
}
