//! Config command implementation.

use anyhow::{bail, Result};

use grabdrop_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = Config::load()?;
            show(&config);
        }

        ConfigAction::Init { force } => {
            let path = Config::config_path();
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save_to(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }

        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
        }
    }

    Ok(())
}

fn show(config: &Config) {
    println!();
    println!("Grabdrop Configuration");
    println!("{}", "─".repeat(50));
    println!();
    println!("[general]");
    println!("  device_name = \"{}\"", config.general.device_name);
    println!();
    println!("[network]");
    println!("  port = {}", config.network.port);
    println!("  ping_timeout = \"{:?}\"", config.network.ping_timeout);
    println!("  send_timeout = \"{:?}\"", config.network.send_timeout);
    println!();
    println!("[gesture]");
    println!("  hold_threshold = \"{:?}\"", config.gesture.hold_threshold);
    println!("  frame_width = {}", config.gesture.frame_width);
    println!("  frame_height = {}", config.gesture.frame_height);
    println!("  edge_margin = {}", config.gesture.edge_margin);
    println!();
    println!("[clipboard]");
    println!(
        "  staging_dir = \"{}\"",
        config.clipboard.staging_dir().display()
    );
    println!("  max_staged_age = \"{:?}\"", config.clipboard.max_staged_age);
    println!();
    println!("[receive]");
    println!("  upload_dir = \"{}\"", config.receive.upload_dir.display());
    println!("  max_upload_size = {}", config.receive.max_upload_size);
    println!();
}
