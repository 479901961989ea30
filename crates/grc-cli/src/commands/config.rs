//! Config commands

use anyhow::Result;
use std::path::PathBuf;

use crate::config::{Config, KEYS};
use crate::ConfigCommands;

pub fn handle(action: ConfigCommands, path: &PathBuf) -> Result<()> {
    match action {
        ConfigCommands::Init => {
            Config::default().save(path)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(path)?;
            config.set(&key, &value)?;
            config.save(path)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(path)?;
            println!("{}: {}", key, config.get(&key)?);
        }
        ConfigCommands::List => {
            let config = Config::load(path)?;
            for key in KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
    }
    Ok(())
}
