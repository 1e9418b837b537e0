use std::path::PathBuf;

use anyhow::{anyhow, Result};

use postdesk::config::{find_config, read_config, Config, CFG_FILE_NAME};

pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<Config> {
    let config_path = match cfg_path.or_else(find_config) {
        Some(path) => path,
        None => return Err(anyhow!("Could not find {}. Run postdesk init to create one", CFG_FILE_NAME)),
    };

    eprintln!("Reading config from {}", config_path.display());
    let mut config = read_config(&config_path)?;

    if let Some(ref mut log) = config.log {
        if log.location.is_none() {
            log.location = dirs::cache_dir().map(|dir| dir.join("postdesk").join("log").join("postdesk.log"));
        }
    }

    Ok(config)
}
