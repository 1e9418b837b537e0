use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use postdesk::config::{CFG_FILE_NAME, CONFIG_SAMPLE};

use crate::InitArgs;

pub fn init_cmd(args: InitArgs) -> Result<()> {
    let out_path = PathBuf::from(&args.out_dir);
    if !out_path.is_dir() {
        bail!("Output path must be a directory: {}", out_path.display());
    }

    let cfg_path = out_path.join(CFG_FILE_NAME);
    if cfg_path.exists() {
        bail!("{} already exists", cfg_path.display());
    }

    fs::write(&cfg_path, CONFIG_SAMPLE)
        .with_context(|| format!("Error writing {}", cfg_path.display()))?;
    println!("Configuration written to {}", cfg_path.display());
    Ok(())
}
