use crate::config::generate::{
    generate_analysis_config, generate_system_config, ANALYSIS_CONFIG_FILENAME,
    SYSTEM_CONFIG_FILENAME,
};
use crate::config::{load_analysis_config, load_system_config};
use std::fs;
use std::path::{Path, PathBuf};

/// Write starter `system_config.yaml` and `analysis_config.yaml` into `dir`,
/// or print both to stdout.
pub fn init(dir: &Path, stdout: bool, force: bool) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let files = [
        (SYSTEM_CONFIG_FILENAME, generate_system_config()),
        (ANALYSIS_CONFIG_FILENAME, generate_analysis_config()),
    ];

    if stdout {
        for (name, content) in &files {
            println!("# --- {} ---", name);
            print!("{}", content);
        }
        return Ok(Vec::new());
    }

    let targets: Vec<PathBuf> = files.iter().map(|(name, _)| dir.join(name)).collect();
    if !force {
        if let Some(existing) = targets.iter().find(|p| p.exists()) {
            return Err(format!(
                "config file already exists at {} (use --force to overwrite or --stdout to print)",
                existing.display()
            )
            .into());
        }
    }

    fs::create_dir_all(dir)?;
    for ((_, content), path) in files.iter().zip(&targets) {
        fs::write(path, content)?;
        println!("Config file written to {}", path.display());
    }

    Ok(targets)
}

pub fn validate(system_config: &Path, analysis_config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating config file: {}", system_config.display());
    load_system_config(system_config)?;
    println!("✓ System config is valid");

    println!("Validating config file: {}", analysis_config.display());
    load_analysis_config(analysis_config)?;
    println!("✓ Analysis config is valid");

    Ok(())
}
