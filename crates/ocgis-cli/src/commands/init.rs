//! Init command implementation.

use crate::cli::InitArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::{Path, PathBuf};

/// Execute the init command.
pub fn execute_init(args: InitArgs, path: Option<&Path>, formatter: &Formatter) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::path()?,
    };
    write_default_config(&path, args.force)?;
    println!("{}", formatter.success(&format!("Wrote {}", path.display())));
    println!(
        "{}",
        formatter.info("Set store.layer_url and source.dir before running a sync")
    );
    Ok(())
}

/// Write the default configuration, refusing to replace a file unless `force`.
pub fn write_default_config(path: &Path, force: bool) -> Result<PathBuf> {
    if path.exists() && !force {
        return Err(CliError::InvalidInput(format!(
            "'{}' already exists; use --force to overwrite",
            path.display()
        )));
    }
    Config::default().save(path)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_writes_loadable_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ocgis").join("config.toml");

        write_default_config(&path, false).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[source]\nmarker = \"X\"\n").unwrap();

        assert!(matches!(
            write_default_config(&path, false),
            Err(CliError::InvalidInput(_))
        ));
        assert!(fs::read_to_string(&path).unwrap().contains("marker = \"X\""));

        write_default_config(&path, true).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), Config::default());
    }
}
