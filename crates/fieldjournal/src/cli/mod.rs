//! Command implementations and the helpers they share.

pub mod analyze;
pub mod config;
pub mod gallery;
pub mod photos;
pub mod upload;

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fieldjournal_core::{Config, FieldJournal, OutputWriter};
use uuid::Uuid;

/// Load `path` when given, otherwise the default config location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let path = expand_path(path);
            Config::load_from(&path).with_context(|| format!("reading {}", path.display()))
        }
        None => Ok(Config::load()?),
    }
}

/// Expand `~` and `$VAR` in a path argument.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Parse a gallery or photo id argument.
pub fn parse_id(kind: &str, raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid {kind} id: {raw:?}"))
}

/// Services against the configured backends.
pub fn connect(config: Config) -> anyhow::Result<FieldJournal> {
    FieldJournal::new(config).context(
        "could not connect to the gallery store\n\n  \
         Hint: set store.url and store.api_key, or run `fieldjournal config init`.",
    )
}

/// JSON writer on stdout using the `[output]` settings.
pub fn stdout_writer(config: &Config) -> OutputWriter<Stdout> {
    OutputWriter::from_config(io::stdout(), &config.output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_trims() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("photo", &format!(" {id} ")).unwrap(), id);
        assert!(parse_id("photo", "not-a-uuid").is_err());
    }

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(expand_path(Path::new("photos/dawn.jpg")), PathBuf::from("photos/dawn.jpg"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upload]\nmax_concurrent = 5\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.upload.max_concurrent, 5);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
