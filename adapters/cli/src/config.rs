//! Session configuration loading.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tower_defence_core::SessionConfig;

/// Session played when no configuration file is supplied.
const DEFAULT_SESSION: &str = include_str!("../assets/session.toml");

/// Loads the session configuration from `path`, or the embedded default.
pub(crate) fn load(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read session config {}", path.display()))?;
            parse(&contents)
                .with_context(|| format!("failed to parse session config {}", path.display()))
        }
        None => parse(DEFAULT_SESSION).context("failed to parse embedded session config"),
    }
}

fn parse(contents: &str) -> Result<SessionConfig> {
    toml::from_str(contents).context("invalid session config toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_defence_core::{CellOffset, DefinitionId};

    #[test]
    fn embedded_session_parses() {
        let config = load(None).expect("embedded config");
        assert_eq!(config.max_lives, 10);
        assert_eq!(config.starting_money, 100);
        assert_eq!(config.waves.len(), 3);

        let cannon = config
            .towers
            .iter()
            .find(|tower| tower.id == DefinitionId::new(3))
            .expect("cannon definition");
        assert_eq!(cannon.price, 75);
        assert_eq!(cannon.footprint.len(), 4);
        assert!(cannon.footprint.contains(&CellOffset::new(1, 1)));
        assert_eq!(cannon.upgrades, vec![DefinitionId::new(4)]);
    }

    #[test]
    fn missing_fields_are_reported() {
        assert!(parse("max_lives = 3").is_err());
    }

    #[test]
    fn unreadable_file_is_reported() {
        let error = load(Some(Path::new("does/not/exist.toml"))).expect_err("missing file");
        assert!(error.to_string().contains("failed to read session config"));
    }
}
