use crate::calendar::Period;
use crate::model::Roster;
use crate::rules::RuleParameters;
use crate::scheduler::SolveError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Configuration persistée : période, équipe et règles éventuelles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub nurses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleParameters>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            month: 1,
            year: 2024,
            nurses: Vec::new(),
            rules: None,
        }
    }
}

impl Config {
    pub fn period(&self) -> Result<Period, SolveError> {
        Period::new(self.year, self.month)
    }

    pub fn roster(&self) -> Result<Roster, SolveError> {
        Roster::new(&self.nurses)
    }

    /// Règles persistées, sinon les valeurs par défaut.
    pub fn rules(&self) -> RuleParameters {
        self.rules.clone().unwrap_or_default()
    }
}

pub trait Storage {
    /// Charge la configuration ; un fichier absent donne la configuration par défaut.
    fn load(&self) -> anyhow::Result<Config>;
    /// Sauvegarde de manière atomique.
    fn save(&self, config: &Config) -> anyhow::Result<()>;
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Config> {
        let data = match fs::read(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let config: Config = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(config)
    }

    fn save(&self, config: &Config) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(config)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("config.json"));
        let config = storage.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.period().unwrap().day_count(), 31);
        assert!(config.roster().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::open(dir.path().join("config.json"));
        let mut rules = RuleParameters::default();
        rules.set("weekday.night.min", "1").unwrap();
        let config = Config {
            month: 9,
            year: 2025,
            nurses: vec!["ana".into(), "ben".into()],
            rules: Some(rules.clone()),
        };
        storage.save(&config).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.rules(), rules);
    }

    #[test]
    fn original_layout_without_rules_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"month": 3, "year": 2024, "nurses": ["A", "B"], "free_days": {}}"#)
            .unwrap();
        // champ inconnu toléré au niveau de la configuration
        let config = JsonStorage::open(&path).load().unwrap();
        assert_eq!(config.nurses, vec!["A", "B"]);
        assert_eq!(config.rules(), RuleParameters::default());
    }
}
