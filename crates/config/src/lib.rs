#![forbid(unsafe_code)]

mod error;
mod forwarding;
mod learning;
mod monitor;
mod topology;

pub use error::Error;
pub use forwarding::Forwarding;
pub use learning::Learning;
pub use monitor::Monitor;
pub use topology::Topology;

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub learning: Learning,
    pub monitor: Monitor,
    pub forwarding: Forwarding,
    pub topology: Topology,
}

impl Config {
    /// Load configuration from a TOML file. Missing fields are filled with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml_edit::de::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from multiple TOML files. Later files override earlier ones.
    pub fn load_multiple<T, U>(paths: U) -> Result<Self, Error>
    where
        T: AsRef<Path>,
        U: IntoIterator<Item = T>,
    {
        let mut merged = toml_edit::DocumentMut::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(path)?;
            let doc: toml_edit::DocumentMut = text.parse()?;
            merge_document(&mut merged, doc);
        }
        let config: Config = toml_edit::de::from_str(&merged.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the learning engine cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        self.learning.validate()?;
        if self.monitor.poll_interval.is_zero() {
            return Err(Error::Invalid {
                field: "monitor.poll_interval",
                reason: "must be at least one second".into(),
            });
        }
        Ok(())
    }
}

fn merge_document(target: &mut toml_edit::DocumentMut, source: toml_edit::DocumentMut) {
    for (key, item) in source.iter() {
        merge_item(
            target.entry(key).or_insert(toml_edit::Item::None),
            item.clone(),
        );
    }
}

fn merge_item(target: &mut toml_edit::Item, source: toml_edit::Item) {
    use toml_edit::Item;
    match (target, source) {
        (Item::Table(target_table), Item::Table(source_table)) => {
            for (key, item) in source_table.iter() {
                merge_item(target_table.entry(key).or_insert(Item::None), item.clone());
            }
        }
        (Item::ArrayOfTables(target_array), Item::ArrayOfTables(source_array)) => {
            for table in source_array.iter() {
                target_array.push(table.clone());
            }
        }
        (target_item, source_item) => {
            *target_item = source_item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn defaults_match_controller_contract() {
        let config = Config::default();
        assert_eq!(config.learning.alpha, 0.5);
        assert_eq!(config.learning.gamma, 0.9);
        assert_eq!(config.learning.epsilon, 0.2);
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(5));
        assert_eq!(config.forwarding.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.forwarding.hard_timeout, Duration::ZERO);
    }

    #[test]
    fn load_multiple_merges() {
        let dir = tempdir().unwrap();
        let path1 = dir.path().join("a.toml");
        let path2 = dir.path().join("b.toml");
        let missing = dir.path().join("missing.toml");

        std::fs::write(
            &path1,
            "[learning]\nalpha = 0.25\nepsilon = 0.0\n[monitor]\npoll_interval = 10\n",
        )
        .unwrap();
        std::fs::write(&path2, "[learning]\nepsilon = 0.1\n[forwarding]\nidle_timeout = 60\n")
            .unwrap();

        let cfg = Config::load_multiple([path1, missing, path2]).unwrap();
        assert_eq!(cfg.learning.alpha, 0.25);
        assert_eq!(cfg.learning.epsilon, 0.1);
        assert_eq!(cfg.learning.gamma, 0.9);
        assert_eq!(cfg.monitor.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.forwarding.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn load_rejects_out_of_range_learning_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[learning]\nalpha = 1.5\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "learning.alpha", .. }));
    }

    #[test]
    fn load_rejects_zero_poll_interval() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[monitor]\npoll_interval = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "monitor.poll_interval", .. }));
    }
}
