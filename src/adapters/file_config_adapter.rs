//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn get_list(&self, section: &str, key: &str) -> Vec<f64> {
        self.config
            .get(section, key)
            .map(|value| {
                value
                    .split(',')
                    .filter_map(|part| part.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[sqlite]
path = bots.db
pool_size = 2

[bot]
name = momentum-qqq
symbol = QQQ
interval = 1d
period = 3mo
last_n = 3

[optimize]
fast = 5, 10, 20
slow = 50,100
initial_cash = 10000
"#;

    #[test]
    fn from_string_parses_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("bot", "symbol"),
            Some("QQQ".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 2);
        assert_eq!(adapter.get_int("bot", "last_n", 1), 3);
        assert!((adapter.get_double("optimize", "initial_cash", 0.0) - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn defaults_apply_for_missing_keys() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("bot", "missing", 7), 7);
        assert!(adapter.get_bool("bot", "persist", true));
        assert!(adapter.get_string("nope", "nothing").is_none());
    }

    #[test]
    fn get_list_parses_comma_separated_values() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_list("optimize", "fast"), vec![5.0, 10.0, 20.0]);
        assert_eq!(adapter.get_list("optimize", "slow"), vec![50.0, 100.0]);
        assert!(adapter.get_list("optimize", "missing").is_empty());
    }

    #[test]
    fn from_file_reads_disk_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("bot", "name"),
            Some("momentum-qqq".to_string())
        );
    }

    #[test]
    fn bool_parsing_variants() {
        let adapter =
            FileConfigAdapter::from_string("[flags]\na = yes\nb = 0\nc = maybe\n").unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(!adapter.get_bool("flags", "b", true));
        assert!(adapter.get_bool("flags", "c", true));
    }
}
