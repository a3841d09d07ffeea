use scriptorium_markup::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "scriptorium.config.json";

/// Scriptorium configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// How markup files are read into passages
    #[serde(default)]
    pub load: LoadOptions,

    /// Compact written logs down to this many undoable edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_after: Option<usize>,

    /// Directory event logs are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Where the event log for `input` goes when no output is given
    pub fn log_path_for(&self, input: &Path, cwd: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let file_name = format!("{}.log.json", stem);

        match &self.out_dir {
            Some(dir) => PathBuf::from(cwd).join(dir).join(file_name),
            None => input.with_file_name(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "load": { "passageTags": ["p", "l"], "stripNamespaces": false },
            "compactAfter": 50,
            "outDir": "logs"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.load.passage_tags, vec!["p", "l"]);
        assert!(!config.load.strip_namespaces);
        assert!(config.load.is_speech_tag("said"));
        assert_eq!(config.compact_after, Some(50));
        assert_eq!(config.out_dir, Some("logs".to_string()));
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.compact_after, None);
        assert!(config.load.is_passage_tag("p"));
    }

    #[test]
    fn test_log_path_for() {
        let config = Config::default();
        assert_eq!(
            config.log_path_for(Path::new("texts/emma.xml"), "/work"),
            PathBuf::from("texts/emma.log.json")
        );

        let config = Config {
            out_dir: Some("logs".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.log_path_for(Path::new("texts/emma.xml"), "/work"),
            PathBuf::from("/work/logs/emma.log.json")
        );
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "compactAfter": 3 }"#).unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.compact_after, Some(3));
    }
}
