use serde::{Deserialize, Serialize};

/// Options controlling how markup source is read into passages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    /// Element names that form passages (outermost match wins)
    #[serde(default = "default_passage_tags")]
    pub passage_tags: Vec<String>,

    /// Element names treated as speech markup
    #[serde(default = "default_speech_tags")]
    pub speech_tags: Vec<String>,

    /// Drop `prefix:` from element names and `xmlns` declarations
    #[serde(default = "default_true")]
    pub strip_namespaces: bool,

    /// Seed for generated ids (defaults to a CRC32 of the document name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_seed: Option<String>,
}

fn default_passage_tags() -> Vec<String> {
    ["p", "ab", "l", "sp", "u"].iter().map(|s| s.to_string()).collect()
}

fn default_speech_tags() -> Vec<String> {
    ["q", "quote", "said", "sp", "s", "speech"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

impl LoadOptions {
    pub fn is_passage_tag(&self, name: &str) -> bool {
        self.passage_tags.iter().any(|tag| tag == name)
    }

    pub fn is_speech_tag(&self, name: &str) -> bool {
        self.speech_tags.iter().any(|tag| tag == name)
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            passage_tags: default_passage_tags(),
            speech_tags: default_speech_tags(),
            strip_namespaces: true,
            id_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let json = r#"{ "passageTags": ["p"], "stripNamespaces": false, "idSeed": "doc" }"#;
        let options: LoadOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.passage_tags, vec!["p"]);
        assert!(!options.strip_namespaces);
        assert_eq!(options.id_seed.as_deref(), Some("doc"));
        // Unspecified fields fall back to defaults
        assert!(options.is_speech_tag("said"));
    }

    #[test]
    fn test_default_options() {
        let options = LoadOptions::default();
        assert!(options.is_passage_tag("ab"));
        assert!(!options.is_passage_tag("div"));
        assert!(options.strip_namespaces);
    }
}
