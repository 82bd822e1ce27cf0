use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

/// Client connection flags, each optionally absent. These feed both the kube
/// client construction and the interactive-shell argument builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFlags {
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    pub token: Option<String>,
}

impl ClientFlags {
    pub fn kubeconfig(&self) -> Option<&str> {
        non_empty(self.kubeconfig.as_deref())
    }

    pub fn context(&self) -> Option<&str> {
        non_empty(self.context.as_deref())
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(self.token.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Per-kind column preferences from the config file. Opaque to the
/// reconciliation logic; the gateway consults it when building headers.
#[derive(Debug, Clone, Default)]
pub struct ViewSettings {
    wide_kinds: Vec<String>,
}

impl ViewSettings {
    pub fn wide_for(&self, kind_token: &str) -> bool {
        self.wide_kinds
            .iter()
            .any(|token| token.eq_ignore_ascii_case(kind_token))
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub aliases: HashMap<String, String>,
    pub view: ViewSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            aliases: HashMap::new(),
            view: ViewSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MantaConfigFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default, alias = "wide", alias = "wide_columns")]
    wide_kinds: Vec<String>,
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    let Some(path) = discover_config_path() else {
        return Ok(RuntimeConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let parsed: MantaConfigFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;

    Ok(RuntimeConfig {
        source: Some(path.display().to_string()),
        aliases: parsed.aliases.into_iter().collect(),
        view: ViewSettings {
            wide_kinds: parsed.wide_kinds,
        },
    })
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MANTA_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [PathBuf::from("manta.yaml"), PathBuf::from(".manta.yaml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/manta/config.yaml"),
            PathBuf::from(&home).join(".config/manta/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{ClientFlags, MantaConfigFile, ViewSettings};

    #[test]
    fn empty_flag_values_read_as_absent() {
        let flags = ClientFlags {
            kubeconfig: Some(String::new()),
            context: None,
            token: Some("coolToken".to_string()),
        };
        assert_eq!(flags.kubeconfig(), None);
        assert_eq!(flags.context(), None);
        assert_eq!(flags.token(), Some("coolToken"));
    }

    #[test]
    fn config_file_parses_aliases_and_wide_kinds() {
        let parsed: MantaConfigFile =
            serde_yaml::from_str("aliases:\n  dep: deploy\nwide:\n  - po\n").unwrap();
        assert_eq!(parsed.aliases.get("dep").map(String::as_str), Some("deploy"));

        let view = ViewSettings {
            wide_kinds: parsed.wide_kinds,
        };
        assert!(view.wide_for("po"));
        assert!(!view.wide_for("svc"));
    }
}
