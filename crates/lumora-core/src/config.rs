use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumora_provider::ProviderConfig;
use serde::{Deserialize, Serialize};

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

fn default_session_ttl() -> i64 {
    lumora_session::DEFAULT_SESSION_TTL_SECONDS
}

fn default_history_turns() -> usize {
    lumora_session::DEFAULT_HISTORY_TURNS
}

fn default_search_cache_seconds() -> u64 {
    600
}

fn default_llm_timeout_seconds() -> u64 {
    20
}

fn default_fallback_reply() -> String {
    "Извините, сейчас не получается ответить развёрнуто. Уточните, пожалуйста, \
     параметры объекта (площадь, высоту, освещённость), и я подберу светильники."
        .to_owned()
}

fn default_transfer_reply() -> String {
    "Передаю диалог менеджеру, он свяжется с вами в ближайшее время. \
     Оставьте, пожалуйста, контакт для связи."
        .to_owned()
}

fn default_lead_ins() -> Vec<String> {
    vec![
        "Отличный вариант для вашей задачи:".to_owned(),
        "По вашим параметрам лучше всего подойдёт:".to_owned(),
        "Рекомендую обратить внимание на:".to_owned(),
    ]
}

/// Scripted texts: fallback replies and recommendation lead-in variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    #[serde(default = "default_transfer_reply")]
    pub transfer_reply: String,
    #[serde(default = "default_lead_ins")]
    pub lead_ins: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            fallback_reply: default_fallback_reply(),
            transfer_reply: default_transfer_reply(),
            lead_ins: default_lead_ins(),
        }
    }
}

impl ScenarioConfig {
    /// Lead-in phrase for a rotation index, round-robin over the variants.
    pub fn lead_in(&self, index: usize) -> &str {
        if self.lead_ins.is_empty() {
            return "";
        }
        &self.lead_ins[index % self.lead_ins.len()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_search_cache_seconds")]
    pub search_cache_seconds: u64,
    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            provider: None,
            session_ttl_seconds: default_session_ttl(),
            history_turns: default_history_turns(),
            search_cache_seconds: default_search_cache_seconds(),
            llm_timeout_seconds: default_llm_timeout_seconds(),
            scenario: ScenarioConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "catalog_path: data/catalog.json\n").expect("write");

        let config = BotConfig::load(file.path()).expect("load");
        assert_eq!(config.catalog_path, PathBuf::from("data/catalog.json"));
        assert!(config.provider.is_none());
        assert_eq!(config.session_ttl_seconds, 600);
        assert_eq!(config.history_turns, 6);
        assert_eq!(config.scenario.lead_ins.len(), 3);
    }

    #[test]
    fn provider_block_parses() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            "provider:\n  id: openai\n  model: gpt-4o-mini\n  api_key: sk-test\n"
        )
        .expect("write");

        let config = BotConfig::load(file.path()).expect("load");
        let provider = config.provider.expect("provider");
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn lead_in_rotation_wraps() {
        let scenario = ScenarioConfig::default();
        assert_eq!(scenario.lead_in(0), scenario.lead_in(3));
        assert_ne!(scenario.lead_in(0), scenario.lead_in(1));

        let empty = ScenarioConfig {
            lead_ins: Vec::new(),
            ..ScenarioConfig::default()
        };
        assert_eq!(empty.lead_in(7), "");
    }
}
