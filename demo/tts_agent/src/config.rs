use std::fs;
use std::path::Path;

use om1_core::BackgroundConfig;
use om1_speech::ELEVENLABS_TTS_BACKGROUND;

/// High-level configuration for the TTS agent demo
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub name: String,
    pub backgrounds: Vec<BackgroundEntry>,
}

/// One background to construct at startup
#[derive(Clone, Debug)]
pub struct BackgroundEntry {
    pub kind: String,
    pub config: BackgroundConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: std::env::var("AGENT_NAME").unwrap_or_else(|_| "tts_agent".to_string()),
            backgrounds: vec![BackgroundEntry {
                kind: ELEVENLABS_TTS_BACKGROUND.to_string(),
                config: BackgroundConfig::new(),
            }],
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file (path via TTS_AGENT_CONFIG or ./tts_agent.toml),
    /// overlaying values onto defaults, then fill API keys from the environment.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("TTS_AGENT_CONFIG").unwrap_or_else(|_| "tts_agent.toml".into());
        let p = Path::new(&path);
        let cfg = if !p.exists() {
            tracing::info!(target = "tts_agent", path = %path, "No TOML config found; using defaults/env");
            default
        } else {
            match fs::read_to_string(p) {
                Ok(s) => match toml::from_str::<AgentToml>(&s) {
                    Ok(t) => t.overlay(default),
                    Err(e) => {
                        tracing::warn!(target = "tts_agent", error = %e, "Failed to parse TOML; using defaults");
                        default
                    }
                },
                Err(e) => {
                    tracing::warn!(target = "tts_agent", error = %e, "Failed to read TOML; using defaults");
                    default
                }
            }
        };
        cfg.with_env_keys(
            std::env::var("OM_API_KEY").ok().filter(|s| !s.is_empty()),
            std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
        )
    }

    /// Fill `api_key` / `elevenlabs_api_key` on TTS backgrounds that leave them unset.
    pub fn with_env_keys(mut self, om_key: Option<String>, elevenlabs_key: Option<String>) -> Self {
        for entry in self
            .backgrounds
            .iter_mut()
            .filter(|e| e.kind == ELEVENLABS_TTS_BACKGROUND)
        {
            let mut config = entry.config.clone();
            if let Some(k) = &om_key {
                if !config.contains("api_key") {
                    config = config.with("api_key", k.clone());
                }
            }
            if let Some(k) = &elevenlabs_key {
                if !config.contains("elevenlabs_api_key") {
                    config = config.with("elevenlabs_api_key", k.clone());
                }
            }
            entry.config = config;
        }
        self
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AgentToml {
    pub name: Option<String>,
    pub backgrounds: Option<Vec<BackgroundToml>>,
}

impl AgentToml {
    fn overlay(self, mut base: AgentConfig) -> AgentConfig {
        if let Some(n) = self.name {
            base.name = n;
        }
        if let Some(b) = self.backgrounds {
            base.backgrounds = b.into_iter().map(BackgroundToml::into_entry).collect();
        }
        base
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct BackgroundToml {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: BackgroundConfig,
}

impl BackgroundToml {
    fn into_entry(self) -> BackgroundEntry {
        BackgroundEntry {
            kind: self.kind,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> AgentConfig {
        let t: AgentToml = toml::from_str(src).unwrap();
        t.overlay(AgentConfig {
            name: "base".into(),
            backgrounds: vec![],
        })
    }

    #[test]
    fn test_overlay_backgrounds() {
        let cfg = parse(
            r#"
            name = "robot"

            [[backgrounds]]
            type = "ElevenLabsTTS"

            [backgrounds.config]
            voice_id = "custom_voice"
            "#,
        );
        assert_eq!(cfg.name, "robot");
        assert_eq!(cfg.backgrounds.len(), 1);
        assert_eq!(cfg.backgrounds[0].kind, ELEVENLABS_TTS_BACKGROUND);
        assert_eq!(
            cfg.backgrounds[0].config.get_str("voice_id"),
            Some("custom_voice")
        );
    }

    #[test]
    fn test_env_keys_do_not_override_file() {
        let cfg = parse(
            r#"
            [[backgrounds]]
            type = "ElevenLabsTTS"
            [backgrounds.config]
            api_key = "from_file"
            "#,
        )
        .with_env_keys(Some("from_env".into()), Some("el_env".into()));

        let c = &cfg.backgrounds[0].config;
        assert_eq!(c.get_str("api_key"), Some("from_file"));
        assert_eq!(c.get_str("elevenlabs_api_key"), Some("el_env"));
    }

    #[test]
    fn test_background_without_config_table() {
        let cfg = parse(
            r#"
            [[backgrounds]]
            type = "ElevenLabsTTS"
            "#,
        );
        assert!(cfg.backgrounds[0].config.get_str("voice_id").is_none());
    }
}
