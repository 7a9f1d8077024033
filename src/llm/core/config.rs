//! Generation configuration parameters

use serde::{Deserialize, Serialize};

/// Parameters for controlling text generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Randomness (0.0-2.0, higher = more random)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Ask the provider to answer with a JSON object
    #[serde(default)]
    pub json_mode: bool,
}

impl GenerationConfig {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: None,
            top_p: None,
            json_mode: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(1200).with_temperature(0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_tokens, 1200);
        assert_eq!(config.temperature, Some(0.7));
        assert!(!config.json_mode);
    }

    #[test]
    fn test_config_builder() {
        let config = GenerationConfig::new(256)
            .with_temperature(0.3)
            .with_top_p(0.9)
            .with_json_mode(true);

        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.top_p, Some(0.9));
        assert!(config.json_mode);
    }

    #[test]
    fn test_config_serialization_skips_unset_sampling() {
        let config = GenerationConfig::new(512);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"max_tokens\":512"));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("top_p"));
    }
}
