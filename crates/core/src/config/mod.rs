use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{chat::ChatPolicy, AvatarError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub animation: AnimationConfig,
    pub emotion: EmotionConfig,
    pub chat: ChatConfig,
    pub speech: SpeechConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AvatarError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("emotion.manual_strength", self.emotion.manual_strength),
            ("emotion.chat_strength", self.emotion.chat_strength),
            ("emotion.rest_strength", self.emotion.rest_strength),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AvatarError::Config(format!(
                    "{field} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        for (field, value) in [
            ("speech.pitch", self.speech.pitch),
            ("speech.rate", self.speech.rate),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(AvatarError::Config(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// Static correction forced onto the arms every frame, after the rig's own
/// update, so the avatar never shows its T-pose default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Upper-arm roll in radians. Left gets `+`, right gets `-`.
    pub upper_arm_roll: f32,
    /// Lower-arm pitch in radians, same for both sides.
    pub lower_arm_pitch: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            upper_arm_roll: 1.15,
            lower_arm_pitch: 0.35,
        }
    }
}

/// Expression weights used by the different emotion triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Emotion picked directly in the UI.
    pub manual_strength: f32,
    /// Emotion reported with a chat reply.
    pub chat_strength: f32,
    /// Relaxed face shown when returning to idle or when speech ends.
    pub rest_strength: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            manual_strength: 1.0,
            chat_strength: crate::expression::DEFAULT_STRENGTH,
            rest_strength: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub policy: ChatPolicy,
}

/// Voice settings handed to the speech collaborator with each utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub lang: String,
    pub pitch: f32,
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            pitch: 1.8,
            rate: 1.25,
        }
    }
}
