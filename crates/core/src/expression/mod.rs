//! Emotion labels and their facial expression weights.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{pose::PoseDelta, AvatarError, Expression, Rig};

/// Weight used when a caller does not specify one.
pub const DEFAULT_STRENGTH: f32 = 0.9;

/// Expressions cleared before an emotion is applied.
pub const EMOTION_EXPRESSIONS: [Expression; 6] = [
    Expression::Happy,
    Expression::Sad,
    Expression::Angry,
    Expression::Relaxed,
    Expression::Surprised,
    Expression::Neutral,
];

/// Semantic emotion reported by the chat collaborator or chosen in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    #[default]
    Relaxed,
    Surprised,
    Neutral,
}

impl Emotion {
    /// Expression preset that represents this emotion on the face.
    pub fn expression(self) -> Expression {
        match self {
            Emotion::Happy => Expression::Happy,
            Emotion::Sad => Expression::Sad,
            Emotion::Angry => Expression::Angry,
            Emotion::Relaxed => Expression::Neutral,
            Emotion::Surprised => Expression::Surprised,
            Emotion::Neutral => Expression::Neutral,
        }
    }

    /// Parses a label coming from outside the core. Unknown labels fall back
    /// to [`Emotion::Neutral`] since that is the expression they would map to.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| {
            tracing::debug!(label, "unknown emotion label, using neutral");
            Emotion::Neutral
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Relaxed => "relaxed",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }
}

impl FromStr for Emotion {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            "relaxed" => Ok(Emotion::Relaxed),
            "surprised" => Ok(Emotion::Surprised),
            "neutral" => Ok(Emotion::Neutral),
            _ => Err(AvatarError::UnknownEmotion(s.to_string())),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zeroes every emotion expression, then sets the mapped one to `strength`.
/// This is a full overwrite, never a blend.
pub fn emotion_delta(emotion: Emotion, strength: f32) -> PoseDelta {
    EMOTION_EXPRESSIONS
        .iter()
        .fold(PoseDelta::new(), |delta, &expression| {
            delta.expression(expression, 0.0)
        })
        .expression(emotion.expression(), strength)
}

pub fn apply_emotion<R: Rig + ?Sized>(rig: &mut R, emotion: Emotion, strength: f32) {
    emotion_delta(emotion, strength).apply(rig);
}
