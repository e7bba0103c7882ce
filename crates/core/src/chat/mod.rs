//! Boundary with the chat-completion collaborator.
//!
//! The collaborator owns the network round trip. The core parses what comes
//! back, decides whether the reply may still apply and hands an utterance to
//! the speech collaborator.

use serde::{Deserialize, Serialize};

use crate::{config::SpeechConfig, AvatarError, Emotion, Result};

/// System instruction given to the model so replies come back in the shape
/// [`ChatReply::from_model_output`] understands.
pub const REPLY_INSTRUCTION: &str = "Reply with JSON only: \
{ \"text\": \"...\", \"emotion\": \"happy|sad|angry|relaxed|surprised\" }";

/// Status shown to the user when a chat round trip fails.
pub const FAILURE_STATUS: &str = "Chat failed (see log)";

/// Parsed chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub emotion: Emotion,
}

#[derive(Deserialize)]
struct RawReply {
    text: String,
    #[serde(default)]
    emotion: Option<String>,
}

impl ChatReply {
    /// Extracts the outermost `{...}` span from free-form model output and
    /// decodes it. A missing or empty emotion means relaxed.
    pub fn from_model_output(raw: &str) -> Result<Self> {
        let json = match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if start < end => &raw[start..=end],
            _ => {
                return Err(AvatarError::MalformedReply(
                    "no JSON object in model output".to_string(),
                ))
            }
        };

        let reply: RawReply = serde_json::from_str(json)
            .map_err(|e| AvatarError::MalformedReply(e.to_string()))?;

        let emotion = match reply.emotion.as_deref().map(str::trim) {
            None | Some("") => Emotion::Relaxed,
            Some(label) => Emotion::from_label(label),
        };

        Ok(Self {
            text: reply.text,
            emotion,
        })
    }

    pub fn utterance(&self, speech: &SpeechConfig) -> Utterance {
        Utterance {
            text: self.text.clone(),
            lang: speech.lang.clone(),
            pitch: speech.pitch,
            rate: speech.rate,
        }
    }
}

/// What the speech collaborator should say. It calls back into the
/// controller when the utterance starts and ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub pitch: f32,
    pub rate: f32,
}

/// How completions of overlapping requests are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatPolicy {
    /// Every completion applies in the order it arrives; last writer wins.
    #[default]
    ArrivalOrder,
    /// Only the most recently issued request may apply its result.
    LatestOnly,
}

/// Identifies one chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatTicket(u64);

impl ChatTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Single pending-request slot. Starting a request never blocks on one that
/// is already in flight.
#[derive(Debug, Clone, Default)]
pub struct ChatSlot {
    policy: ChatPolicy,
    issued: u64,
}

impl ChatSlot {
    pub fn new(policy: ChatPolicy) -> Self {
        Self { policy, issued: 0 }
    }

    pub fn begin(&mut self) -> ChatTicket {
        self.issued += 1;
        ChatTicket(self.issued)
    }

    /// Whether a completion for `ticket` may still touch avatar state.
    pub fn accepts(&self, ticket: ChatTicket) -> bool {
        match self.policy {
            ChatPolicy::ArrivalOrder => true,
            ChatPolicy::LatestOnly => ticket.0 == self.issued,
        }
    }
}

/// Result of feeding a completion to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Applied { emotion: Emotion, utterance: Utterance },
    /// A newer request superseded this one; nothing changed.
    Stale,
    /// The round trip failed; nothing changed.
    Failed { status: String },
    /// No rig is loaded yet; nothing changed.
    NoRig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_chatty_output() {
        let raw = "Sure! ```json\n{ \"text\": \"Hi there\", \"emotion\": \"happy\" }\n```";
        let reply = ChatReply::from_model_output(raw).unwrap();
        assert_eq!(reply.text, "Hi there");
        assert_eq!(reply.emotion, Emotion::Happy);
    }

    #[test]
    fn missing_emotion_defaults_to_relaxed() {
        let reply = ChatReply::from_model_output(r#"{"text":"ok"}"#).unwrap();
        assert_eq!(reply.emotion, Emotion::Relaxed);

        let reply = ChatReply::from_model_output(r#"{"text":"ok","emotion":""}"#).unwrap();
        assert_eq!(reply.emotion, Emotion::Relaxed);
    }

    #[test]
    fn unknown_emotion_maps_to_neutral() {
        let reply = ChatReply::from_model_output(r#"{"text":"hm","emotion":"smug"}"#).unwrap();
        assert_eq!(reply.emotion, Emotion::Neutral);
    }

    #[test]
    fn rejects_output_without_json() {
        let err = ChatReply::from_model_output("I cannot answer that.").unwrap_err();
        assert!(matches!(err, AvatarError::MalformedReply(_)));

        let err = ChatReply::from_model_output("} backwards {").unwrap_err();
        assert!(matches!(err, AvatarError::MalformedReply(_)));
    }

    #[test]
    fn rejects_reply_without_text() {
        let err = ChatReply::from_model_output(r#"{"emotion":"sad"}"#).unwrap_err();
        assert!(matches!(err, AvatarError::MalformedReply(_)));
    }

    #[test]
    fn utterance_carries_voice_settings() {
        let reply = ChatReply {
            text: "hello".to_string(),
            emotion: Emotion::Happy,
        };
        let utterance = reply.utterance(&SpeechConfig::default());
        assert_eq!(utterance.lang, "en-US");
        assert_eq!(utterance.pitch, 1.8);
        assert_eq!(utterance.rate, 1.25);
    }

    #[test]
    fn latest_only_rejects_superseded_tickets() {
        let mut slot = ChatSlot::new(ChatPolicy::LatestOnly);
        let first = slot.begin();
        let second = slot.begin();
        assert!(!slot.accepts(first));
        assert!(slot.accepts(second));

        let mut slot = ChatSlot::new(ChatPolicy::ArrivalOrder);
        let first = slot.begin();
        slot.begin();
        assert!(slot.accepts(first));
    }
}
