//! Owner of all mutable avatar state.
//!
//! UI, chat and speech collaborators call into [`AvatarController`]; the frame
//! composer reads it once per tick. Everything runs on the tick thread.

use crate::{
    chat::{ChatOutcome, ChatReply, ChatSlot, ChatTicket, FAILURE_STATUS},
    expression::apply_emotion,
    gesture::{ActiveGesture, Gesture, OneShotSlot},
    motion::AvatarState,
    pose::BasePose,
    timeline::AnimationClock,
    AppConfig, AvatarError, Emotion, Result, Rig,
};

#[derive(Debug)]
pub struct AvatarController<R: Rig> {
    pub(crate) config: AppConfig,
    pub(crate) clock: AnimationClock,
    pub(crate) rig: Option<R>,
    pub(crate) base_pose: Option<BasePose>,
    pub(crate) state: AvatarState,
    pub(crate) emotion: Emotion,
    pub(crate) one_shot: OneShotSlot,
    chat: ChatSlot,
}

impl<R: Rig> AvatarController<R> {
    pub fn new(config: AppConfig) -> Self {
        let chat = ChatSlot::new(config.chat.policy);
        Self {
            config,
            clock: AnimationClock::new(),
            rig: None,
            base_pose: None,
            state: AvatarState::Idle,
            emotion: Emotion::Relaxed,
            one_shot: OneShotSlot::new(),
            chat,
        }
    }

    /// Load-completion hook. Captures the base pose from the rig as delivered.
    /// Only one rig may ever be attached.
    pub fn attach_rig(&mut self, rig: R) -> Result<()> {
        if self.rig.is_some() {
            return Err(AvatarError::RigAlreadyAttached);
        }
        let base = BasePose::capture(&rig);
        tracing::info!(?base, "rig attached, base pose captured");
        self.base_pose = Some(base);
        self.rig = Some(rig);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn rig(&self) -> Option<&R> {
        self.rig.as_ref()
    }

    pub fn rig_mut(&mut self) -> Option<&mut R> {
        self.rig.as_mut()
    }

    pub fn base_pose(&self) -> Option<&BasePose> {
        self.base_pose.as_ref()
    }

    pub fn state(&self) -> AvatarState {
        self.state
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    /// The one-shot gesture slot as it stands, expired or not.
    pub fn one_shot(&self) -> Option<ActiveGesture> {
        self.one_shot.peek()
    }

    /// Current animation clock time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// UI: show `emotion` at full manual strength and go back to idle.
    pub fn set_emotion(&mut self, emotion: Emotion) {
        let strength = self.config.emotion.manual_strength;
        let Some(rig) = self.rig.as_mut() else {
            tracing::debug!(%emotion, "no rig loaded, emotion ignored");
            return;
        };
        self.emotion = emotion;
        apply_emotion(rig, emotion, strength);
        self.state = AvatarState::Idle;
    }

    /// UI: start a one-shot gesture, replacing any in flight.
    pub fn trigger(&mut self, gesture: Gesture) {
        if self.rig.is_none() {
            tracing::debug!(%gesture, "no rig loaded, gesture ignored");
            return;
        }
        let now = self.clock.now();
        if let Some(replaced) = self.one_shot.trigger(gesture, now) {
            if !replaced.is_expired(now) {
                tracing::debug!(replaced = %replaced.gesture, "gesture abandoned mid-flight");
            }
        }
        tracing::info!(%gesture, now, "gesture triggered");
    }

    /// UI: drop any gesture, stop talking and relax the face.
    pub fn return_to_idle(&mut self) {
        let strength = self.config.emotion.rest_strength;
        let Some(rig) = self.rig.as_mut() else {
            tracing::debug!("no rig loaded, idle request ignored");
            return;
        };
        self.state = AvatarState::Idle;
        apply_emotion(rig, Emotion::Relaxed, strength);
        self.one_shot.clear();
    }

    /// Dispatches a UI action label such as `"happy"`, `"jump"` or `"idle"`.
    pub fn handle_action(&mut self, action: &str) -> Result<()> {
        let label = action.trim().to_ascii_lowercase();
        match label.as_str() {
            "idle" => self.return_to_idle(),
            "happy" | "sad" | "angry" | "relaxed" => self.set_emotion(label.parse()?),
            _ => self.trigger(label.parse()?),
        }
        Ok(())
    }

    /// Speech hook: the utterance started playing.
    pub fn talking_started(&mut self) {
        self.state = AvatarState::Talking;
    }

    /// Speech hook: the utterance finished. The current emotion is kept, only
    /// the face relaxes.
    pub fn talking_ended(&mut self) {
        self.state = AvatarState::Idle;
        let strength = self.config.emotion.rest_strength;
        if let Some(rig) = self.rig.as_mut() {
            apply_emotion(rig, Emotion::Relaxed, strength);
        }
    }

    /// Registers a new outgoing chat request. Requests already in flight are
    /// not cancelled.
    pub fn begin_chat(&mut self) -> ChatTicket {
        let ticket = self.chat.begin();
        tracing::debug!(ticket = ticket.id(), "chat request issued");
        ticket
    }

    /// Completion hook of the chat collaborator.
    pub fn complete_chat(&mut self, ticket: ChatTicket, result: Result<ChatReply>) -> ChatOutcome {
        if !self.chat.accepts(ticket) {
            tracing::debug!(ticket = ticket.id(), "stale chat reply discarded");
            return ChatOutcome::Stale;
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(ticket = ticket.id(), error = %err, "chat request failed");
                return ChatOutcome::Failed {
                    status: FAILURE_STATUS.to_string(),
                };
            }
        };

        let strength = self.config.emotion.chat_strength;
        let Some(rig) = self.rig.as_mut() else {
            tracing::debug!(ticket = ticket.id(), "no rig loaded, chat reply ignored");
            return ChatOutcome::NoRig;
        };
        self.emotion = reply.emotion;
        apply_emotion(rig, reply.emotion, strength);
        tracing::info!(ticket = ticket.id(), emotion = %reply.emotion, "chat reply applied");

        ChatOutcome::Applied {
            emotion: reply.emotion,
            utterance: reply.utterance(&self.config.speech),
        }
    }
}

impl<R: Rig> Default for AvatarController<R> {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
