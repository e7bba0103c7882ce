//! Core library for the Avatar Motion runtime.
//!
//! Drives a humanoid rig's bones and facial expressions procedurally, one
//! composer pass per rendered frame. Three sources compete for the pose:
//! continuous idle/talking motion, emotion-driven expressions and timed
//! one-shot gestures. The [`composer`] module arbitrates between them with a
//! strict priority order, while [`controller::AvatarController`] owns the
//! state that UI, chat and speech collaborators mutate.

pub mod chat;
pub mod composer;
pub mod config;
pub mod controller;
pub mod error;
pub mod expression;
pub mod gesture;
pub mod motion;
pub mod pose;
pub mod render;
pub mod rig;
pub mod timeline;

pub use chat::{ChatOutcome, ChatPolicy, ChatReply, ChatTicket, Utterance};
pub use composer::{compose_frame, ArmCorrection, FrameComposer, FrameOutcome, FrameTier};
pub use config::{AnimationConfig, AppConfig, ChatConfig, EmotionConfig, SpeechConfig};
pub use controller::AvatarController;
pub use error::{AvatarError, Result};
pub use expression::{apply_emotion, Emotion};
pub use gesture::{ActiveGesture, Gesture};
pub use motion::AvatarState;
pub use pose::{BasePose, PoseDelta};
pub use render::{HeadlessRenderer, Renderer};
pub use rig::{BoneTransform, Expression, HumanBone, MemoryRig, Rig};
pub use timeline::AnimationClock;
