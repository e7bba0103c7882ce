//! Continuous idle and talking motion.
//!
//! Both generators are pure functions of the elapsed clock time in seconds.
//! They only run while no one-shot gesture is in flight.

use serde::{Deserialize, Serialize};

use crate::{
    pose::{Channel, PoseDelta},
    Expression, HumanBone,
};

/// Whether the avatar is speaking. Changes only through chat, UI and speech
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    #[default]
    Idle,
    Talking,
}

/// Slow breathing on spine and chest plus a gentle head turn. Also closes
/// the mouth.
pub fn idle_motion(t: f64) -> PoseDelta {
    let breath = (t * 1.2).sin() as f32;
    let look = (t * 0.6).sin() as f32;
    PoseDelta::new()
        .channel(HumanBone::Spine, Channel::Pitch, breath * 0.02)
        .channel(HumanBone::Chest, Channel::Pitch, breath * 0.01)
        .channel(HumanBone::Neck, Channel::Yaw, look * 0.05)
        .expression(Expression::Aa, 0.0)
}

/// Mouth flap in `[0, 0.9]`, head nod and a mirrored arm gesture.
pub fn talking_motion(t: f64) -> PoseDelta {
    let mouth = (t * 14.0).sin() as f32 * 0.45 + 0.45;
    let gesture = (t * 4.0).sin() as f32 * 0.05;
    PoseDelta::new()
        .expression(Expression::Aa, mouth)
        .channel(HumanBone::Neck, Channel::Pitch, (t * 3.0).sin() as f32 * 0.05)
        .channel(HumanBone::LeftUpperArm, Channel::Pitch, 0.15 + gesture)
        .channel(HumanBone::RightUpperArm, Channel::Pitch, 0.15 - gesture)
}

pub fn continuous_motion(state: AvatarState, t: f64) -> PoseDelta {
    match state {
        AvatarState::Idle => idle_motion(t),
        AvatarState::Talking => talking_motion(t),
    }
}
