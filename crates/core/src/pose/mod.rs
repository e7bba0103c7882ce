use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::rig::{Expression, HumanBone, Rig};

/// Reference orientations captured once, right after the rig is loaded.
///
/// Fields are `None` when the rig lacks the bone. Gestures read this snapshot
/// to interpolate from and back to rest; it is never mutated after capture.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BasePose {
    pub hips_y: Option<f32>,
    pub left_upper_arm: Option<Vec3>,
    pub right_upper_arm: Option<Vec3>,
    pub neck: Option<Vec3>,
}

impl BasePose {
    pub fn capture<R: Rig + ?Sized>(rig: &R) -> Self {
        Self {
            hips_y: rig.bone(HumanBone::Hips).map(|hips| hips.position.y),
            left_upper_arm: rig.bone(HumanBone::LeftUpperArm).map(|b| b.rotation),
            right_upper_arm: rig.bone(HumanBone::RightUpperArm).map(|b| b.rotation),
            neck: rig.bone(HumanBone::Neck).map(|b| b.rotation),
        }
    }
}

/// Single scalar component of a bone transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Pitch,
    Yaw,
    Roll,
    PositionY,
}

/// One write produced by a pose function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoseWrite {
    Channel {
        bone: HumanBone,
        channel: Channel,
        value: f32,
    },
    /// Replaces the whole Euler rotation of a bone.
    Rotation { bone: HumanBone, rotation: Vec3 },
    Expression { expression: Expression, weight: f32 },
}

/// Ordered list of writes computed without touching a rig.
///
/// Pose functions return a delta, the composer applies it. Later writes win
/// over earlier ones on the same channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDelta {
    writes: Vec<PoseWrite>,
}

impl PoseDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, bone: HumanBone, channel: Channel, value: f32) -> Self {
        self.writes.push(PoseWrite::Channel {
            bone,
            channel,
            value,
        });
        self
    }

    pub fn rotation(mut self, bone: HumanBone, rotation: Vec3) -> Self {
        self.writes.push(PoseWrite::Rotation { bone, rotation });
        self
    }

    pub fn expression(mut self, expression: Expression, weight: f32) -> Self {
        self.writes.push(PoseWrite::Expression { expression, weight });
        self
    }

    /// Appends every write of `other` after the writes of `self`.
    pub fn then(mut self, other: PoseDelta) -> Self {
        self.writes.extend(other.writes);
        self
    }

    pub fn writes(&self) -> &[PoseWrite] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Final value this delta leaves on a channel, if it writes one.
    pub fn channel_value(&self, bone: HumanBone, channel: Channel) -> Option<f32> {
        self.writes.iter().rev().find_map(|write| match *write {
            PoseWrite::Channel {
                bone: b,
                channel: c,
                value,
            } if b == bone && c == channel => Some(value),
            PoseWrite::Rotation { bone: b, rotation } if b == bone => match channel {
                Channel::Pitch => Some(rotation.x),
                Channel::Yaw => Some(rotation.y),
                Channel::Roll => Some(rotation.z),
                Channel::PositionY => None,
            },
            _ => None,
        })
    }

    pub fn expression_weight(&self, expression: Expression) -> Option<f32> {
        self.writes.iter().rev().find_map(|write| match *write {
            PoseWrite::Expression {
                expression: e,
                weight,
            } if e == expression => Some(weight),
            _ => None,
        })
    }

    /// Writes the delta onto the rig in order and returns how many bone
    /// writes were skipped because the rig lacks the bone.
    pub fn apply<R: Rig + ?Sized>(&self, rig: &mut R) -> usize {
        let mut skipped = 0;
        for write in &self.writes {
            match *write {
                PoseWrite::Channel {
                    bone,
                    channel,
                    value,
                } => match rig.bone_mut(bone) {
                    Some(transform) => match channel {
                        Channel::Pitch => transform.rotation.x = value,
                        Channel::Yaw => transform.rotation.y = value,
                        Channel::Roll => transform.rotation.z = value,
                        Channel::PositionY => transform.position.y = value,
                    },
                    None => {
                        tracing::trace!(%bone, ?channel, "bone missing on rig, write skipped");
                        skipped += 1;
                    }
                },
                PoseWrite::Rotation { bone, rotation } => match rig.bone_mut(bone) {
                    Some(transform) => transform.rotation = rotation,
                    None => {
                        tracing::trace!(%bone, "bone missing on rig, rotation skipped");
                        skipped += 1;
                    }
                },
                PoseWrite::Expression { expression, weight } => {
                    rig.set_expression(expression, weight);
                }
            }
        }
        skipped
    }
}
