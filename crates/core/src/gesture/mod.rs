//! Timed one-shot gestures that override continuous motion until they expire.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    pose::{BasePose, Channel, PoseDelta},
    AvatarError, Expression, HumanBone,
};

const JUMP_HEIGHT: f32 = 0.12;
const SURPRISE_ARM_RAISE: f32 = 0.8;
const SURPRISE_HEAD_TILT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Jump,
    Dance,
    Surprised,
}

impl Gesture {
    pub fn duration(self) -> Duration {
        match self {
            Gesture::Jump => Duration::from_millis(900),
            Gesture::Dance => Duration::from_millis(2500),
            Gesture::Surprised => Duration::from_millis(800),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::Jump => "jump",
            Gesture::Dance => "dance",
            Gesture::Surprised => "surprised",
        }
    }

    /// Pose for a live frame at clock time `now` of a gesture started at
    /// `start`. Progress stays below 1 here; the completion writes only come
    /// from [`Gesture::finish`].
    pub fn pose(self, base: &BasePose, now: f64, start: f64) -> PoseDelta {
        let p = progress(now, start, self.duration()).min(1.0 - f32::EPSILON);
        match self {
            Gesture::Jump => jump_motion(base, p),
            Gesture::Dance => dance_motion(now),
            Gesture::Surprised => surprised_motion(base, p),
        }
    }

    /// Writes applied once when the gesture expires.
    pub fn finish(self, base: &BasePose) -> PoseDelta {
        match self {
            Gesture::Jump => jump_motion(base, 1.0),
            // the dance leaves its last pose for continuous motion to overwrite
            Gesture::Dance => PoseDelta::new(),
            Gesture::Surprised => surprised_motion(base, 1.0),
        }
    }
}

impl FromStr for Gesture {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jump" => Ok(Gesture::Jump),
            "dance" => Ok(Gesture::Dance),
            "surprised" => Ok(Gesture::Surprised),
            _ => Err(AvatarError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraction of the gesture elapsed, clamped to `[0, 1]`.
pub fn progress(now: f64, start: f64, duration: Duration) -> f32 {
    let duration = duration.as_secs_f64();
    if duration <= 0.0 {
        return 1.0;
    }
    ((now - start) / duration).clamp(0.0, 1.0) as f32
}

/// Quadratic ease-in-out.
pub fn ease_in_out(p: f32) -> f32 {
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

pub fn jump_motion(base: &BasePose, p: f32) -> PoseDelta {
    let Some(hips_y) = base.hips_y else {
        return PoseDelta::new();
    };
    let y = if p >= 1.0 {
        hips_y
    } else {
        hips_y + (ease_in_out(p) * PI).sin() * JUMP_HEIGHT
    };
    PoseDelta::new().channel(HumanBone::Hips, Channel::PositionY, y)
}

/// Driven by absolute clock time, so amplitude stays constant for the whole
/// gesture.
pub fn dance_motion(t: f64) -> PoseDelta {
    PoseDelta::new()
        .channel(HumanBone::Hips, Channel::Yaw, (t * 6.0).sin() as f32 * 0.4)
        .channel(HumanBone::Spine, Channel::Pitch, (t * 5.0).sin() as f32 * 0.15)
        .channel(HumanBone::Neck, Channel::Roll, (t * 8.0).sin() as f32 * 0.2)
}

/// Arms fly up and the head tips back along a half sine. At `p >= 1` the arms
/// and neck are restored to the base pose exactly and the expression cleared.
pub fn surprised_motion(base: &BasePose, p: f32) -> PoseDelta {
    if p >= 1.0 {
        let mut delta = PoseDelta::new();
        if let Some(rotation) = base.left_upper_arm {
            delta = delta.rotation(HumanBone::LeftUpperArm, rotation);
        }
        if let Some(rotation) = base.right_upper_arm {
            delta = delta.rotation(HumanBone::RightUpperArm, rotation);
        }
        if let Some(rotation) = base.neck {
            delta = delta.rotation(HumanBone::Neck, rotation);
        }
        return delta.expression(Expression::Surprised, 0.0);
    }

    let arc = (p * PI).sin();
    let raise = arc * SURPRISE_ARM_RAISE;
    let mut delta = PoseDelta::new();
    if let Some(rotation) = base.left_upper_arm {
        delta = delta.channel(HumanBone::LeftUpperArm, Channel::Pitch, rotation.x - raise);
    }
    if let Some(rotation) = base.right_upper_arm {
        delta = delta.channel(HumanBone::RightUpperArm, Channel::Pitch, rotation.x + raise);
    }
    if let Some(rotation) = base.neck {
        delta = delta.channel(
            HumanBone::Neck,
            Channel::Pitch,
            rotation.x - arc * SURPRISE_HEAD_TILT,
        );
    }
    delta.expression(Expression::Surprised, 1.0)
}

/// An in-flight gesture and the clock time at which it ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveGesture {
    pub gesture: Gesture,
    pub expires_at: f64,
}

impl ActiveGesture {
    /// Start time recovered from the expiry.
    pub fn start(&self) -> f64 {
        self.expires_at - self.gesture.duration().as_secs_f64()
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one gesture. Triggering replaces whatever is in flight,
/// without queueing or blending.
#[derive(Debug, Clone, Default)]
pub struct OneShotSlot {
    current: Option<ActiveGesture>,
}

impl OneShotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `gesture` at `now`, returning the gesture it replaced.
    pub fn trigger(&mut self, gesture: Gesture, now: f64) -> Option<ActiveGesture> {
        let replaced = self.current.take();
        self.current = Some(ActiveGesture {
            gesture,
            expires_at: now + gesture.duration().as_secs_f64(),
        });
        replaced
    }

    /// The gesture in flight at `now`, if it has not expired.
    pub fn active(&self, now: f64) -> Option<ActiveGesture> {
        self.current.filter(|active| !active.is_expired(now))
    }

    /// Clears and returns the slot's gesture if it has expired by `now`.
    pub fn take_expired(&mut self, now: f64) -> Option<ActiveGesture> {
        match self.current {
            Some(active) if active.is_expired(now) => self.current.take(),
            _ => None,
        }
    }

    pub fn clear(&mut self) -> Option<ActiveGesture> {
        self.current.take()
    }

    pub fn peek(&self) -> Option<ActiveGesture> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn base() -> BasePose {
        BasePose {
            hips_y: Some(0.9),
            left_upper_arm: Some(Vec3::new(0.05, 0.0, 0.1)),
            right_upper_arm: Some(Vec3::new(-0.05, 0.0, -0.1)),
            neck: Some(Vec3::new(0.02, 0.01, 0.0)),
        }
    }

    #[test]
    fn easing_hits_endpoints() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn jump_starts_and_lands_on_base() {
        let base = base();
        let start = jump_motion(&base, 0.0);
        assert_eq!(start.channel_value(HumanBone::Hips, Channel::PositionY), Some(0.9));

        let end = jump_motion(&base, 1.0);
        assert_eq!(end.channel_value(HumanBone::Hips, Channel::PositionY), Some(0.9));

        let apex = jump_motion(&base, 0.5)
            .channel_value(HumanBone::Hips, Channel::PositionY)
            .unwrap();
        assert!((apex - (0.9 + JUMP_HEIGHT)).abs() < 1e-5);
    }

    #[test]
    fn jump_without_hips_is_a_no_op() {
        let base = BasePose {
            hips_y: None,
            ..base()
        };
        assert!(jump_motion(&base, 0.3).is_empty());
    }

    #[test]
    fn surprised_restores_base_exactly() {
        let base = base();
        let mid = surprised_motion(&base, 0.5);
        assert_eq!(mid.expression_weight(Expression::Surprised), Some(1.0));
        let left = mid
            .channel_value(HumanBone::LeftUpperArm, Channel::Pitch)
            .unwrap();
        assert!((left - (0.05 - SURPRISE_ARM_RAISE)).abs() < 1e-5);

        let end = surprised_motion(&base, 1.0);
        assert!(end.writes().contains(&crate::pose::PoseWrite::Rotation {
            bone: HumanBone::LeftUpperArm,
            rotation: base.left_upper_arm.unwrap(),
        }));
        assert!(end.writes().contains(&crate::pose::PoseWrite::Rotation {
            bone: HumanBone::RightUpperArm,
            rotation: base.right_upper_arm.unwrap(),
        }));
        assert!(end.writes().contains(&crate::pose::PoseWrite::Rotation {
            bone: HumanBone::Neck,
            rotation: base.neck.unwrap(),
        }));
        assert_eq!(end.expression_weight(Expression::Surprised), Some(0.0));
    }

    #[test]
    fn dance_uses_absolute_time() {
        let base = base();
        let early = Gesture::Dance.pose(&base, 10.0, 9.0);
        let late = Gesture::Dance.pose(&base, 10.0, 8.0);
        assert_eq!(early, late);
        assert!(Gesture::Dance.finish(&base).is_empty());
    }

    #[test]
    fn live_frame_just_before_expiry_never_completes() {
        let base = base();
        let duration = Gesture::Surprised.duration().as_secs_f64();
        let delta = Gesture::Surprised.pose(&base, duration - 1e-9, 0.0);

        assert!(delta
            .writes()
            .iter()
            .all(|write| !matches!(write, crate::pose::PoseWrite::Rotation { .. })));
        assert_eq!(delta.expression_weight(Expression::Surprised), Some(1.0));
    }

    #[test]
    fn progress_is_clamped() {
        let d = Duration::from_millis(900);
        assert_eq!(progress(0.0, 1.0, d), 0.0);
        assert_eq!(progress(5.0, 1.0, d), 1.0);
        assert!((progress(1.45, 1.0, d) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn trigger_replaces_in_flight_gesture() {
        let mut slot = OneShotSlot::new();
        assert!(slot.trigger(Gesture::Dance, 0.0).is_none());

        let replaced = slot.trigger(Gesture::Jump, 1.0).unwrap();
        assert_eq!(replaced.gesture, Gesture::Dance);

        let active = slot.active(1.1).unwrap();
        assert_eq!(active.gesture, Gesture::Jump);
        assert!((active.start() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn expiry_clears_the_slot() {
        let mut slot = OneShotSlot::new();
        slot.trigger(Gesture::Surprised, 2.0);

        assert!(slot.take_expired(2.5).is_none());
        assert!(slot.active(2.9).is_none());
        let expired = slot.take_expired(2.9).unwrap();
        assert_eq!(expired.gesture, Gesture::Surprised);
        assert!(slot.peek().is_none());
    }

    #[test]
    fn parses_action_labels() {
        assert_eq!("Jump".parse::<Gesture>().unwrap(), Gesture::Jump);
        assert!("wave".parse::<Gesture>().is_err());
    }
}
