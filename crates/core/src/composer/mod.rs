//! Per-frame pose arbitration.
//!
//! Priority is strict and never blended: the static arm correction always
//! beats the rig's own pose, a live one-shot gesture always beats continuous
//! motion, and continuous motion fills in otherwise.

use serde::{Deserialize, Serialize};

use crate::{
    config::AnimationConfig,
    gesture::Gesture,
    motion::{continuous_motion, AvatarState},
    pose::{Channel, PoseDelta},
    render::Renderer,
    AvatarController, HumanBone, Result, Rig,
};

/// Forced arms-down correction for rigs whose default pose is a T-pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmCorrection {
    pub upper_arm_roll: f32,
    pub lower_arm_pitch: f32,
}

impl ArmCorrection {
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            upper_arm_roll: config.upper_arm_roll,
            lower_arm_pitch: config.lower_arm_pitch,
        }
    }

    pub fn delta(&self) -> PoseDelta {
        PoseDelta::new()
            .channel(HumanBone::LeftUpperArm, Channel::Roll, self.upper_arm_roll)
            .channel(HumanBone::RightUpperArm, Channel::Roll, -self.upper_arm_roll)
            .channel(HumanBone::LeftLowerArm, Channel::Pitch, self.lower_arm_pitch)
            .channel(HumanBone::RightLowerArm, Channel::Pitch, self.lower_arm_pitch)
    }
}

impl Default for ArmCorrection {
    fn default() -> Self {
        Self::from_config(&AnimationConfig::default())
    }
}

/// Which source drove the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameTier {
    /// No rig loaded yet, nothing was written.
    NoRig,
    Gesture(Gesture),
    Continuous(AvatarState),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameOutcome {
    /// Clock time of the frame in seconds.
    pub time: f64,
    pub tier: FrameTier,
    /// Gesture that expired on this frame and had its completion pose applied.
    pub expired: Option<Gesture>,
    /// Bone writes dropped because the rig lacks the bone.
    pub skipped_writes: usize,
}

/// Runs one composer pass: advance the clock, let the rig update, force the
/// arm correction, then apply either the live gesture or continuous motion.
pub fn compose_frame<R: Rig>(controller: &mut AvatarController<R>, delta: f64) -> FrameOutcome {
    let now = controller.clock.advance(delta);
    let Some(rig) = controller.rig.as_mut() else {
        return FrameOutcome {
            time: now,
            tier: FrameTier::NoRig,
            expired: None,
            skipped_writes: 0,
        };
    };

    rig.update(delta.max(0.0) as f32);

    let base = controller.base_pose.unwrap_or_default();
    let mut skipped = 0;

    // Expired(auto-reset): completion pose runs once, under the correction.
    let expired = controller.one_shot.take_expired(now).map(|finished| finished.gesture);
    if let Some(gesture) = expired {
        tracing::debug!(%gesture, now, "gesture expired");
        skipped += gesture.finish(&base).apply(rig);
    }

    skipped += ArmCorrection::from_config(&controller.config.animation)
        .delta()
        .apply(rig);

    let tier = match controller.one_shot.active(now) {
        Some(active) => {
            skipped += active.gesture.pose(&base, now, active.start()).apply(rig);
            FrameTier::Gesture(active.gesture)
        }
        None => {
            controller.one_shot.clear();
            skipped += continuous_motion(controller.state, now).apply(rig);
            FrameTier::Continuous(controller.state)
        }
    };

    tracing::trace!(now, ?tier, skipped, "frame composed");

    FrameOutcome {
        time: now,
        tier,
        expired,
        skipped_writes: skipped,
    }
}

/// Drives [`compose_frame`] and renders every tick, whatever the outcome.
#[derive(Debug, Default)]
pub struct FrameComposer<T: Renderer> {
    renderer: T,
}

impl<T: Renderer> FrameComposer<T> {
    pub fn new(renderer: T) -> Self {
        Self { renderer }
    }

    pub fn tick<R: Rig>(&mut self, controller: &mut AvatarController<R>, delta: f64) -> Result<FrameOutcome> {
        let outcome = compose_frame(controller, delta);
        self.renderer.render(&outcome)?;
        Ok(outcome)
    }

    pub fn renderer(&self) -> &T {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{render::HeadlessRenderer, Emotion, Expression, MemoryRig};

    const FRAME: f64 = 1.0 / 60.0;

    fn controller() -> AvatarController<MemoryRig> {
        let mut controller = AvatarController::default();
        controller.attach_rig(MemoryRig::humanoid()).unwrap();
        controller
    }

    fn run(controller: &mut AvatarController<MemoryRig>, seconds: f64) -> FrameOutcome {
        let frames = (seconds / FRAME).round() as usize;
        let mut last = compose_frame(controller, 0.0);
        for _ in 0..frames {
            last = compose_frame(controller, FRAME);
        }
        last
    }

    fn assert_arm_correction(rig: &MemoryRig) {
        let bone = |b| rig.bone(b).unwrap().rotation;
        assert_eq!(bone(HumanBone::LeftUpperArm).z, 1.15);
        assert_eq!(bone(HumanBone::RightUpperArm).z, -1.15);
        assert_eq!(bone(HumanBone::LeftLowerArm).x, 0.35);
        assert_eq!(bone(HumanBone::RightLowerArm).x, 0.35);
    }

    #[test]
    fn no_rig_is_a_no_op() {
        let mut controller = AvatarController::<MemoryRig>::default();
        let outcome = compose_frame(&mut controller, FRAME);
        assert_eq!(outcome.tier, FrameTier::NoRig);
        assert!(outcome.time > 0.0);
    }

    #[test]
    fn arm_correction_survives_every_tier() {
        let mut controller = controller();
        for action in ["idle", "jump", "dance", "surprised"] {
            controller.handle_action(action).unwrap();
            for step in 0..90 {
                compose_frame(&mut controller, FRAME);
                assert_arm_correction(controller.rig().unwrap());
                if step == 30 {
                    controller.talking_started();
                }
            }
            controller.talking_ended();
        }
    }

    #[test]
    fn idle_frame_closes_mouth() {
        let mut controller = controller();
        controller.rig_mut().unwrap().set_expression(Expression::Aa, 0.7);
        let outcome = compose_frame(&mut controller, FRAME);

        assert_eq!(outcome.tier, FrameTier::Continuous(AvatarState::Idle));
        assert_eq!(controller.rig().unwrap().expression(Expression::Aa), 0.0);
    }

    #[test]
    fn gesture_preempts_talking() {
        let mut controller = controller();
        controller.talking_started();
        controller.trigger(Gesture::Dance);

        let outcome = compose_frame(&mut controller, FRAME);
        assert_eq!(outcome.tier, FrameTier::Gesture(Gesture::Dance));

        let outcome = run(&mut controller, 3.0);
        assert_eq!(outcome.tier, FrameTier::Continuous(AvatarState::Talking));
    }

    #[test]
    fn jump_lands_after_expiry() {
        let mut controller = controller();
        compose_frame(&mut controller, FRAME);
        controller.trigger(Gesture::Jump);

        let mid = run(&mut controller, 0.45);
        assert_eq!(mid.tier, FrameTier::Gesture(Gesture::Jump));
        let hips = controller.rig().unwrap().bone(HumanBone::Hips).unwrap().position.y;
        assert!(hips > 0.95);

        let outcome = compose_frame(&mut controller, 1.0);
        assert_eq!(outcome.expired, Some(Gesture::Jump));
        assert!(controller.one_shot().is_none());
        let hips = controller.rig().unwrap().bone(HumanBone::Hips).unwrap().position.y;
        assert_eq!(hips, 0.9);
    }

    #[test]
    fn jump_with_one_long_frame_never_lifts() {
        let mut controller = controller();
        controller.trigger(Gesture::Jump);
        let outcome = compose_frame(&mut controller, 1.0);

        assert_eq!(outcome.tier, FrameTier::Continuous(AvatarState::Idle));
        assert!(controller.one_shot().is_none());
        let hips = controller.rig().unwrap().bone(HumanBone::Hips).unwrap().position.y;
        assert_eq!(hips, 0.9);
    }

    #[test]
    fn surprised_resets_neck_and_expression() {
        let mut controller = controller();
        controller.trigger(Gesture::Surprised);
        run(&mut controller, 0.3);
        assert_eq!(controller.rig().unwrap().expression(Expression::Surprised), 1.0);

        let outcome = run(&mut controller, 0.6);
        assert_eq!(outcome.expired, None);
        let rig = controller.rig().unwrap();
        assert_eq!(rig.expression(Expression::Surprised), 0.0);
        // idle only drives neck yaw, so pitch and roll stay at base
        let neck = rig.bone(HumanBone::Neck).unwrap().rotation;
        assert_eq!(neck.x, 0.0);
        assert_eq!(neck.z, 0.0);
        assert_arm_correction(rig);
    }

    #[test]
    fn last_surprised_frame_keeps_arm_correction() {
        let mut controller = controller();
        controller.trigger(Gesture::Surprised);

        let outcome = compose_frame(&mut controller, 0.8 - 1e-9);
        assert_eq!(outcome.tier, FrameTier::Gesture(Gesture::Surprised));
        assert_arm_correction(controller.rig().unwrap());
    }

    #[test]
    fn new_gesture_replaces_old_without_blend() {
        let mut controller = controller();
        controller.trigger(Gesture::Dance);
        run(&mut controller, 0.5);

        controller.trigger(Gesture::Surprised);
        let outcome = compose_frame(&mut controller, FRAME);
        assert_eq!(outcome.tier, FrameTier::Gesture(Gesture::Surprised));
        assert_eq!(outcome.expired, None);

        // dance no longer drives the hips
        let hips_yaw = controller.rig().unwrap().bone(HumanBone::Hips).unwrap().rotation.y;
        compose_frame(&mut controller, FRAME);
        let later = controller.rig().unwrap().bone(HumanBone::Hips).unwrap().rotation.y;
        assert_eq!(hips_yaw, later);
    }

    #[test]
    fn missing_bones_are_counted_not_fatal() {
        let mut controller = AvatarController::default();
        controller
            .attach_rig(MemoryRig::humanoid().without(HumanBone::Chest))
            .unwrap();
        let outcome = compose_frame(&mut controller, FRAME);
        assert_eq!(outcome.skipped_writes, 1);
    }

    #[test]
    fn composer_renders_every_tick() {
        let mut composer = FrameComposer::new(HeadlessRenderer::new());
        let mut controller = AvatarController::<MemoryRig>::default();

        composer.tick(&mut controller, FRAME).unwrap();
        controller.attach_rig(MemoryRig::humanoid()).unwrap();
        controller.set_emotion(Emotion::Happy);
        composer.tick(&mut controller, FRAME).unwrap();

        let renderer = composer.renderer();
        assert_eq!(renderer.frames(), 2);
        assert_eq!(
            renderer.last().map(|frame| frame.tier),
            Some(FrameTier::Continuous(AvatarState::Idle))
        );
    }
}
