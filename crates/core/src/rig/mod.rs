use std::collections::{BTreeMap, HashMap};
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Humanoid bones the animation core reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HumanBone {
    Hips,
    Spine,
    Chest,
    Neck,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
}

impl HumanBone {
    pub const ALL: [HumanBone; 8] = [
        HumanBone::Hips,
        HumanBone::Spine,
        HumanBone::Chest,
        HumanBone::Neck,
        HumanBone::LeftUpperArm,
        HumanBone::RightUpperArm,
        HumanBone::LeftLowerArm,
        HumanBone::RightLowerArm,
    ];

    /// Name of the bone in the humanoid bone table.
    pub fn name(self) -> &'static str {
        match self {
            HumanBone::Hips => "hips",
            HumanBone::Spine => "spine",
            HumanBone::Chest => "chest",
            HumanBone::Neck => "neck",
            HumanBone::LeftUpperArm => "leftUpperArm",
            HumanBone::RightUpperArm => "rightUpperArm",
            HumanBone::LeftLowerArm => "leftLowerArm",
            HumanBone::RightLowerArm => "rightLowerArm",
        }
    }

    fn is_arm(self) -> bool {
        matches!(
            self,
            HumanBone::LeftUpperArm
                | HumanBone::RightUpperArm
                | HumanBone::LeftLowerArm
                | HumanBone::RightLowerArm
        )
    }
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Facial expression presets driven by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Happy,
    Sad,
    Angry,
    Relaxed,
    Surprised,
    Neutral,
    /// Mouth-open viseme used for lip flap while talking.
    Aa,
}

impl Expression {
    pub fn name(self) -> &'static str {
        match self {
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Relaxed => "relaxed",
            Expression::Surprised => "surprised",
            Expression::Neutral => "neutral",
            Expression::Aa => "aa",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Local transform of a single bone. Rotation is stored as XYZ Euler angles
/// in radians: x is pitch, y is yaw and z is roll.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneTransform {
    pub rotation: Vec3,
    pub position: Vec3,
}

impl BoneTransform {
    pub fn new(rotation: Vec3, position: Vec3) -> Self {
        Self { rotation, position }
    }
}

/// A loaded humanoid rig. Implementations are owned by the loading subsystem
/// and handed to the controller once.
pub trait Rig {
    /// Returns the bone transform, or `None` when the rig lacks the bone.
    fn bone(&self, bone: HumanBone) -> Option<&BoneTransform>;

    fn bone_mut(&mut self, bone: HumanBone) -> Option<&mut BoneTransform>;

    fn set_expression(&mut self, expression: Expression, weight: f32);

    /// Current weight of an expression. Unset expressions report `0.0`.
    fn expression(&self, expression: Expression) -> f32;

    /// The rig's own per-frame update pass (constraints, spring bones,
    /// normalized-to-raw pose copy).
    fn update(&mut self, delta: f32);
}

/// In-memory rig used by tests and the headless command line driver.
///
/// Its update pass snaps the arm bones back to their rest rotations, which
/// mirrors a rig whose default pose is a T-pose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRig {
    bones: HashMap<HumanBone, BoneTransform>,
    #[serde(skip)]
    rest: HashMap<HumanBone, BoneTransform>,
    expressions: BTreeMap<Expression, f32>,
    elapsed: f32,
}

impl MemoryRig {
    /// Creates a rig with every [`HumanBone`] at its rest transform and the
    /// hips at a typical standing height.
    pub fn humanoid() -> Self {
        Self::with_bones(HumanBone::ALL.iter().map(|&bone| {
            let position = if bone == HumanBone::Hips {
                Vec3::new(0.0, 0.9, 0.0)
            } else {
                Vec3::ZERO
            };
            (bone, BoneTransform::new(Vec3::ZERO, position))
        }))
    }

    /// Creates a rig containing only the given bones. Useful for partial rigs.
    pub fn with_bones(bones: impl IntoIterator<Item = (HumanBone, BoneTransform)>) -> Self {
        let bones: HashMap<_, _> = bones.into_iter().collect();
        Self {
            rest: bones.clone(),
            bones,
            expressions: BTreeMap::new(),
            elapsed: 0.0,
        }
    }

    /// Removes a bone from the rig, simulating a model that does not map it.
    pub fn without(mut self, bone: HumanBone) -> Self {
        self.bones.remove(&bone);
        self.rest.remove(&bone);
        self
    }

    pub fn expressions(&self) -> &BTreeMap<Expression, f32> {
        &self.expressions
    }

    /// Total time accumulated by [`Rig::update`].
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Rig for MemoryRig {
    fn bone(&self, bone: HumanBone) -> Option<&BoneTransform> {
        self.bones.get(&bone)
    }

    fn bone_mut(&mut self, bone: HumanBone) -> Option<&mut BoneTransform> {
        self.bones.get_mut(&bone)
    }

    fn set_expression(&mut self, expression: Expression, weight: f32) {
        self.expressions.insert(expression, weight);
    }

    fn expression(&self, expression: Expression) -> f32 {
        self.expressions.get(&expression).copied().unwrap_or(0.0)
    }

    fn update(&mut self, delta: f32) {
        self.elapsed += delta.max(0.0);
        for (bone, transform) in self.bones.iter_mut().filter(|(bone, _)| bone.is_arm()) {
            if let Some(rest) = self.rest.get(bone) {
                transform.rotation = rest.rotation;
            }
        }
    }
}
