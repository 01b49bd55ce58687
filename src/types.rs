use std::fmt;

use serde::{Deserialize, Serialize};

pub type Vec3 = [f32; 3];

pub(crate) fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn length_squared(v: Vec3) -> f32 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

pub(crate) fn distance_squared(a: Vec3, b: Vec3) -> f32 {
    length_squared(sub(a, b))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn label(&self) -> &'static str {
        match self {
            Hand::Left => "Left",
            Hand::Right => "Right",
        }
    }
}

/// Which hands a gesture template applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureHand {
    #[default]
    Invalid,
    Left,
    Right,
    Any,
}

impl GestureHand {
    pub fn applies_to(&self, hand: Hand) -> bool {
        match self {
            GestureHand::Any => true,
            GestureHand::Left => hand == Hand::Left,
            GestureHand::Right => hand == Hand::Right,
            GestureHand::Invalid => false,
        }
    }

    /// Sides that get their own key binding.
    pub fn sides(&self) -> &'static [Hand] {
        match self {
            GestureHand::Any => &[Hand::Left, Hand::Right],
            GestureHand::Left => &[Hand::Left],
            GestureHand::Right => &[Hand::Right],
            GestureHand::Invalid => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerState {
    #[default]
    None,
    Ignored,
    Closed,
    Extended,
    Pinched,
}

impl FingerState {
    pub fn label(&self) -> &'static str {
        match self {
            FingerState::None => "none",
            FingerState::Ignored => "ignored",
            FingerState::Closed => "closed",
            FingerState::Extended => "extended",
            FingerState::Pinched => "pinched",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

pub const FINGER_COUNT: usize = 5;

impl Finger {
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn tip_joint(&self) -> HandJoint {
        match self {
            Finger::Thumb => HandJoint::ThumbTip,
            Finger::Index => HandJoint::IndexTip,
            Finger::Middle => HandJoint::MiddleTip,
            Finger::Ring => HandJoint::RingTip,
            Finger::Little => HandJoint::LittleTip,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }
}

/// Hand joints in tracking-runtime order (26 per hand).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

pub const JOINT_COUNT: usize = 26;

impl HandJoint {
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointPose {
    pub position: Vec3,
    #[serde(default = "identity_rotation")]
    pub orientation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: identity_rotation(),
        }
    }
}

/// One frame of raw joint data for a single skeletal action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandSkeleton {
    pub valid: bool,
    pub joints: Vec<JointPose>,
}

impl HandSkeleton {
    /// Builds a full skeleton where only the wrist and the five tips carry
    /// meaningful positions; every other joint sits on the wrist.
    pub fn from_tips(wrist: Vec3, tips: [Vec3; FINGER_COUNT]) -> Self {
        let mut joints = vec![
            JointPose {
                position: wrist,
                ..JointPose::default()
            };
            JOINT_COUNT
        ];
        for finger in Finger::ALL {
            joints[finger.tip_joint().index()].position = tips[finger.index()];
        }
        Self {
            valid: true,
            joints,
        }
    }

    pub fn joint(&self, joint: HandJoint) -> Option<Vec3> {
        self.joints.get(joint.index()).map(|pose| pose.position)
    }
}

/// Generation-checked reference to an entity owned outside this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerHandle {
    pub index: u32,
    pub generation: u32,
}

impl OwnerHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformUserId(pub i32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputDeviceId(pub i32);

/// Opaque identifier handed to the input dispatch layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputKey(pub String);

impl InputKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    Pressed,
    Released,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub action: ButtonAction,
    pub key: InputKey,
    pub user: PlatformUserId,
    pub device: InputDeviceId,
    pub is_repeat: bool,
}

impl ButtonEvent {
    pub fn display_text(&self) -> String {
        let verb = match self.action {
            ButtonAction::Pressed => "pressed",
            ButtonAction::Released => "released",
        };
        format!(
            "{} {verb} (user {}, device {})",
            self.key, self.user.0, self.device.0
        )
    }
}
