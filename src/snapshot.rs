//! Recorded tracking state: a plain-data stand-in for the owner registry and
//! the hand tracking runtime, used for replays and tests.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    device::{HandTracking, OwnerIdentity, OwnerRegistry},
    error::ConfigError,
    types::{FINGER_COUNT, Hand, HandSkeleton, InputDeviceId, OwnerHandle, PlatformUserId, Vec3},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub handle: OwnerHandle,
    pub user: PlatformUserId,
    pub device: InputDeviceId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandRecord {
    pub owner: OwnerHandle,
    pub hand: Hand,
    #[serde(default)]
    pub action: usize,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub skeleton: HandSkeleton,
}

fn default_visible() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub tracking_active: bool,
    #[serde(default)]
    pub owners: Vec<OwnerRecord>,
    #[serde(default)]
    pub hands: Vec<HandRecord>,
}

impl TrackingSnapshot {
    fn owner(&self, handle: OwnerHandle) -> Option<&OwnerRecord> {
        self.owners.iter().find(|o| o.handle == handle)
    }

    fn hand(&self, owner: OwnerHandle, hand: Hand, action: usize) -> Option<&HandRecord> {
        self.hands
            .iter()
            .find(|h| h.owner == owner && h.hand == hand && h.action == action)
    }
}

impl OwnerRegistry for TrackingSnapshot {
    fn is_alive(&self, owner: OwnerHandle) -> bool {
        self.owner(owner).is_some()
    }

    fn identity(&self, owner: OwnerHandle) -> Option<OwnerIdentity> {
        self.owner(owner).map(|o| OwnerIdentity {
            user: o.user,
            device: o.device,
        })
    }
}

impl HandTracking for TrackingSnapshot {
    fn is_tracking_active(&self) -> bool {
        self.tracking_active
    }

    fn skeleton(&self, owner: OwnerHandle, hand: Hand, action: usize) -> Option<&HandSkeleton> {
        self.hand(owner, hand, action).map(|h| &h.skeleton)
    }

    fn is_hand_visible(&self, owner: OwnerHandle, hand: Hand) -> bool {
        self.hands
            .iter()
            .any(|h| h.owner == owner && h.hand == hand && h.visible)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub dt: f32,
    pub snapshot: TrackingSnapshot,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let recording = Self::from_json_str(&json)?;
        log::info!(
            "loaded {} recorded frames from {}",
            recording.frames.len(),
            path.display()
        );
        Ok(recording)
    }

    /// Every distinct owner that appears anywhere in the recording.
    pub fn owners(&self) -> Vec<OwnerRecord> {
        let mut owners: Vec<OwnerRecord> = Vec::new();
        for record in self.frames.iter().flat_map(|f| f.snapshot.owners.iter()) {
            if !owners.iter().any(|o| o.handle == record.handle) {
                owners.push(record.clone());
            }
        }
        owners
    }

    /// Every (owner, hand) pair that appears anywhere in the recording.
    pub fn hands(&self) -> Vec<(OwnerHandle, Hand)> {
        let mut hands = Vec::new();
        for record in self.frames.iter().flat_map(|f| f.snapshot.hands.iter()) {
            let key = (record.owner, record.hand);
            if !hands.contains(&key) {
                hands.push(key);
            }
        }
        hands
    }

    /// A scripted one-player session at 90 Hz: the left hand closes into a
    /// fist, opens, then points, while the right hand pinches once.
    pub fn demo() -> Self {
        const DT: f32 = 1.0 / 90.0;
        const OPEN: f32 = 18.0;
        const CLOSED: f32 = 8.0;

        let player = OwnerRecord {
            handle: OwnerHandle::new(0, 0),
            user: PlatformUserId(0),
            device: InputDeviceId(0),
        };

        let pose = |reach: [f32; FINGER_COUNT]| -> [Vec3; FINGER_COUNT] {
            [
                [reach[0], 0.0, 0.0],
                [0.0, reach[1], 0.0],
                [0.0, 0.0, reach[2]],
                [0.0, -reach[3], 0.0],
                [0.0, 0.0, -reach[4]],
            ]
        };
        let mut pinch = pose([OPEN; FINGER_COUNT]);
        pinch[0] = [0.3, OPEN, 0.0];

        let script: [(usize, [Vec3; FINGER_COUNT], [Vec3; FINGER_COUNT]); 4] = [
            (60, pose([OPEN; FINGER_COUNT]), pose([OPEN; FINGER_COUNT])),
            (60, pose([CLOSED; FINGER_COUNT]), pinch),
            (60, pose([OPEN; FINGER_COUNT]), pose([OPEN; FINGER_COUNT])),
            (60, pose([CLOSED, OPEN, CLOSED, CLOSED, CLOSED]), pose([OPEN; FINGER_COUNT])),
        ];

        let wrist = [0.0, 120.0, 20.0];
        let place = |tips: [Vec3; FINGER_COUNT]| {
            HandSkeleton::from_tips(
                wrist,
                tips.map(|t| [t[0] + wrist[0], t[1] + wrist[1], t[2] + wrist[2]]),
            )
        };

        let frames = script
            .iter()
            .flat_map(|(count, left, right)| {
                let snapshot = TrackingSnapshot {
                    tracking_active: true,
                    owners: vec![player.clone()],
                    hands: vec![
                        HandRecord {
                            owner: player.handle,
                            hand: Hand::Left,
                            action: 0,
                            visible: true,
                            skeleton: place(*left),
                        },
                        HandRecord {
                            owner: player.handle,
                            hand: Hand::Right,
                            action: 0,
                            visible: true,
                            skeleton: place(*right),
                        },
                    ],
                };
                std::iter::repeat_n(
                    RecordedFrame {
                        dt: DT,
                        snapshot,
                    },
                    *count,
                )
            })
            .collect();

        Self { frames }
    }
}
