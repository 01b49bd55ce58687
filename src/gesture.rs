use crate::{
    filter::{FilterSettings, LowpassFilter},
    settings::GestureSettings,
    types::{
        FINGER_COUNT, Finger, FingerState, HandJoint, HandSkeleton, Vec3, distance_squared,
        length_squared, sub,
    },
};

/// Filter plus latest classification for one finger of one hand.
#[derive(Clone, Debug)]
pub struct FingerChannel {
    filter: LowpassFilter,
    tip: Vec3,
    state: FingerState,
}

impl FingerChannel {
    fn new(filter: &FilterSettings) -> Self {
        Self {
            filter: LowpassFilter::from_settings(filter),
            tip: [0.0; 3],
            state: FingerState::None,
        }
    }

    /// Filtered tip position relative to the wrist.
    pub fn tip(&self) -> Vec3 {
        self.tip
    }

    pub fn state(&self) -> FingerState {
        self.state
    }
}

/// Per skeletal feed finger tracking: five channels updated once per frame.
#[derive(Clone, Debug)]
pub struct SkeletalActionState {
    fingers: [FingerChannel; FINGER_COUNT],
    reset_pending: bool,
}

impl SkeletalActionState {
    pub fn new(filter: &FilterSettings) -> Self {
        Self {
            fingers: std::array::from_fn(|_| FingerChannel::new(filter)),
            reset_pending: false,
        }
    }

    pub fn finger(&self, finger: Finger) -> &FingerChannel {
        &self.fingers[finger.index()]
    }

    pub fn finger_states(&self) -> [FingerState; FINGER_COUNT] {
        std::array::from_fn(|i| self.fingers[i].state)
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Clears filter history on the next update, valid data or not.
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Filters and classifies one frame. Returns false when the skeleton was
    /// missing or unusable and the previous states were kept.
    pub fn update(
        &mut self,
        skeleton: Option<&HandSkeleton>,
        dt: f32,
        settings: &GestureSettings,
    ) -> bool {
        if self.reset_pending {
            for channel in &mut self.fingers {
                channel.filter.reset();
            }
            self.reset_pending = false;
        }

        let Some(raw_tips) = skeleton.and_then(relative_tips) else {
            return false;
        };

        for (channel, raw) in self.fingers.iter_mut().zip(raw_tips) {
            channel.tip = channel.filter.filter(raw, dt);
        }

        let tips = std::array::from_fn(|i| self.fingers[i].tip);
        for (channel, state) in self.fingers.iter_mut().zip(classify_fingers(&tips, settings)) {
            channel.state = state;
        }
        true
    }
}

fn relative_tips(skeleton: &HandSkeleton) -> Option<[Vec3; FINGER_COUNT]> {
    if !skeleton.valid {
        return None;
    }
    let wrist = skeleton.joint(HandJoint::Wrist)?;
    let mut tips = [[0.0; 3]; FINGER_COUNT];
    for finger in Finger::ALL {
        tips[finger.index()] = sub(skeleton.joint(finger.tip_joint())?, wrist);
    }
    Some(tips)
}

/// Classifies wrist-relative tip positions. A pinch against the thumb wins
/// over the wrist-distance bands and marks both fingers.
pub fn classify_fingers(
    tips: &[Vec3; FINGER_COUNT],
    settings: &GestureSettings,
) -> [FingerState; FINGER_COUNT] {
    let thumb = tips[Finger::Thumb.index()];
    let mut pinched = [false; FINGER_COUNT];

    for finger in &Finger::ALL[1..] {
        let Some(threshold) = settings.pinched_threshold(*finger) else {
            continue;
        };
        if distance_squared(tips[finger.index()], thumb) < threshold * threshold {
            pinched[finger.index()] = true;
            pinched[Finger::Thumb.index()] = true;
        }
    }

    Finger::ALL.map(|finger| {
        if pinched[finger.index()] {
            return FingerState::Pinched;
        }
        let reach = length_squared(tips[finger.index()]);
        let extended = settings.extended_threshold(finger);
        let closed = settings.closed_threshold(finger);
        if reach > extended * extended {
            FingerState::Extended
        } else if reach < closed * closed {
            FingerState::Closed
        } else {
            FingerState::None
        }
    })
}
