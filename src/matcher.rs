use std::collections::HashMap;

use crossbeam_channel::Sender;

use crate::{
    database::{GestureKeyBindings, GestureTemplate},
    types::{
        ButtonAction, ButtonEvent, FINGER_COUNT, FingerState, Hand, InputDeviceId, PlatformUserId,
    },
};

/// Receiver of press / release edges, usually the input dispatch layer.
pub trait InputSink {
    fn send(&mut self, event: ButtonEvent);
}

impl InputSink for Vec<ButtonEvent> {
    fn send(&mut self, event: ButtonEvent) {
        self.push(event);
    }
}

/// Blocks while a bounded channel is full, so a press is never delivered
/// without its release. Only a disconnected receiver drops events.
impl InputSink for Sender<ButtonEvent> {
    fn send(&mut self, event: ButtonEvent) {
        if let Err(err) = Sender::send(self, event) {
            log::warn!("dropping gesture button event: {err}");
        }
    }
}

pub fn matches_template(template: &GestureTemplate, states: &[FingerState; FINGER_COUNT]) -> bool {
    template
        .fingers
        .iter()
        .zip(states)
        .all(|(required, live)| *required == FingerState::Ignored || required == live)
}

/// Current "held" flag per gesture name for one hand source.
#[derive(Clone, Debug, Default)]
pub struct GestureButtons {
    states: HashMap<String, bool>,
}

impl GestureButtons {
    pub fn new<'a>(templates: impl IntoIterator<Item = &'a GestureTemplate>) -> Self {
        Self {
            states: templates
                .into_iter()
                .map(|t| (t.name.clone(), false))
                .collect(),
        }
    }

    /// Panics for a name the buttons were not built from: that means the
    /// source and the matcher disagree on the template set.
    pub fn is_pressed(&self, gesture: &str) -> bool {
        match self.states.get(gesture) {
            Some(pressed) => *pressed,
            None => panic!("no button state for gesture `{gesture}`"),
        }
    }

    fn set(&mut self, gesture: &str, pressed: bool) {
        match self.states.get_mut(gesture) {
            Some(state) => *state = pressed,
            None => panic!("no button state for gesture `{gesture}`"),
        }
    }

    pub fn pressed(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, pressed)| **pressed)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Identity stamped on every event from one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonOrigin {
    pub hand: Hand,
    pub user: PlatformUserId,
    pub device: InputDeviceId,
}

/// Matches the live finger states of every skeletal action of one source
/// against each template for its hand and sends an event for each held flag
/// that flipped. A template is held while any action matches it, so a
/// source gets at most one edge per gesture per frame. Returns the event
/// count.
pub fn emit_gesture_edges(
    templates: &[GestureTemplate],
    actions: &[[FingerState; FINGER_COUNT]],
    origin: ButtonOrigin,
    buttons: &mut GestureButtons,
    bindings: &GestureKeyBindings,
    sink: &mut dyn InputSink,
) -> usize {
    let mut sent = 0;

    for template in templates.iter().filter(|t| t.hand.applies_to(origin.hand)) {
        let matched = actions.iter().any(|states| matches_template(template, states));
        if matched == buttons.is_pressed(&template.name) {
            continue;
        }

        let Some(key) = bindings.key(&template.name, origin.hand) else {
            log::error!(
                "gesture `{}` has no {} hand binding",
                template.name,
                origin.hand.label()
            );
            continue;
        };

        buttons.set(&template.name, matched);
        let action = if matched {
            ButtonAction::Pressed
        } else {
            ButtonAction::Released
        };
        log::debug!("{key} {action:?} for user {:?}", origin.user);
        sink.send(ButtonEvent {
            action,
            key: key.clone(),
            user: origin.user,
            device: origin.device,
            is_repeat: false,
        });
        sent += 1;
    }

    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::{GestureCatalog, GestureDatabase},
        types::FingerState::{Closed, Extended, Ignored, Pinched},
        types::{GestureHand, InputKey},
    };

    fn fixture() -> (GestureDatabase, GestureKeyBindings) {
        let db = GestureDatabase::new(
            "test",
            vec![
                GestureTemplate::new("Fist", "Fist", GestureHand::Any, [Closed; 5]),
                GestureTemplate::new(
                    "Point",
                    "Point",
                    GestureHand::Any,
                    [Ignored, Extended, Closed, Closed, Closed],
                ),
                GestureTemplate::new(
                    "IndexDown",
                    "Index Down",
                    GestureHand::Any,
                    [Ignored, Closed, Ignored, Ignored, Ignored],
                ),
                GestureTemplate::new("RightOpen", "Right Open", GestureHand::Right, [Extended; 5]),
            ],
        );
        let bindings = GestureKeyBindings::build(&GestureCatalog::new(vec![db.clone()]));
        (db, bindings)
    }

    fn left_origin() -> ButtonOrigin {
        ButtonOrigin {
            hand: Hand::Left,
            user: PlatformUserId(3),
            device: InputDeviceId(7),
        }
    }

    fn run(
        db: &GestureDatabase,
        bindings: &GestureKeyBindings,
        buttons: &mut GestureButtons,
        states: [FingerState; 5],
        origin: ButtonOrigin,
    ) -> Vec<ButtonEvent> {
        let mut events: Vec<ButtonEvent> = Vec::new();
        emit_gesture_edges(&db.gestures, &[states], origin, buttons, bindings, &mut events);
        events
    }

    #[test]
    fn test_ignored_fingers_match_anything() {
        let (db, _) = fixture();
        let point = &db.gestures[1];
        assert!(matches_template(point, &[Pinched, Extended, Closed, Closed, Closed]));
        assert!(matches_template(point, &[FingerState::None, Extended, Closed, Closed, Closed]));
        assert!(!matches_template(point, &[Closed, Closed, Closed, Closed, Closed]));
    }

    #[test]
    fn test_press_fires_once_while_held() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        let fist = [Closed; 5];

        let first = run(&db, &bindings, &mut buttons, fist, left_origin());
        let second = run(&db, &bindings, &mut buttons, fist, left_origin());
        let third = run(&db, &bindings, &mut buttons, fist, left_origin());

        let fist_presses: Vec<_> = first
            .iter()
            .filter(|e| e.key.as_str() == "HandGesture_Fist_Left")
            .collect();
        assert_eq!(fist_presses.len(), 1);
        assert_eq!(fist_presses[0].action, ButtonAction::Pressed);
        assert_eq!(fist_presses[0].user, PlatformUserId(3));
        assert_eq!(fist_presses[0].device, InputDeviceId(7));
        assert!(!fist_presses[0].is_repeat);
        assert!(second.is_empty(), "{second:?}");
        assert!(third.is_empty(), "{third:?}");
        assert!(buttons.is_pressed("Fist"));
    }

    #[test]
    fn test_release_fires_once_on_mismatch() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        run(&db, &bindings, &mut buttons, [Closed; 5], left_origin());

        let open = [Extended; 5];
        let released = run(&db, &bindings, &mut buttons, open, left_origin());
        let later = run(&db, &bindings, &mut buttons, open, left_origin());

        assert_eq!(
            released
                .iter()
                .map(|e| (e.key.as_str(), e.action))
                .collect::<Vec<_>>(),
            vec![
                ("HandGesture_Fist_Left", ButtonAction::Released),
                ("HandGesture_IndexDown_Left", ButtonAction::Released),
            ]
        );
        assert!(later.is_empty(), "{later:?}");
    }

    #[test]
    fn test_overlapping_templates_press_independently() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        let events = run(&db, &bindings, &mut buttons, [Closed; 5], left_origin());
        let keys: Vec<_> = events.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["HandGesture_Fist_Left", "HandGesture_IndexDown_Left"]);
        assert_eq!(buttons.pressed().count(), 2);
    }

    #[test]
    fn test_side_filter_and_binding() {
        let (db, bindings) = fixture();
        let mut left_buttons = GestureButtons::new(&db.gestures);
        let mut right_buttons = GestureButtons::new(&db.gestures);
        let right = ButtonOrigin {
            hand: Hand::Right,
            ..left_origin()
        };

        let left_events = run(&db, &bindings, &mut left_buttons, [Extended; 5], left_origin());
        let right_events = run(&db, &bindings, &mut right_buttons, [Extended; 5], right);

        assert!(left_events.is_empty(), "{left_events:?}");
        assert_eq!(right_events.len(), 1);
        assert_eq!(right_events[0].key.as_str(), "HandGesture_RightOpen_Right");
    }

    #[test]
    fn test_any_matching_action_holds_the_button() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        let disagreeing = [[Closed; 5], [Extended; 5]];

        let mut events: Vec<ButtonEvent> = Vec::new();
        for _ in 0..3 {
            emit_gesture_edges(
                &db.gestures,
                &disagreeing,
                left_origin(),
                &mut buttons,
                &bindings,
                &mut events,
            );
        }

        let fist: Vec<_> = events
            .iter()
            .filter(|e| e.key.as_str() == "HandGesture_Fist_Left")
            .map(|e| e.action)
            .collect();
        assert_eq!(fist, vec![ButtonAction::Pressed]);
        assert!(buttons.is_pressed("Fist"));

        emit_gesture_edges(
            &db.gestures,
            &[[Extended; 5], [Extended; 5]],
            left_origin(),
            &mut buttons,
            &bindings,
            &mut events,
        );
        assert!(!buttons.is_pressed("Fist"));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.key.as_str() == "HandGesture_Fist_Left")
                .count(),
            2
        );
    }

    #[test]
    #[should_panic(expected = "no button state for gesture `Wave`")]
    fn test_unknown_gesture_is_a_contract_violation() {
        let (db, _) = fixture();
        let buttons = GestureButtons::new(&db.gestures);
        buttons.is_pressed("Wave");
    }

    #[test]
    fn test_channel_sink_forwards_events() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        let (mut tx, rx) = crossbeam_channel::unbounded();
        emit_gesture_edges(
            &db.gestures,
            &[[Closed; 5]],
            left_origin(),
            &mut buttons,
            &bindings,
            &mut tx,
        );
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_bounded_channel_sink_keeps_every_edge() {
        let (db, bindings) = fixture();
        let mut buttons = GestureButtons::new(&db.gestures);
        let (mut tx, rx) = crossbeam_channel::bounded(1);
        let consumer = std::thread::spawn(move || rx.iter().collect::<Vec<ButtonEvent>>());

        for states in [[Closed; 5], [Extended; 5], [Closed; 5]] {
            emit_gesture_edges(
                &db.gestures,
                &[states],
                left_origin(),
                &mut buttons,
                &bindings,
                &mut tx,
            );
        }
        drop(tx);

        let events = consumer.join().unwrap();
        assert_eq!(events.len(), 6, "{events:?}");
        let released = events
            .iter()
            .filter(|e| e.action == ButtonAction::Released)
            .count();
        assert_eq!(released, 2);
    }

    #[test]
    fn test_disconnected_channel_sink_does_not_panic() {
        let (mut tx, rx) = crossbeam_channel::bounded::<ButtonEvent>(1);
        drop(rx);
        InputSink::send(
            &mut tx,
            ButtonEvent {
                action: ButtonAction::Pressed,
                key: InputKey("HandGesture_Fist_Left".into()),
                user: PlatformUserId(0),
                device: InputDeviceId(0),
                is_repeat: false,
            },
        );
    }
}
