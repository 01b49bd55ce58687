//! Registry of tracked hand sources and the per-frame driver.
//!
//! A frame is two passes: [`HandGestureDevice::tick`] prunes dead sources,
//! polls the tracking system and refreshes every source's finger states;
//! [`HandGestureDevice::send_controller_events`] then matches those states
//! against the gesture templates and emits press / release edges.

use std::fmt;

use crate::{
    database::{GestureCatalog, GestureKeyBindings},
    error::RegistrationError,
    gesture::SkeletalActionState,
    matcher::{ButtonOrigin, GestureButtons, InputSink, emit_gesture_edges},
    settings::GestureSettings,
    types::{Hand, HandSkeleton, InputDeviceId, OwnerHandle, PlatformUserId},
};

/// Who a live owner belongs to, as far as input dispatch is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerIdentity {
    pub user: PlatformUserId,
    pub device: InputDeviceId,
}

/// Existence checks against the entities that own hand sources.
pub trait OwnerRegistry {
    fn is_alive(&self, owner: OwnerHandle) -> bool;
    fn identity(&self, owner: OwnerHandle) -> Option<OwnerIdentity>;
}

/// The skeletal hand tracking runtime.
pub trait HandTracking {
    fn is_tracking_active(&self) -> bool;
    fn skeleton(&self, owner: OwnerHandle, hand: Hand, action: usize) -> Option<&HandSkeleton>;
    /// Whether the hand is inside the sensing volume this frame.
    fn is_hand_visible(&self, owner: OwnerHandle, hand: Hand) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct SourceDescriptor {
    pub owner: OwnerHandle,
    pub hand: Hand,
    /// Name of the gesture database in the catalog; `None` tracks fingers only.
    pub database: Option<String>,
    pub skeletal_actions: usize,
}

impl SourceDescriptor {
    pub fn new(owner: OwnerHandle, hand: Hand, database: impl Into<String>) -> Self {
        Self {
            owner,
            hand,
            database: Some(database.into()),
            skeletal_actions: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackedHandSource {
    id: SourceId,
    owner: OwnerHandle,
    hand: Hand,
    identity: OwnerIdentity,
    database: Option<usize>,
    actions: Vec<SkeletalActionState>,
    buttons: GestureButtons,
    detect_gestures: bool,
}

impl TrackedHandSource {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn owner(&self) -> OwnerHandle {
        self.owner
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn identity(&self) -> OwnerIdentity {
        self.identity
    }

    pub fn actions(&self) -> &[SkeletalActionState] {
        &self.actions
    }

    pub fn buttons(&self) -> &GestureButtons {
        &self.buttons
    }

    pub fn detect_gestures(&self) -> bool {
        self.detect_gestures
    }

    fn origin(&self) -> ButtonOrigin {
        ButtonOrigin {
            hand: self.hand,
            user: self.identity.user,
            device: self.identity.device,
        }
    }
}

pub struct HandGestureDevice {
    settings: GestureSettings,
    catalog: GestureCatalog,
    bindings: GestureKeyBindings,
    sources: Vec<TrackedHandSource>,
    next_id: u64,
    tracking_active: bool,
    since_tracking_poll: f32,
}

impl HandGestureDevice {
    /// Builds the key bindings for every template in `catalog`; they are not
    /// rebuilt for the lifetime of the device.
    pub fn new(catalog: GestureCatalog, settings: GestureSettings) -> Self {
        let bindings = GestureKeyBindings::build(&catalog);
        log::info!(
            "hand gesture device created: {} databases, {} key bindings",
            catalog.databases().len(),
            bindings.len()
        );

        Self {
            since_tracking_poll: settings.tracking_poll_interval_secs,
            settings,
            catalog,
            bindings,
            sources: Vec::new(),
            next_id: 0,
            tracking_active: false,
        }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    pub fn key_bindings(&self) -> &GestureKeyBindings {
        &self.bindings
    }

    pub fn is_tracking_active(&self) -> bool {
        self.tracking_active
    }

    pub fn sources(&self) -> &[TrackedHandSource] {
        &self.sources
    }

    pub fn source(&self, id: SourceId) -> Option<&TrackedHandSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn register<R: OwnerRegistry + ?Sized>(
        &mut self,
        descriptor: SourceDescriptor,
        owners: &R,
    ) -> Result<SourceId, RegistrationError> {
        let result = self.try_register(descriptor, owners);
        if let Err(err) = &result {
            log::warn!("rejected hand source: {err}");
        }
        result
    }

    fn try_register<R: OwnerRegistry + ?Sized>(
        &mut self,
        descriptor: SourceDescriptor,
        owners: &R,
    ) -> Result<SourceId, RegistrationError> {
        let SourceDescriptor {
            owner,
            hand,
            database,
            skeletal_actions,
        } = descriptor;

        if !owners.is_alive(owner) {
            return Err(RegistrationError::OwnerNotAlive(owner));
        }
        let identity = owners
            .identity(owner)
            .ok_or(RegistrationError::UnresolvedIdentity(owner))?;
        if skeletal_actions == 0 {
            return Err(RegistrationError::NoSkeletalActions);
        }
        if self.sources.iter().any(|s| s.owner == owner && s.hand == hand) {
            return Err(RegistrationError::AlreadyRegistered { owner, hand });
        }
        let database = database
            .map(|name| {
                self.catalog
                    .database_index(&name)
                    .ok_or(RegistrationError::UnknownDatabase(name))
            })
            .transpose()?;

        let buttons = match database.and_then(|i| self.catalog.database(i)) {
            Some(db) => GestureButtons::new(&db.gestures),
            None => GestureButtons::default(),
        };
        let actions = (0..skeletal_actions)
            .map(|_| SkeletalActionState::new(&self.settings.filter))
            .collect();

        let id = SourceId(self.next_id);
        self.next_id += 1;
        log::info!(
            "registered {} hand source {id} for owner {owner} ({} gestures)",
            hand.label(),
            buttons.len()
        );
        self.sources.push(TrackedHandSource {
            id,
            owner,
            hand,
            identity,
            database,
            actions,
            buttons,
            detect_gestures: true,
        });
        Ok(id)
    }

    pub fn unregister(&mut self, id: SourceId) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        let removed = self.sources.len() != before;
        if removed {
            log::info!("unregistered hand source {id}");
        }
        removed
    }

    /// Pauses or resumes matching for one source; its buttons stay as they are.
    pub fn set_detect_gestures(&mut self, id: SourceId, detect: bool) -> bool {
        match self.sources.iter_mut().find(|s| s.id == id) {
            Some(source) => {
                source.detect_gestures = detect;
                true
            }
            None => false,
        }
    }

    /// State pass: prune, poll tracking, filter and classify every source.
    pub fn tick<E: OwnerRegistry + HandTracking + ?Sized>(&mut self, dt: f32, env: &E) {
        self.prune_sources(env);
        self.poll_tracking(dt, env);

        if !self.tracking_active {
            return;
        }

        for source in &mut self.sources {
            for (index, action) in source.actions.iter_mut().enumerate() {
                let skeleton = env.skeleton(source.owner, source.hand, index);
                if !action.update(skeleton, dt, &self.settings) {
                    log::trace!(
                        "skipping action {index} of source {}: no usable skeleton",
                        source.id
                    );
                }
            }
        }
    }

    /// Event pass: match refreshed finger states and send button edges.
    /// Returns the number of events sent.
    pub fn send_controller_events<E, S>(&mut self, env: &E, sink: &mut S) -> usize
    where
        E: HandTracking + ?Sized,
        S: InputSink,
    {
        if !self.tracking_active {
            return 0;
        }

        let mut sent = 0;
        for source in &mut self.sources {
            if !source.detect_gestures {
                continue;
            }
            let Some(db) = source.database.and_then(|i| self.catalog.database(i)) else {
                continue;
            };
            if !env.is_hand_visible(source.owner, source.hand) {
                continue;
            }

            let origin = source.origin();
            let states: Vec<_> = source.actions.iter().map(|a| a.finger_states()).collect();
            sent += emit_gesture_edges(
                &db.gestures,
                &states,
                origin,
                &mut source.buttons,
                &self.bindings,
                &mut *sink,
            );
        }
        sent
    }

    /// Runs both passes for one frame.
    pub fn frame<E, S>(&mut self, dt: f32, env: &E, sink: &mut S) -> usize
    where
        E: OwnerRegistry + HandTracking + ?Sized,
        S: InputSink,
    {
        self.tick(dt, env);
        self.send_controller_events(env, sink)
    }

    fn prune_sources<R: OwnerRegistry + ?Sized>(&mut self, owners: &R) {
        self.sources.retain(|source| {
            let alive = owners.is_alive(source.owner);
            if !alive {
                log::info!(
                    "pruning hand source {} ({} hand of owner {})",
                    source.id,
                    source.hand.label(),
                    source.owner
                );
            }
            alive
        });
    }

    fn poll_tracking<T: HandTracking + ?Sized>(&mut self, dt: f32, tracking: &T) {
        // Negative dt from a bad recording must not rewind the timer.
        self.since_tracking_poll += dt.max(0.0);
        if self.since_tracking_poll < self.settings.tracking_poll_interval_secs {
            return;
        }
        self.since_tracking_poll = 0.0;

        let active = tracking.is_tracking_active();
        match (self.tracking_active, active) {
            (false, true) => {
                log::info!("hand tracking resumed, resetting finger filters");
                for action in self.sources.iter_mut().flat_map(|s| s.actions.iter_mut()) {
                    action.request_reset();
                }
            }
            (true, false) => log::info!("hand tracking lost"),
            _ => {}
        }
        self.tracking_active = active;
    }
}
