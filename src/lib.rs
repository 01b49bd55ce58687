//! Turns tracked hand skeletons into edge-triggered virtual button events.
//!
//! Each registered hand source filters its five fingertip positions,
//! classifies every finger as closed, extended or pinched, and matches the
//! result against gesture templates. A template starting or stopping to
//! match becomes one press or release event for a per-gesture, per-side key.

pub mod database;
pub mod device;
pub mod error;
pub mod filter;
pub mod gesture;
pub mod matcher;
pub mod pipeline;
pub mod settings;
pub mod snapshot;
pub mod types;

pub use database::{GestureCatalog, GestureDatabase, GestureKeyBindings, GestureTemplate};
pub use device::{
    HandGestureDevice, HandTracking, OwnerIdentity, OwnerRegistry, SourceDescriptor, SourceId,
};
pub use error::{ConfigError, RegistrationError};
pub use filter::{FilterSettings, LowpassFilter};
pub use matcher::InputSink;
pub use pipeline::start_device_worker;
pub use settings::GestureSettings;
pub use snapshot::{RecordedFrame, Recording, TrackingSnapshot};
pub use types::{
    ButtonAction, ButtonEvent, FingerState, GestureHand, Hand, HandSkeleton, InputDeviceId,
    InputKey, OwnerHandle, PlatformUserId,
};
