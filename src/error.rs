use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Hand, OwnerHandle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("owner {0} is not alive")]
    OwnerNotAlive(OwnerHandle),
    #[error("could not resolve platform user / input device for owner {0}")]
    UnresolvedIdentity(OwnerHandle),
    #[error("owner {owner} already has a {} hand source registered", .hand.label())]
    AlreadyRegistered { owner: OwnerHandle, hand: Hand },
    #[error("unknown gesture database `{0}`")]
    UnknownDatabase(String),
    #[error("a hand source needs at least one skeletal action")]
    NoSkeletalActions,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {kind} threshold for {finger}: {value}")]
    InvalidThreshold {
        kind: &'static str,
        finger: &'static str,
        value: f32,
    },
    #[error("closed threshold for {finger} ({closed}) exceeds its extended threshold ({extended})")]
    InvertedThresholds {
        finger: &'static str,
        closed: f32,
        extended: f32,
    },
    #[error("invalid filter parameter `{name}`: {value}")]
    InvalidFilter { name: &'static str, value: f32 },
    #[error("invalid tracking poll interval: {0}")]
    InvalidPollInterval(f32),
}
