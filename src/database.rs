use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::ConfigError,
    types::{FINGER_COUNT, Finger, FingerState, GestureHand, Hand, InputKey},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureTemplate {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub hand: GestureHand,
    /// Thumb, index, middle, ring, little.
    pub fingers: [FingerState; FINGER_COUNT],
}

impl GestureTemplate {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        hand: GestureHand,
        fingers: [FingerState; FINGER_COUNT],
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            hand,
            fingers,
        }
    }

    pub fn requirement(&self, finger: Finger) -> FingerState {
        self.fingers[finger.index()]
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("gesture #{index} has no name")]
    MissingName { index: usize },
    #[error("gesture `{name}` has an empty display name")]
    EmptyDisplayName { name: String },
    #[error("gesture `{name}` is set to an invalid hand")]
    InvalidHand { name: String },
    #[error("gesture `{name}` leaves the {finger} finger uninitialized")]
    UninitializedFinger { name: String, finger: &'static str },
    #[error("gesture `{name}` ignores every finger and would match any pose")]
    AllFingersIgnored { name: String },
    #[error("gesture name `{name}` is used more than once")]
    DuplicateName { name: String },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureDatabase {
    pub name: String,
    #[serde(default)]
    pub gestures: Vec<GestureTemplate>,
}

impl GestureDatabase {
    pub fn new(name: impl Into<String>, gestures: Vec<GestureTemplate>) -> Self {
        Self {
            name: name.into(),
            gestures,
        }
    }

    /// Small set of poses used by the replay binary when no database is given.
    pub fn builtin() -> Self {
        use crate::types::FingerState::{Closed, Extended, Ignored, Pinched};

        Self::new(
            "builtin",
            vec![
                GestureTemplate::new("Fist", "Fist", GestureHand::Any, [Closed; FINGER_COUNT]),
                GestureTemplate::new(
                    "Point",
                    "Point",
                    GestureHand::Any,
                    [Ignored, Extended, Closed, Closed, Closed],
                ),
                GestureTemplate::new(
                    "OpenHand",
                    "Open Hand",
                    GestureHand::Any,
                    [Extended; FINGER_COUNT],
                ),
                GestureTemplate::new(
                    "Pinch",
                    "Pinch",
                    GestureHand::Any,
                    [Pinched, Pinched, Ignored, Ignored, Ignored],
                ),
            ],
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let database = Self::from_json_str(&json)?;
        log::info!(
            "loaded gesture database `{}` ({} gestures) from {}",
            database.name,
            database.gestures.len(),
            path.display()
        );
        Ok(database)
    }

    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, gesture) in self.gestures.iter().enumerate() {
            let name = gesture.name.clone();
            if name.is_empty() {
                issues.push(ValidationIssue::MissingName { index });
            } else if !seen.insert(gesture.name.as_str()) {
                issues.push(ValidationIssue::DuplicateName { name: name.clone() });
            }

            if gesture.display_name.is_empty() {
                issues.push(ValidationIssue::EmptyDisplayName { name: name.clone() });
            }
            if gesture.hand == GestureHand::Invalid {
                issues.push(ValidationIssue::InvalidHand { name: name.clone() });
            }
            for finger in Finger::ALL {
                if gesture.requirement(finger) == FingerState::None {
                    issues.push(ValidationIssue::UninitializedFinger {
                        name: name.clone(),
                        finger: finger.label(),
                    });
                }
            }
            if gesture.fingers.iter().all(|s| *s == FingerState::Ignored) {
                issues.push(ValidationIssue::AllFingersIgnored { name });
            }
        }

        issues
    }
}

/// Every gesture database known to the process, aggregated once.
#[derive(Clone, Debug, Default)]
pub struct GestureCatalog {
    databases: Vec<GestureDatabase>,
}

impl GestureCatalog {
    pub fn new(databases: Vec<GestureDatabase>) -> Self {
        for database in &databases {
            for issue in database.validate() {
                log::warn!("gesture database `{}`: {issue}", database.name);
            }
        }
        Self { databases }
    }

    pub fn databases(&self) -> &[GestureDatabase] {
        &self.databases
    }

    pub fn database_index(&self, name: &str) -> Option<usize> {
        self.databases.iter().position(|db| db.name == name)
    }

    pub fn database(&self, index: usize) -> Option<&GestureDatabase> {
        self.databases.get(index)
    }

    pub fn templates(&self) -> impl Iterator<Item = &GestureTemplate> {
        self.databases.iter().flat_map(|db| db.gestures.iter())
    }
}

pub fn binding_key_name(gesture: &str, hand: Hand) -> String {
    format!("HandGesture_{gesture}_{}", hand.label())
}

/// (gesture name, side) to input key, at most one entry per pair.
#[derive(Clone, Debug, Default)]
pub struct GestureKeyBindings {
    keys: HashMap<(String, Hand), InputKey>,
}

impl GestureKeyBindings {
    pub fn build(catalog: &GestureCatalog) -> Self {
        let mut keys = HashMap::new();
        for template in catalog.templates() {
            for &hand in template.hand.sides() {
                keys.entry((template.name.clone(), hand))
                    .or_insert_with(|| InputKey(binding_key_name(&template.name, hand)));
            }
        }
        Self { keys }
    }

    pub fn key(&self, gesture: &str, hand: Hand) -> Option<&InputKey> {
        self.keys.get(&(gesture.to_string(), hand))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Hand, &InputKey)> {
        self.keys
            .iter()
            .map(|((name, hand), key)| (name.as_str(), *hand, key))
    }
}
