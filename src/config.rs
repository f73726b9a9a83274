//! Execution profiles.
//!
//! A profile bundles the knobs a caller hands to the engine: the
//! capability grant set, the dry-run flag, the iteration ceiling and
//! whether a trace is collected. A small registry ships the built-in
//! profiles and accepts custom registrations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::eval::executor::DEFAULT_MAX_ITERATIONS;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown profile: '{0}'")]
    Unknown(String),
    #[error("profile '{0}' is already registered")]
    Duplicate(String),
    #[error("invalid profile '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub description: String,
    pub dry_run: bool,
    pub tracing: bool,
    pub capabilities: Vec<String>,
    pub max_iterations: usize,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            description: "live execution with every capability".to_string(),
            dry_run: false,
            tracing: false,
            capabilities: vec!["*".to_string()],
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Profile {
    pub fn validate(&self, name: &str) -> Result<(), ProfileError> {
        if self.max_iterations == 0 {
            return Err(ProfileError::Invalid {
                name: name.to_string(),
                reason: "max_iterations must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Named profiles. Seeded with the built-ins; `register` extends the set
/// and rejects duplicates.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Profile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegistry {
    pub fn new() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "analysis".to_string(),
            Profile {
                description: "dry-run with tracing and no capabilities".to_string(),
                dry_run: true,
                tracing: true,
                capabilities: vec![],
                max_iterations: DEFAULT_MAX_ITERATIONS,
            },
        );
        profiles.insert(
            "execution".to_string(),
            Profile {
                description: "live execution with every capability".to_string(),
                dry_run: false,
                tracing: false,
                capabilities: vec!["*".to_string()],
                max_iterations: DEFAULT_MAX_ITERATIONS,
            },
        );
        profiles.insert(
            "audit".to_string(),
            Profile {
                description: "dry-run with tracing and every capability".to_string(),
                dry_run: true,
                tracing: true,
                capabilities: vec!["*".to_string()],
                max_iterations: DEFAULT_MAX_ITERATIONS,
            },
        );
        profiles.insert(
            "debug".to_string(),
            Profile {
                description: "live execution with tracing and a tight iteration ceiling"
                    .to_string(),
                dry_run: false,
                tracing: true,
                capabilities: vec!["*".to_string()],
                max_iterations: 1_000,
            },
        );
        profiles.insert(
            "test".to_string(),
            Profile {
                description: "live traced execution for test suites".to_string(),
                dry_run: false,
                tracing: true,
                capabilities: vec!["*".to_string()],
                max_iterations: 100,
            },
        );
        Self { profiles }
    }

    pub fn get(&self, name: &str) -> Result<Profile, ProfileError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    pub fn describe(&self, name: &str) -> Result<String, ProfileError> {
        self.get(name).map(|profile| profile.description)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register(&mut self, name: impl Into<String>, profile: Profile) -> Result<(), ProfileError> {
        let name = name.into();
        if self.profiles.contains_key(&name) {
            return Err(ProfileError::Duplicate(name));
        }
        profile.validate(&name)?;
        self.profiles.insert(name, profile);
        Ok(())
    }
}
