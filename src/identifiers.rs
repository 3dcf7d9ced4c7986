// Copyright 2025 Cowboy AI, LLC.

//! Identifier types for plans, tasks and their external references
//!
//! Plans and tasks own their identity ([`PlanId`], [`TaskId`]). Subjects,
//! organizations, scales and produced assessments live in other systems, so
//! only their keys are carried here.

use crate::entity::{EntityId, PlanMarker, TaskMarker};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assessment plan identity
pub type PlanId = EntityId<PlanMarker>;

/// Assessment task identity
pub type TaskId = EntityId<TaskMarker>;

/// Subject (testee) id from the subject registry
///
/// `0` is the registry's "unset" value and never names a real subject.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Wrap a registry id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw registry id
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the unset id
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Id of an assessment record produced when a task is completed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct AssessmentId(u64);

impl AssessmentId {
    /// Wrap an assessment record id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw record id
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the unset id
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AssessmentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Owning organization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct OrgId(i64);

impl OrgId {
    /// Wrap an organization id
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw organization id
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Organization ids are positive
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrgId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Code of the scale or questionnaire a plan measures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScaleCode(String);

impl ScaleCode {
    /// Wrap a catalog code
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the code is blank
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ScaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScaleCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ids() {
        assert!(SubjectId::new(0).is_zero());
        assert!(!SubjectId::new(7).is_zero());
        assert!(AssessmentId::new(0).is_zero());
        assert!(!OrgId::new(0).is_valid());
        assert!(!OrgId::new(-3).is_valid());
        assert!(OrgId::new(12).is_valid());
    }

    #[test]
    fn test_scale_code_blank() {
        assert!(ScaleCode::new("  ").is_blank());
        assert!(!ScaleCode::from("PHQ-9").is_blank());
    }

    #[test]
    fn test_newtypes_serialize_transparently() {
        assert_eq!(serde_json::to_string(&SubjectId::new(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&ScaleCode::new("GAD-7")).unwrap(),
            "\"GAD-7\""
        );
    }
}
