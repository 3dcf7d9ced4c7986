// Copyright 2025 Cowboy AI, LLC.

//! State machines for plans and tasks
//!
//! Both aggregates carry a small Moore-style machine: the set of legal next
//! states depends only on the current state. Operations check the machine
//! before mutating anything, so a rejected transition leaves the aggregate
//! untouched.
//!
//! ```mermaid
//! stateDiagram-v2
//!     [*] --> Active: create
//!     Active --> Paused: pause
//!     Paused --> Active: resume / activate
//!     Active --> Finished: finish
//!     Paused --> Finished: finish
//!     Active --> Canceled: cancel
//!     Paused --> Canceled: cancel
//! ```
//!
//! ```mermaid
//! stateDiagram-v2
//!     [*] --> Pending: generate
//!     Pending --> Opened: open
//!     Opened --> Completed: complete
//!     Opened --> Expired: expire
//!     Pending --> Canceled: cancel
//!     Opened --> Canceled: cancel
//! ```

use crate::errors::{DomainError, DomainResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Trait for types that can be used as states in a state machine
pub trait State: Debug + Clone + PartialEq + Eq + Send + Sync {
    /// Get the name of this state for logging/debugging
    fn name(&self) -> &'static str;

    /// Check if this is a terminal state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Transitions whose legality depends only on the current state
pub trait StateTransitions: State {
    /// Check if a transition to the target state is valid
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Get all valid target states from this state
    fn valid_transitions(&self) -> Vec<Self>;
}

/// Fail with [`DomainError::InvalidState`] unless `current` may move to `target`
pub fn ensure_transition<S: StateTransitions + AllStates>(
    entity: &'static str,
    action: &'static str,
    current: &S,
    target: &S,
) -> DomainResult<()> {
    if current.can_transition_to(target) {
        return Ok(());
    }

    let required = S::all()
        .into_iter()
        .filter(|s| s.can_transition_to(target))
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" or ");

    Err(DomainError::InvalidState {
        entity,
        action,
        required,
        actual: current.name().to_string(),
    })
}

/// Enumerable state sets
pub trait AllStates: Sized {
    /// Every state, in declaration order
    fn all() -> Vec<Self>;
}

/// Plan status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Accepting enrollments, tasks run
    #[default]
    Active,
    /// Temporarily halted; non-terminal tasks were canceled
    Paused,
    /// Ran its course
    Finished,
    /// Abandoned
    Canceled,
}

impl PlanStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        self.name()
    }
}

impl State for PlanStatus {
    fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Canceled => "canceled",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Canceled)
    }
}

impl StateTransitions for PlanStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use PlanStatus::*;

        match self {
            Active => vec![Paused, Finished, Canceled],
            Paused => vec![Active, Finished, Canceled],
            Finished | Canceled => vec![],
        }
    }
}

impl AllStates for PlanStatus {
    fn all() -> Vec<Self> {
        vec![Self::Active, Self::Paused, Self::Finished, Self::Canceled]
    }
}

/// Task status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Generated, waiting for its planned time
    #[default]
    Pending,
    /// Entry handed out, waiting for the subject
    Opened,
    /// Measurement recorded
    Completed,
    /// Entry ran out before completion
    Expired,
    /// Withdrawn by plan pause, termination or explicit cancel
    Canceled,
}

impl TaskStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        self.name()
    }
}

impl State for TaskStatus {
    fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Opened => "opened",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Canceled)
    }
}

impl StateTransitions for TaskStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use TaskStatus::*;

        match self {
            Pending => vec![Opened, Canceled],
            Opened => vec![Completed, Expired, Canceled],
            Completed | Expired | Canceled => vec![],
        }
    }
}

impl AllStates for TaskStatus {
    fn all() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Opened,
            Self::Completed,
            Self::Expired,
            Self::Canceled,
        ]
    }
}

macro_rules! status_text {
    ($status:ty) => {
        impl fmt::Display for $status {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $status {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$status as AllStates>::all()
                    .into_iter()
                    .find(|status| status.name() == s)
                    .ok_or_else(|| {
                        DomainError::validation("status", format!("unknown status '{s}'"))
                    })
            }
        }
    };
}

status_text!(PlanStatus);
status_text!(TaskStatus);
