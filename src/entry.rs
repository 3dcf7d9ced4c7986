// Copyright 2025 Cowboy AI, LLC.

//! Entry generation for opened tasks
//!
//! An entry is what a subject needs to take a measurement: an opaque token,
//! the URL carrying it and a deadline.

use crate::config::SchedulerConfig;
use crate::errors::{DomainError, DomainResult};
use crate::plan::AssessmentTask;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access material for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque access token
    pub token: String,
    /// URL the subject opens
    pub url: String,
    /// Deadline of the entry
    pub expire_at: DateTime<Utc>,
}

/// Produces entries for tasks about to open
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryGenerator: Send + Sync {
    /// Entry for `task`
    async fn generate_entry(&self, task: &AssessmentTask) -> DomainResult<Entry>;
}

/// Random-token entries under a base URL
///
/// `url = {base}/{task_id}?token={token}`; the entry stays valid for the
/// configured TTL counted from the later of now and the planned time.
#[derive(Debug, Clone)]
pub struct TokenEntryGenerator {
    base_url: String,
    ttl: TimeDelta,
}

impl TokenEntryGenerator {
    /// Create a generator
    pub fn new(base_url: impl Into<String>, ttl: TimeDelta) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
        }
    }

    /// Generator configured from [`SchedulerConfig`]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.entry_base_url.clone(), config.entry_ttl())
    }
}

#[async_trait]
impl EntryGenerator for TokenEntryGenerator {
    async fn generate_entry(&self, task: &AssessmentTask) -> DomainResult<Entry> {
        if self.ttl <= TimeDelta::zero() {
            return Err(DomainError::external(
                "entry_generator",
                "entry ttl must be positive",
            ));
        }

        let token = Uuid::new_v4().simple().to_string();
        let url = format!("{}/{}?token={}", self.base_url, task.id(), token);
        let start = Utc::now().max(task.planned_at());
        let expire_at = start
            .checked_add_signed(self.ttl)
            .ok_or_else(|| DomainError::external("entry_generator", "entry expiry overflows"))?;

        Ok(Entry {
            token,
            url,
            expire_at,
        })
    }
}
