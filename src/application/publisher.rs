// Copyright 2025 Cowboy AI, LLC.

//! Event publication port

use crate::errors::DomainResult;
use crate::events::{DomainEvent, PlanEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Publishes committed domain events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event
    async fn publish(&self, event: &PlanEvent) -> DomainResult<()>;

    /// Publish events in order
    async fn publish_batch(&self, events: &[PlanEvent]) -> DomainResult<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// Publisher that keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    published: Arc<RwLock<Vec<PlanEvent>>>,
}

impl InMemoryEventPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far
    pub async fn published_events(&self) -> Vec<PlanEvent> {
        self.published.read().await.clone()
    }

    /// Event type names published so far
    pub async fn event_types(&self) -> Vec<&'static str> {
        self.published
            .read()
            .await
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }

    /// Forget recorded events
    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &PlanEvent) -> DomainResult<()> {
        debug!(event_type = event.event_type(), plan_id = %event.plan_id(), "Publishing event");
        self.published.write().await.push(event.clone());
        Ok(())
    }
}

/// Publish after commit; failures are logged, never returned
pub(crate) async fn publish_committed(publisher: &dyn EventPublisher, events: &[PlanEvent]) {
    if events.is_empty() {
        return;
    }

    if let Err(err) = publisher.publish_batch(events).await {
        warn!(
            count = events.len(),
            first_event = events[0].event_type(),
            error = %err,
            "Failed to publish committed events"
        );
    }
}
