// Copyright 2025 Cowboy AI, LLC.

//! # Persistence Layer
//!
//! Ports for storing plans and tasks, the transaction boundary application
//! services run in, and an in-memory adapter for tests and embedding hosts.
//!
//! ## Components
//!
//! - **Repositories**: [`AssessmentPlanRepository`], [`AssessmentTaskRepository`]
//! - **Unit of work**: [`UnitOfWork`] opens a [`Transaction`]; dropping it rolls back
//! - **Optimistic versioning**: saves fail with [`RepositoryError::VersionConflict`]
//!   when the stored version moved on

pub mod in_memory;
pub mod repository;

pub use in_memory::{InMemoryTransaction, InMemoryUnitOfWork};
pub use repository::{
    AssessmentPlanRepository, AssessmentTaskRepository, RepositoryError, Transaction, UnitOfWork,
};
