//! # floor-scheduler
//!
//! A time-based scaling controller: it watches declarative scaling
//! schedules and autoscaler observations, and at scheduled windows mutates
//! the `minReplicas` floor of the associated autoscaler resources,
//! restoring each application's configured default outside those windows.
//!
//! The reconciliation engine is the entire subsystem this crate
//! implements:
//!
//! - [`calendar`] — wall-clock time in a fixed policy timezone, weekday
//!   classification, window arithmetic.
//! - [`schedule`] / [`schedule_store`] — the declared `env-app` → schedule
//!   mapping.
//! - [`target`] / [`target_index`] — the observed `env-app` → autoscaler
//!   state mapping.
//! - [`decision`] — the pure function from snapshots + now to mutation
//!   intents.
//! - [`reconciler`] — the single-writer loop that serializes both input
//!   streams and the periodic tick, then dispatches through [`patch`].
//!
//! The orchestrator's watch-API transport, credentials, and declarative
//! schema registration are external collaborators; see
//! [`reconciler::ApiWatcher`].

pub mod calendar;
pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod logging;
pub mod patch;
pub mod reconciler;
pub mod schedule;
pub mod schedule_store;
pub mod stream;
pub mod target;
pub mod target_index;
