//! # Priority Dispatch
//!
//! A concurrent priority-dispatch engine for resource-constrained workloads.
//!
//! This library provides a bounded pool of execution slots served by multiple
//! worker threads, fed by a shared priority queue, with administrative ability
//! to fail and recover individual resource units and to adjust serving
//! capacity dynamically under load.
//!
//! ## Core Problem Solved
//!
//! Dispatch-style workloads share a common shape that generic thread pools do
//! not cover well:
//!
//! - **Priority admission**: urgent items must be served before backlog, and
//!   critical items must bypass numeric priority entirely
//! - **Bounded concurrency**: a fixed number of slots may run at once, and
//!   that number must be resizable without revoking work already in flight
//! - **Resource failover**: an execution unit can fail while holding work;
//!   that work must re-enter the queue instead of being lost
//! - **Load-driven elasticity**: sustained load should grant extra capacity,
//!   and an emergency policy should shed low-priority traffic
//!
//! ## Key Components
//!
//! - [`core::PriorityQueue`]: ordered admission with critical-item preemption
//! - [`core::ResourcePool`]: healthy/failed unit tracking with redirection
//! - [`core::CapacityGate`]: counting admission gate with `grant`/`withdraw`
//! - [`core::DispatchEngine`]: the worker-thread dispatch loop and admin API
//! - [`core::LoadController`]: load accounting and elastic capacity
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use priority_dispatch::builders::EngineBuilder;
//! use priority_dispatch::config::EngineConfig;
//! use priority_dispatch::core::FixedWork;
//!
//! let engine = EngineBuilder::new(EngineConfig::default())
//!     .with_executor(Arc::new(FixedWork::new(Duration::from_millis(20))))
//!     .build()?;
//!
//! engine.start()?;
//! let id = engine.submit(2, false, None)?;
//! engine.trigger_emergency();
//! engine.stop();
//! ```
//!
//! For complete examples, see `tests/dispatch_engine_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch mechanism: queue, pool, gate, load control, worker loop.
pub mod core;
/// Configuration models for the engine.
pub mod config;
/// Builders to construct the engine from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
