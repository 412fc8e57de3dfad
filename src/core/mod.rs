//! Core dispatch mechanism: queue, pool, gate, load control, worker loop.

pub mod chaos;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod executor;
pub mod gate;
pub mod item;
pub mod load;
pub mod queue;
pub mod resource_pool;

pub use chaos::{FailurePolicy, NoFailures, RandomFailures, ScriptedFailures};
pub use context::SystemContext;
pub use dispatcher::DispatchEngine;
pub use error::{AppResult, DispatchError};
pub use events::{DispatchEvent, EventKind, EventSink, InMemoryEventSink};
pub use executor::{FixedWork, SimulatedWork, WorkExecutor};
pub use gate::CapacityGate;
pub use item::{Priority, WorkItem};
pub use load::{CapacityChange, LoadController};
pub use queue::PriorityQueue;
pub use resource_pool::{ResourcePool, UnitSnapshot};
