//! Host simulation: owns agents and drives grid membership as a caller.
//!
//! # Invariants
//! - Every live agent is stored in exactly the cell that owns its position.
//! - All mutations flow through explicit operations and are logged.
//! - Stepping is deterministic for a given seed and operation sequence.

mod agent;
mod simulation;

pub use agent::{Agent, AgentKind};
pub use simulation::{Movement, SimError, SimEvent, Simulation};
