//! Game Mirror Module
//!
//! Local view of one match. Nothing here evaluates game rules.
//!
//! ## Module Structure
//!
//! - `state`: Match snapshots and the model that owns the current one
//! - `action`: The outstanding server prompt and response correlation
//! - `energy`: Energy type tags shared with deck building

pub mod action;
pub mod energy;
pub mod state;

// Re-export key types
pub use action::{ActionCorrelator, FrameSink, PendingAction, RespondError, Selections, StaleActionError};
pub use energy::EnergyType;
pub use state::{Creature, GameStateModel, MatchState, PlayerView, Snapshot};
