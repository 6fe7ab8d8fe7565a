//! Consensus state machine and the pure rules around voting.
//!
//! Nothing in here touches the database: the query modules load rows, ask
//! these functions whether an action is allowed, and persist the outcome.

pub mod rules;
pub mod types;

pub use rules::*;
pub use types::*;
