//! Conflict resolution: per-root elections over forked blocks.
//!
//! Each contested chain position (identified by the block root) gets an
//! in-memory election collecting signed representative votes. Thresholds
//! are fractions of the online voting weight: an uncontested block needs an
//! eighth, a contested leader half, and a settled winner is only displaced
//! with an eighth of hysteresis.

pub mod active_elections;
pub mod election;
pub mod online_reps;

pub use active_elections::{ActiveElections, ElectionConfig, ElectionEvent};
pub use election::{Election, VoteResult};
pub use online_reps::OnlineReps;
