//! Input handlers
//!
//! Nodes that block on data from outside the run.

mod wait_human;

pub use wait_human::WaitHumanHandler;
