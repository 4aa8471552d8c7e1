//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod agents;
pub mod health;
