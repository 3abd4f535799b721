//! Query functions grouped by the tables they touch.

pub mod activities;
pub mod coverage;
pub mod milestones;
pub mod outcomes;
