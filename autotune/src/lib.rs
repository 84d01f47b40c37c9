//! Autotune for Nightscout data: compares observed glucose changes against a
//! simple insulin/carb model and proposes bounded adjustments to ISF and the
//! hourly basal schedule.
//!
//! The entry point is [`engine::AutotuneEngine::run`], which never fails; it
//! returns a [`outcome::RunOutcome`] describing success or the reason for failure.

pub mod applier;
pub mod cli;
pub mod config;
pub mod deviation;
pub mod engine;
pub mod errors;
pub mod io;
pub mod outcome;
pub mod pump_profile;
pub mod recommendation;
pub mod schedule;
