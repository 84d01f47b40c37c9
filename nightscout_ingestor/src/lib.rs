//! Client side of the autotune pipeline: canonical glucose/treatment/profile
//! models and the [`providers::DataSource`] abstraction over a Nightscout site.

pub mod models;
mod numeric;
pub mod providers;
pub mod tz;
