//! Nightscout REST API (`/api/v1`) implementation of [`DataSource`](crate::providers::DataSource).

pub mod params;
pub mod provider;
pub mod response;

pub use provider::NightscoutProvider;
