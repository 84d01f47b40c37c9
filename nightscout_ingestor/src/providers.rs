//! Provider abstraction for diabetes data sources.
//!
//! This module defines the [`DataSource`] trait, the unified interface the
//! autotune engine uses to read glucose entries, treatments and the active
//! therapy profile, and to write an adjusted profile back.
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`dyn DataSource`), so the engine can run against the Nightscout REST
//! implementation in production and an in-memory source in tests.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use nightscout_ingestor::models::{
//!     glucose::GlucoseReading,
//!     profile::{ProfileDocument, TherapyProfile},
//!     treatment::Treatment,
//!     window::FetchWindow,
//! };
//! use nightscout_ingestor::providers::{DataSource, ProviderError};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl DataSource for Empty {
//!     async fn fetch_entries(&self, _w: &FetchWindow) -> Result<Vec<GlucoseReading>, ProviderError> {
//!         Ok(vec![])
//!     }
//!     async fn fetch_treatments(&self, _w: &FetchWindow) -> Result<Vec<Treatment>, ProviderError> {
//!         Ok(vec![])
//!     }
//!     async fn fetch_profile(&self) -> Result<TherapyProfile, ProviderError> {
//!         Ok(TherapyProfile::default())
//!     }
//!     async fn upload_profile(
//!         &self,
//!         _doc: &ProfileDocument<serde_json::Value>,
//!     ) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod nightscout_rest;

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    glucose::GlucoseReading,
    profile::{ProfileDocument, TherapyProfile},
    treatment::Treatment,
    window::FetchWindow,
};

/// Read/write access to a remote diabetes-data service.
#[async_trait]
pub trait DataSource {
    /// Glucose readings inside the window, sorted ascending by timestamp.
    async fn fetch_entries(&self, window: &FetchWindow) -> Result<Vec<GlucoseReading>, ProviderError>;

    /// Valid treatments inside the window, sorted ascending by timestamp.
    async fn fetch_treatments(&self, window: &FetchWindow) -> Result<Vec<Treatment>, ProviderError>;

    /// The currently active therapy profile.
    ///
    /// Returns [`ProviderError::MissingProfile`] when the source has none.
    async fn fetch_profile(&self) -> Result<TherapyProfile, ProviderError>;

    /// Uploads a complete profile document in a single best-effort call.
    async fn upload_profile(
        &self,
        document: &ProfileDocument<serde_json::Value>,
    ) -> Result<(), ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The site URL is not an absolute http(s) URL.
    #[snafu(display("Invalid Nightscout URL {url:?}: {message}"))]
    InvalidUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataSource` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout, bad body).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The remote answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The source holds no usable therapy profile.
    #[snafu(display("No profile data found: {message}"))]
    MissingProfile {
        message: String,
        backtrace: Backtrace,
    },
}
