use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::{get_env_var, get_optional_env_var};
use snafu::ResultExt;

use crate::{
    models::{
        glucose::GlucoseReading,
        profile::{ProfileDocument, TherapyProfile},
        treatment::Treatment,
        window::FetchWindow,
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, DataSource, InvalidUrlSnafu, MissingEnvVarSnafu,
        MissingProfileSnafu, ProviderError, ProviderInitError, ReqwestSnafu,
        nightscout_rest::{
            params::{DEFAULT_ENTRY_COUNT, entries_query, normalize_token, treatments_query},
            response::{NightscoutEntry, NightscoutTreatment},
        },
    },
};

const ENTRIES_PATH: &str = "api/v1/entries/sgv.json";
const TREATMENTS_PATH: &str = "api/v1/treatments.json";
const PROFILE_PATH: &str = "api/v1/profile.json";

/// Environment variable holding the site URL for [`NightscoutProvider::from_env`].
pub const URL_ENV: &str = "NIGHTSCOUT_URL";
/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "NIGHTSCOUT_TOKEN";

#[derive(Debug, Clone)]
struct Endpoints {
    entries: Url,
    treatments: Url,
    profile: Url,
}

/// A Nightscout site reached over its REST API.
///
/// Authentication is a token sent as the `token` query parameter on every call.
pub struct NightscoutProvider {
    client: Client,
    base_url: Url,
    endpoints: Endpoints,
    token: Option<SecretString>,
    entry_count: u32,
}

impl NightscoutProvider {
    /// Creates a provider for the site at `base_url`.
    ///
    /// `timeout` bounds each HTTP call; `None` leaves reqwest's default (no timeout).
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderInitError> {
        let base_url = parse_base_url(base_url)?;
        let join = |path: &str| {
            base_url.join(path).map_err(|e| {
                InvalidUrlSnafu {
                    url: base_url.to_string(),
                    message: e.to_string(),
                }
                .build()
            })
        };
        let endpoints = Endpoints {
            entries: join(ENTRIES_PATH)?,
            treatments: join(TREATMENTS_PATH)?,
            profile: join(PROFILE_PATH)?,
        };

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(ClientBuildSnafu)?;

        let token = token
            .map(|t| normalize_token(t.expose_secret()).to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        Ok(Self {
            client,
            base_url,
            endpoints,
            token,
            entry_count: DEFAULT_ENTRY_COUNT,
        })
    }

    /// Creates a provider from the `NIGHTSCOUT_URL` and (optional) `NIGHTSCOUT_TOKEN`
    /// environment variables.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        let url = get_env_var(URL_ENV).context(MissingEnvVarSnafu)?;
        let token = get_optional_env_var(TOKEN_ENV).map(SecretString::from);
        Self::new(&url, token, None)
    }

    /// Overrides the per-request entry cap.
    pub fn with_entry_count(mut self, count: NonZeroU32) -> Self {
        self.entry_count = count.get();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.query(&[("token", token.expose_secret())]),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let request = self.authorize(self.client.get(url.clone()).query(query));
        let response = request.send().await.context(ReqwestSnafu)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            tracing::error!(%url, status, "Nightscout API request failed");
            return ApiSnafu { status, message }.fail();
        }

        response.json::<T>().await.context(ReqwestSnafu)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ProviderInitError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/")).map_err(|e| {
        InvalidUrlSnafu {
            url: raw.to_string(),
            message: e.to_string(),
        }
        .build()
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return InvalidUrlSnafu {
            url: raw.to_string(),
            message: "expected an http(s) URL with a host".to_string(),
        }
        .fail();
    }
    Ok(url)
}

#[async_trait]
impl DataSource for NightscoutProvider {
    async fn fetch_entries(&self, window: &FetchWindow) -> Result<Vec<GlucoseReading>, ProviderError> {
        let query = entries_query(window, self.entry_count);
        let raw: Vec<NightscoutEntry> = self.get_json(&self.endpoints.entries, &query).await?;
        let fetched = raw.len();

        let mut readings: Vec<GlucoseReading> = raw
            .into_iter()
            .filter_map(|entry| entry.into_reading(window.timezone()))
            .collect();
        readings.sort_by_key(|r| r.timestamp);

        tracing::debug!(fetched, kept = readings.len(), "fetched glucose entries");
        Ok(readings)
    }

    async fn fetch_treatments(&self, window: &FetchWindow) -> Result<Vec<Treatment>, ProviderError> {
        let query = treatments_query(window);
        let raw: Vec<NightscoutTreatment> = self.get_json(&self.endpoints.treatments, &query).await?;
        let fetched = raw.len();

        let mut treatments: Vec<Treatment> = raw
            .into_iter()
            .filter_map(|t| t.into_treatment(window.timezone()))
            .collect();
        treatments.sort_by_key(|t| t.timestamp);

        tracing::debug!(fetched, kept = treatments.len(), "fetched treatments");
        Ok(treatments)
    }

    async fn fetch_profile(&self) -> Result<TherapyProfile, ProviderError> {
        let documents: Vec<ProfileDocument> = self.get_json(&self.endpoints.profile, &[]).await?;
        select_active_profile(documents)
    }

    async fn upload_profile(
        &self,
        document: &ProfileDocument<serde_json::Value>,
    ) -> Result<(), ProviderError> {
        let request = self.authorize(self.client.post(self.endpoints.profile.clone()).json(document));
        let response = request.send().await.context(ReqwestSnafu)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu { status, message }.fail();
        }

        tracing::info!(profile = %document.default_profile, "uploaded profile");
        Ok(())
    }
}

/// Picks the `defaultProfile` entry of the most recent (first) profile document.
pub fn select_active_profile(documents: Vec<ProfileDocument>) -> Result<TherapyProfile, ProviderError> {
    let Some(document) = documents.into_iter().next() else {
        return MissingProfileSnafu {
            message: "the site returned no profile documents",
        }
        .fail();
    };
    let name = document.default_profile.clone();
    match document.into_active_profile() {
        Some(profile) => Ok(profile),
        None => MissingProfileSnafu {
            message: format!("default profile {name:?} is not in the profile store"),
        }
        .fail(),
    }
}
