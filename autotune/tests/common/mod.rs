#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use nightscout_ingestor::{
    models::{
        glucose::{GlucoseReading, TrendDirection},
        profile::{ProfileDocument, ScheduleEntry, TherapyProfile},
        treatment::Treatment,
        window::FetchWindow,
    },
    providers::{DataSource, ProviderError},
};

/// In-memory data source. Returns its fixtures regardless of window and records uploads.
#[derive(Default)]
pub struct MemorySource {
    pub readings: Vec<GlucoseReading>,
    pub treatments: Vec<Treatment>,
    pub profile: Option<TherapyProfile>,
    pub fail_uploads: bool,
    pub uploads: Arc<Mutex<Vec<ProfileDocument<serde_json::Value>>>>,
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch_entries(&self, _window: &FetchWindow) -> Result<Vec<GlucoseReading>, ProviderError> {
        Ok(self.readings.clone())
    }

    async fn fetch_treatments(&self, _window: &FetchWindow) -> Result<Vec<Treatment>, ProviderError> {
        Ok(self.treatments.clone())
    }

    async fn fetch_profile(&self) -> Result<TherapyProfile, ProviderError> {
        match &self.profile {
            Some(profile) => Ok(profile.clone()),
            None => nightscout_ingestor::providers::MissingProfileSnafu {
                message: "no profile documents",
            }
            .fail(),
        }
    }

    async fn upload_profile(&self, document: &ProfileDocument<serde_json::Value>) -> Result<(), ProviderError> {
        if self.fail_uploads {
            return nightscout_ingestor::providers::ApiSnafu {
                status: 500u16,
                message: "upload rejected",
            }
            .fail();
        }
        self.uploads.lock().unwrap().push(document.clone());
        Ok(())
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

/// `count` readings every 5 minutes from `start`, rising by `step` mg/dL each.
pub fn rising_readings(start: NaiveDateTime, count: usize, first: i32, step: i32) -> Vec<GlucoseReading> {
    (0..count)
        .map(|i| GlucoseReading {
            timestamp: start + Duration::minutes(5 * i as i64),
            value: first + step * i as i32,
            direction: TrendDirection::Flat,
            device: "test-cgm".into(),
        })
        .collect()
}

pub fn bolus(timestamp: NaiveDateTime, insulin: f64) -> Treatment {
    Treatment {
        timestamp,
        event_type: "Correction Bolus".into(),
        insulin: Some(insulin),
        carbs: None,
        rate: None,
        duration: None,
        absolute: None,
    }
}

/// ISF 50, carb ratio 10, flat 0.8 U/h basal.
pub fn flat_profile() -> TherapyProfile {
    TherapyProfile {
        sens: vec![ScheduleEntry::new("00:00", 50.0)],
        carbratio: vec![ScheduleEntry::new("00:00", 10.0)],
        basal: vec![ScheduleEntry::new("00:00", 0.8)],
        dia: Some(5.0),
        units: Some("mg/dl".into()),
        ..Default::default()
    }
}
