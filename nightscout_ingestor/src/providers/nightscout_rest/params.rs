use crate::{models::window::FetchWindow, tz::to_rfc3339_millis};

/// Default cap on entries per request; a day of 5-minute CGM data is 288.
pub const DEFAULT_ENTRY_COUNT: u32 = 1500;

/// Query for `entries/sgv.json`: an epoch-millisecond `date` range.
pub fn entries_query(window: &FetchWindow, count: u32) -> Vec<(String, String)> {
    vec![
        (
            "find[date][$gte]".to_string(),
            window.start_utc().timestamp_millis().to_string(),
        ),
        (
            "find[date][$lte]".to_string(),
            window.end_utc().timestamp_millis().to_string(),
        ),
        ("count".to_string(), count.to_string()),
    ]
}

/// Query for `treatments.json`: an ISO-8601 `created_at` range.
pub fn treatments_query(window: &FetchWindow) -> Vec<(String, String)> {
    vec![
        (
            "find[created_at][$gte]".to_string(),
            to_rfc3339_millis(window.start_utc()),
        ),
        (
            "find[created_at][$lte]".to_string(),
            to_rfc3339_millis(window.end_utc()),
        ),
    ]
}

/// Strips an optional `token=` prefix from a user-supplied token.
pub fn normalize_token(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix("token=").unwrap_or(raw)
}
