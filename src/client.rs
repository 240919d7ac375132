//! This module provides a client to the remote DLB attendance system
//!
//! [`DlbClient`] is a thin, retry-free wrapper around the DLB HTTP API. It attaches
//! the bearer token and a configured timeout to every request and converts every
//! failure mode into an [`ApiError`] at this boundary: transport failures become
//! `CONNECTION_ERROR`, non-2xx responses have their JSON error envelope extracted.

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Serialize;
use url::Url;

use crate::attendance::{AttendanceFilter, AttendanceRecord};
use crate::config::DlbConfig;
use crate::error::ApiError;
use crate::schedule::TrainingOccurrence;
use crate::traits::MusterSource;

/// The identifier DLB assigns to a created muster
pub type MusterId = String;

/// The body of `POST /musters`
#[derive(Debug, Serialize)]
struct MusterPayload<'a> {
    brigade_id: &'a str,
    date: chrono::NaiveDate,
    start_time: chrono::NaiveTime,
    duration_hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl<'a> MusterPayload<'a> {
    fn from_occurrence(occurrence: &'a TrainingOccurrence) -> Self {
        let note = match occurrence.holiday_name() {
            Some(holiday) => Some(format!(
                "Shifted from {} ({})",
                occurrence.scheduled_date(),
                holiday
            )),
            None => None,
        };
        Self {
            brigade_id: occurrence.brigade_id(),
            date: occurrence.actual_date(),
            start_time: occurrence.start_time(),
            duration_hours: occurrence.duration_hours(),
            note,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct AttendanceResponse {
    records: Vec<AttendanceRecord>,
}

/// A muster source backed by the remote DLB HTTP API
pub struct DlbClient {
    base_url: Url,
    token: String,
    http: reqwest::Client,
}

impl DlbClient {
    /// Create a client. This does not contact the server
    pub fn new(config: &DlbConfig) -> Result<Self, Box<dyn Error>> {
        let base_url = Url::parse(&config.api_base_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url,
            token: config.api_token.clone(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Send a request with auth attached, returning the status and body.
    /// Transport failures are converted right here and never escape as reqwest errors
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), ApiError> {
        let response = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(ApiError::connection)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(ApiError::connection)?;
        Ok((status, body))
    }
}

#[async_trait]
impl MusterSource for DlbClient {
    async fn create_muster(&self, occurrence: &TrainingOccurrence) -> Result<MusterId, ApiError> {
        let payload = MusterPayload::from_occurrence(occurrence);
        log::debug!(
            "Creating muster for brigade {} on {}",
            occurrence.brigade_id(),
            occurrence.actual_date()
        );

        let request = self.http.post(self.endpoint("musters")).json(&payload);
        let (status, body) = self.execute(request).await?;
        if is_success(status) == false {
            return Err(ApiError::from_response(status, &body));
        }

        parse_created_id(status, &body)
    }

    async fn fetch_attendance(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(brigade_id) = &filter.brigade_id {
            query.push(("brigade_id", brigade_id.clone()));
        }
        if let Some(muster_id) = &filter.muster_id {
            query.push(("muster_id", muster_id.clone()));
        }
        if let Some(from) = filter.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = filter.to {
            query.push(("to", to.to_string()));
        }

        let request = self.http.get(self.endpoint("attendance")).query(&query);
        let (status, body) = self.execute(request).await?;
        if is_success(status) == false {
            return Err(ApiError::from_response(status, &body));
        }

        match serde_json::from_str::<AttendanceResponse>(&body) {
            Ok(parsed) => Ok(parsed.records),
            Err(err) => Err(ApiError::unexpected_response(
                status,
                format!("Unparsable attendance response: {}", err),
                &body,
            )),
        }
    }

    async fn test_connection(&self) -> bool {
        let request = self.http.get(self.endpoint("ping"));
        match self.execute(request).await {
            Ok((status, _body)) if is_success(status) => true,
            Ok((status, body)) => {
                log::warn!("DLB connection test failed: {}", ApiError::from_response(status, &body));
                false
            },
            Err(err) => {
                log::warn!("DLB connection test failed: {}", err);
                false
            },
        }
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Extract the muster id from a 2xx `POST /musters` response (`{"id": ...}`).
/// DLB has been seen returning both string and numeric ids
fn parse_created_id(status: u16, body: &str) -> Result<MusterId, ApiError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|err| {
        ApiError::unexpected_response(status, format!("Unparsable response: {}", err), body)
    })?;

    match value.get("id") {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ApiError::unexpected_response(status, "Response has no muster id", body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brigade::Brigade;
    use crate::holidays::{HolidaySet, PublicHoliday, Region};
    use crate::schedule::ScheduleGenerator;
    use chrono::{NaiveDate, NaiveTime, Weekday};

    #[test]
    fn endpoint_joining_tolerates_trailing_slash() {
        let mut config = DlbConfig::default();
        config.api_base_url = "https://dlb.example.org/api/v1/".to_string();
        let client = DlbClient::new(&config).unwrap();
        assert_eq!(client.endpoint("musters"), "https://dlb.example.org/api/v1/musters");

        config.api_base_url = "https://dlb.example.org/api/v1".to_string();
        let client = DlbClient::new(&config).unwrap();
        assert_eq!(client.endpoint("musters"), "https://dlb.example.org/api/v1/musters");
    }

    #[test]
    fn muster_payload_shape() {
        let brigade = Brigade::new(
            "b1",
            "Test Brigade",
            Region::Auckland,
            Weekday::Mon,
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            2,
        );
        let holidays = HolidaySet::from_holidays(vec![PublicHoliday::new(
            NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(),
            "Auckland Anniversary Day",
            Region::Auckland,
        )]);
        let generator = ScheduleGenerator::new(holidays);
        let occurrences = generator.occurrences(&brigade, NaiveDate::from_ymd_opt(2026, 1, 26).unwrap(), 0);

        let payload = MusterPayload::from_occurrence(&occurrences[0]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["brigade_id"], "b1");
        assert_eq!(json["date"], "2026-01-27");
        assert_eq!(json["start_time"], "19:00:00");
        assert_eq!(json["duration_hours"], 2);
        assert_eq!(json["note"], "Shifted from 2026-01-26 (Auckland Anniversary Day)");
    }

    #[test]
    fn created_id_parsing() {
        assert_eq!(parse_created_id(201, r#"{"id": "m-42"}"#).unwrap(), "m-42");
        assert_eq!(parse_created_id(201, r#"{"id": 42}"#).unwrap(), "42");

        let err = parse_created_id(201, r#"{"status": "ok"}"#).unwrap_err();
        assert_eq!(err.http_status(), Some(201));
        assert!(err.summary().contains("no muster id"));

        assert!(parse_created_id(200, "not json").is_err());
    }
}
