use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::model::{
    AttendancePair, ClassSchedule, CreateAttendance, ExistingAttendanceRecord, TeacherSchedules,
};

/// Roster or lookup failure. `Server` carries the message the API put in the
/// response body; `Network` is everything below that (DNS, refused, timeout).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Server(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Server(String),
    #[error("network error: {0}")]
    Network(String),
}

/// The remote school API, one method per consumed endpoint. The session core
/// only sees this trait; transport lives in `HttpAttendanceApi`.
pub trait AttendanceApi {
    fn fetch_schedule(&self, class_id: &str) -> Result<ClassSchedule, FetchError>;

    /// Day-granularity lookup for a previously submitted record.
    fn check_existing(
        &self,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ExistingAttendanceRecord>, FetchError>;

    fn create_attendance(&self, payload: &CreateAttendance) -> Result<(), SubmitError>;

    fn update_attendance(
        &self,
        record_id: &str,
        pairs: &[AttendancePair],
    ) -> Result<(), SubmitError>;

    fn stats(
        &self,
        class_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, FetchError>;

    fn teacher_schedules(&self, teacher_id: &str) -> Result<TeacherSchedules, FetchError>;

    fn notification_logs(&self, teacher_id: &str) -> Result<serde_json::Value, FetchError>;

    fn login(&self, email: &str, password: &str) -> Result<serde_json::Value, FetchError>;
}

/// Upstream response envelope: `{status, message?, data: {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

pub struct HttpAttendanceApi {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpAttendanceApi {
    pub fn new(base_url: &str) -> Result<HttpAttendanceApi, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(HttpAttendanceApi {
            base_url: normalize_base_url(base_url),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read_envelope(
        resp: reqwest::blocking::Response,
        fallback: &str,
    ) -> Result<Envelope, String> {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(server_message(&body, fallback));
        }
        serde_json::from_str::<Envelope>(&body).map_err(|_| fallback.to_string())
    }

    fn get(&self, path: &str, query: &[(&str, String)], fallback: &str) -> Result<Envelope, FetchError> {
        let resp = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Self::read_envelope(resp, fallback).map_err(FetchError::Server)
    }
}

fn normalize_base_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn server_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| fallback.to_string())
}

fn is_success(envelope: &Envelope) -> bool {
    envelope.status.as_deref() == Some("success")
}

const DATE_FMT: &str = "%Y-%m-%d";

impl AttendanceApi for HttpAttendanceApi {
    fn fetch_schedule(&self, class_id: &str) -> Result<ClassSchedule, FetchError> {
        let fallback = "Failed to fetch class schedule";
        let envelope = self.get(&format!("class-schedule/{}", class_id), &[], fallback)?;
        let schedule = envelope
            .data
            .get("schedule")
            .cloned()
            .ok_or_else(|| FetchError::Server(fallback.to_string()))?;
        serde_json::from_value(schedule).map_err(|_| FetchError::Server(fallback.to_string()))
    }

    fn check_existing(
        &self,
        class_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ExistingAttendanceRecord>, FetchError> {
        let fallback = "Failed to check existing attendance";
        let envelope = self.get(
            "attendance/check",
            &[
                ("classScheduleId", class_id.to_string()),
                ("date", date.format(DATE_FMT).to_string()),
            ],
            fallback,
        )?;
        let exists = envelope
            .data
            .get("exists")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !exists {
            return Ok(None);
        }
        let record = envelope
            .data
            .get("attendance")
            .cloned()
            .ok_or_else(|| FetchError::Server(fallback.to_string()))?;
        serde_json::from_value(record)
            .map(Some)
            .map_err(|_| FetchError::Server(fallback.to_string()))
    }

    fn create_attendance(&self, payload: &CreateAttendance) -> Result<(), SubmitError> {
        let fallback = "Failed to submit attendance";
        let resp = self
            .client
            .post(self.url("attendance"))
            .json(payload)
            .send()
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        let envelope = Self::read_envelope(resp, fallback).map_err(SubmitError::Server)?;
        if is_success(&envelope) {
            Ok(())
        } else {
            Err(SubmitError::Server(
                envelope.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }

    fn update_attendance(
        &self,
        record_id: &str,
        pairs: &[AttendancePair],
    ) -> Result<(), SubmitError> {
        let fallback = "Failed to update attendance";
        let resp = self
            .client
            .put(self.url(&format!("attendance/{}", record_id)))
            .json(&json!({ "attendanceRecords": pairs }))
            .send()
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        let envelope = Self::read_envelope(resp, fallback).map_err(SubmitError::Server)?;
        if is_success(&envelope) {
            Ok(())
        } else {
            Err(SubmitError::Server(
                envelope.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }

    fn stats(
        &self,
        class_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, FetchError> {
        let fallback = "Failed to fetch attendance stats";
        let envelope = self.get(
            &format!("attendance/stats/{}", class_id),
            &[
                ("startDate", start.format(DATE_FMT).to_string()),
                ("endDate", end.format(DATE_FMT).to_string()),
            ],
            fallback,
        )?;
        envelope
            .data
            .get("stats")
            .cloned()
            .ok_or_else(|| FetchError::Server(fallback.to_string()))
    }

    fn teacher_schedules(&self, teacher_id: &str) -> Result<TeacherSchedules, FetchError> {
        let fallback = "Failed to fetch schedules";
        let envelope = self.get(
            &format!("class-schedule/teacher/{}", teacher_id),
            &[],
            fallback,
        )?;
        let schedule = envelope
            .data
            .get("schedule")
            .cloned()
            .ok_or_else(|| FetchError::Server(fallback.to_string()))?;
        serde_json::from_value(schedule).map_err(|_| FetchError::Server(fallback.to_string()))
    }

    fn notification_logs(&self, teacher_id: &str) -> Result<serde_json::Value, FetchError> {
        let fallback = "Failed to fetch notification logs";
        let envelope = self.get(
            &format!("notification-log/teacher/{}", teacher_id),
            &[],
            fallback,
        )?;
        Ok(envelope.data)
    }

    fn login(&self, email: &str, password: &str) -> Result<serde_json::Value, FetchError> {
        let fallback = "Login failed";
        let resp = self
            .client
            .post(self.url("auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(FetchError::Server(server_message(&body, fallback)));
        }
        serde_json::from_str(&body).map_err(|_| FetchError::Server(fallback.to_string()))
    }
}
