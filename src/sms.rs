use chrono::NaiveDate;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::model::Student;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("sms gateway error: {0}")]
    Gateway(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Guardian notification channel. Best-effort by contract: callers log
/// failures and move on, they never roll anything back.
pub trait SmsDispatcher {
    fn send(&self, phone_number: &str, message: &str) -> Result<(), DispatchError>;
}

pub fn absence_message(student: &Student, class_name: &str, date: NaiveDate) -> String {
    let parent_name = student.parent_name.as_deref().unwrap_or("Parent/Guardian");
    format!(
        "Dear {}, This is to inform you that your child, {}, was marked absent for {} on {}.",
        parent_name,
        student.full_name(),
        class_name,
        date.format("%B %d, %Y")
    )
}

/// Stand-in dispatcher for a daemon running without a gateway. Every send
/// fails, which the session layer logs and swallows like any other dispatch
/// failure.
pub struct NoGateway;

impl SmsDispatcher for NoGateway {
    fn send(&self, _phone_number: &str, _message: &str) -> Result<(), DispatchError> {
        Err(DispatchError::Gateway(
            "no sms gateway configured".to_string(),
        ))
    }
}

pub struct HttpSmsGateway {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSmsGateway {
    pub fn new(url: &str) -> Result<HttpSmsGateway, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        Ok(HttpSmsGateway {
            url: url.trim().to_string(),
            client,
        })
    }
}

impl SmsDispatcher for HttpSmsGateway {
    fn send(&self, phone_number: &str, message: &str) -> Result<(), DispatchError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "to": phone_number, "message": message }))
            .send()
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DispatchError::Gateway(format!(
                "gateway returned {}",
                resp.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentUser;

    fn student(parent_name: Option<&str>) -> Student {
        Student {
            id: "s1".to_string(),
            user: StudentUser {
                first_name: "Maria".to_string(),
                middle_name: None,
                last_name: "Santos".to_string(),
            },
            student_id: None,
            level: None,
            section: None,
            parent_name: parent_name.map(|s| s.to_string()),
            parent_no: Some("+639170000000".to_string()),
        }
    }

    #[test]
    fn absence_message_names_parent_student_class_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();
        let msg = absence_message(&student(Some("Mrs. Santos")), "Mathematics", date);
        assert_eq!(
            msg,
            "Dear Mrs. Santos, This is to inform you that your child, Maria Santos, \
             was marked absent for Mathematics on October 21, 2024."
        );
    }

    #[test]
    fn absence_message_falls_back_to_generic_guardian() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 21).unwrap();
        let msg = absence_message(&student(None), "Mathematics", date);
        assert!(msg.starts_with("Dear Parent/Guardian,"));
    }
}
