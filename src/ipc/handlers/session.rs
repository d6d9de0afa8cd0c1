use chrono::NaiveDate;
use serde_json::json;

use crate::ipc::error::{err, no_session, not_configured, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::session::{AttendanceSession, SessionError, SubmitOutcome};
use crate::sms::NoGateway;

fn snapshot(session: &AttendanceSession) -> serde_json::Value {
    let schedule = session
        .schedule()
        .and_then(|s| serde_json::to_value(s).ok());
    json!({
        "classId": session.class_id(),
        "date": session.date().format("%Y-%m-%d").to_string(),
        "phase": session.phase().as_str(),
        "mode": if session.is_update_mode() { "update" } else { "create" },
        "existingRecordId": session.existing_record().map(|r| r.id.clone()),
        "schedule": schedule,
        "marks": session.marks(),
        "lastError": session.last_error(),
    })
}

fn session_err(id: &str, e: &SessionError) -> serde_json::Value {
    let code = match e {
        SessionError::Fetch(_) => "fetch_failed",
        SessionError::Incomplete => "incomplete_attendance",
        SessionError::Submit(_) => "submit_failed",
        SessionError::UnknownStudent(_) => "unknown_student",
        SessionError::BadPhase { .. } => "bad_state",
    };
    err(id, code, e.to_string(), None)
}

fn get_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, String> {
    let Some(raw) = params.get(key).and_then(|v| v.as_str()) else {
        return Err(format!("missing {}", key));
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("{} must be a YYYY-MM-DD date", key))
}

fn handle_session_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(class_id) = req.params.get("classId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing classId", None);
    };
    let date = match get_date(&req.params, "date") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    // Opening replaces whatever session was active before.
    let mut session = AttendanceSession::new(class_id, date);
    let result = session.open(api);
    let resp = match &result {
        Ok(()) => ok(&req.id, snapshot(&session)),
        Err(e) => session_err(&req.id, e),
    };
    // The errored session is kept so session.state can report the failure.
    state.session = Some(session);
    resp
}

fn handle_session_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(session) => ok(&req.id, snapshot(session)),
        None => no_session(&req.id),
    }
}

fn handle_session_set_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_mut() else {
        return no_session(&req.id);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    let Some(raw_status) = req.params.get("status").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing status", None);
    };
    let Some(status) = AttendanceStatus::parse(raw_status) else {
        return err(
            &req.id,
            "bad_params",
            "status must be one of present, absent, late, excused",
            None,
        );
    };

    match session.set_mark(student_id, status) {
        Ok(()) => ok(&req.id, json!({ "marks": session.marks() })),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_session_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_mut() else {
        return no_session(&req.id);
    };
    match session.reset() {
        Ok(()) => ok(
            &req.id,
            json!({
                "mode": "create",
                "marks": session.marks()
            }),
        ),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_session_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return no_session(&req.id);
    };
    ok(
        &req.id,
        json!({
            "complete": session.validate(),
            "unmarked": session.unmarked_students()
        }),
    )
}

fn handle_session_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(session) = state.session.as_mut() else {
        return no_session(&req.id);
    };

    let result = match state.sms.as_ref() {
        Some(gateway) => session.submit(api, gateway),
        None => session.submit(api, &NoGateway),
    };

    match result {
        Ok(SubmitOutcome::Created) => ok(&req.id, json!({ "mode": "created" })),
        Ok(SubmitOutcome::Updated) => ok(&req.id, json!({ "mode": "updated" })),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_session_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(session) = state.session.as_ref() else {
        return no_session(&req.id);
    };
    let start = match get_date(&req.params, "startDate") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let end = match get_date(&req.params, "endDate") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    match session.stats(api, start, end) {
        Ok(stats) => ok(&req.id, stats),
        Err(e) => err(&req.id, "fetch_failed", e.to_string(), None),
    }
}

fn handle_session_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.open" => Some(handle_session_open(state, req)),
        "session.state" => Some(handle_session_state(state, req)),
        "session.setMark" => Some(handle_session_set_mark(state, req)),
        "session.reset" => Some(handle_session_reset(state, req)),
        "session.validate" => Some(handle_session_validate(state, req)),
        "session.submit" => Some(handle_session_submit(state, req)),
        "session.stats" => Some(handle_session_stats(state, req)),
        "session.close" => Some(handle_session_close(state, req)),
        _ => None,
    }
}
