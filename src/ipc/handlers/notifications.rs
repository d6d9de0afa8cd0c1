use crate::ipc::error::{err, not_configured, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::AttendanceApi;

fn handle_logs_for_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(teacher_id) = req.params.get("teacherId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing teacherId", None);
    };

    match api.notification_logs(teacher_id) {
        Ok(logs) => ok(&req.id, logs),
        Err(e) => err(&req.id, "fetch_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notificationLog.listForTeacher" => Some(handle_logs_for_teacher(state, req)),
        _ => None,
    }
}
