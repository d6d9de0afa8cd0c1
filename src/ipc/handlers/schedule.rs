use crate::ipc::error::{err, not_configured, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::AttendanceApi;
use serde_json::json;

fn handle_schedule_list_for_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(teacher_id) = req.params.get("teacherId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing teacherId", None);
    };

    match api.teacher_schedules(teacher_id) {
        Ok(schedules) => {
            let value = serde_json::to_value(&schedules).unwrap_or_else(|_| json!({}));
            ok(&req.id, value)
        }
        Err(e) => err(&req.id, "fetch_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.listForTeacher" => Some(handle_schedule_list_for_teacher(state, req)),
        _ => None,
    }
}
