use crate::ipc::error::{err, not_configured, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::AttendanceApi;

/// Login is a pass-through: the upstream payload (teacher profile, token)
/// goes straight back to the caller and nothing is persisted here.
fn handle_auth_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(api) = state.api.as_ref() else {
        return not_configured(&req.id);
    };
    let Some(email) = req.params.get("email").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing email", None);
    };
    let Some(password) = req.params.get("password").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing password", None);
    };

    match api.login(email, password) {
        Ok(payload) => ok(&req.id, payload),
        Err(e) => err(&req.id, "fetch_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_auth_login(state, req)),
        _ => None,
    }
}
