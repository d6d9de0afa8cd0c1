use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::HttpAttendanceApi;
use crate::sms::HttpSmsGateway;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "apiUrl": state.api.as_ref().map(|a| a.base_url().to_string()),
            "smsGatewayConfigured": state.sms.is_some(),
            "sessionOpen": state.session.is_some()
        }),
    )
}

fn handle_api_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(base_url) = req.params.get("baseUrl").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing baseUrl", None);
    };
    if base_url.trim().is_empty() {
        return err(&req.id, "bad_params", "baseUrl must not be empty", None);
    }

    let api = match HttpAttendanceApi::new(base_url) {
        Ok(api) => api,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let sms = match req.params.get("smsGatewayUrl").and_then(|v| v.as_str()) {
        Some(url) if !url.trim().is_empty() => match HttpSmsGateway::new(url) {
            Ok(gateway) => Some(gateway),
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        },
        _ => None,
    };

    let api_url = api.base_url().to_string();
    state.api = Some(api);
    state.sms = sms;
    // A session opened against the previous endpoint is meaningless now.
    state.session = None;

    ok(
        &req.id,
        json!({
            "apiUrl": api_url,
            "smsGatewayConfigured": state.sms.is_some()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "api.configure" => Some(handle_api_configure(state, req)),
        _ => None,
    }
}
