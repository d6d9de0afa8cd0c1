use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Shared guard responses, so every handler reports the same message for the
/// same missing precondition.
pub fn not_configured(id: &str) -> serde_json::Value {
    err(id, "not_configured", "configure the api endpoint first", None)
}

pub fn no_session(id: &str) -> serde_json::Value {
    err(id, "no_session", "open a session first", None)
}
