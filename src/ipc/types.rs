use serde::Deserialize;

use crate::config::Endpoints;
use crate::remote::HttpAttendanceApi;
use crate::session::AttendanceSession;
use crate::sms::HttpSmsGateway;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub api: Option<HttpAttendanceApi>,
    pub sms: Option<HttpSmsGateway>,
    pub session: Option<AttendanceSession>,
}

impl AppState {
    pub fn new() -> AppState {
        AppState {
            api: None,
            sms: None,
            session: None,
        }
    }

    /// Seeds the remote clients from the config profile, when one was found.
    /// A bad profile downgrades to the unconfigured state rather than
    /// refusing to start; `api.configure` can still fix things up later.
    pub fn from_endpoints(endpoints: Option<Endpoints>) -> AppState {
        let mut state = AppState::new();
        let Some(endpoints) = endpoints else {
            return state;
        };
        match HttpAttendanceApi::new(&endpoints.api_url) {
            Ok(api) => state.api = Some(api),
            Err(e) => log::warn!("api endpoint from config unusable: {}", e),
        }
        if let Some(url) = &endpoints.sms_gateway_url {
            match HttpSmsGateway::new(url) {
                Ok(sms) => state.sms = Some(sms),
                Err(e) => log::warn!("sms gateway from config unusable: {}", e),
            }
        }
        state
    }
}
