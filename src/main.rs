mod config;
mod ipc;
mod model;
mod remote;
mod session;
mod sms;

use std::io::{self, BufRead, Write};

fn main() {
    // Logs go to stderr; stdout is the protocol channel.
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("ATTENDD_LOG", "info")).init();

    let endpoints = match config::load() {
        Ok(v) => v,
        Err(e) => {
            log::warn!("ignoring unusable config: {:#}", e);
            None
        }
    };
    let mut state = ipc::AppState::from_endpoints(endpoints);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; ignore.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
