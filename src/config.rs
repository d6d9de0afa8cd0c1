use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One resolved endpoint set. The daemon can also be pointed somewhere else
/// at runtime via `api.configure`.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    pub api_url: String,
    #[serde(default)]
    pub sms_gateway_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    env: Option<String>,
    #[serde(default)]
    profiles: HashMap<String, Endpoints>,
}

fn config_path() -> PathBuf {
    std::env::var_os("ATTENDD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("attendd.toml"))
}

/// Loads the profile file if one exists. No file is not an error; the daemon
/// then waits for `api.configure` before touching the network.
pub fn load() -> anyhow::Result<Option<Endpoints>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_from(&path).map(Some)
}

fn load_from(path: &Path) -> anyhow::Result<Endpoints> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let file: ConfigFile =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;

    let env = std::env::var("ATTENDD_ENV")
        .ok()
        .or(file.env)
        .unwrap_or_else(|| "local".to_string());

    match file.profiles.get(&env) {
        Some(endpoints) => Ok(endpoints.clone()),
        None => bail!("config {} has no profile named {}", path.display(), env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profiles_and_optional_gateway() {
        let raw = r#"
            env = "production"

            [profiles.local]
            api_url = "http://192.168.1.10:3000/api/v1/"

            [profiles.production]
            api_url = "https://attendance.example.com/api/v1/"
            sms_gateway_url = "https://sms.example.com/send"
        "#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(file.env.as_deref(), Some("production"));
        let prod = &file.profiles["production"];
        assert_eq!(prod.api_url, "https://attendance.example.com/api/v1/");
        assert!(prod.sms_gateway_url.is_some());
        assert!(file.profiles["local"].sms_gateway_url.is_none());
    }
}
