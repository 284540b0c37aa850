use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::ai::prompt::SYSTEM_MESSAGE;
use crate::ai::provider::ProviderKind;

/// Connection details for one hosted provider. Only providers with a
/// credential make it into `AppConfig::providers`.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub api_hostname: String,
    pub models: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    // In priority order, the first one is the default selection
    pub providers: Vec<ProviderConfig>,
    pub system_message: String,
    pub web_ui_path: String,
    // Server sessions unused for this long are dropped
    pub session_idle_timeout: Duration,
}

pub const DEFAULT_SESSION_IDLE_MINUTES: u64 = 60;

impl AppConfig {
    /// Read configuration from environment variables. Fails when no
    /// provider credential is set since there is nothing to talk to.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source. `from_env` is the
    /// only production caller, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let providers: Vec<ProviderConfig> = ProviderKind::ALL
            .iter()
            .filter_map(|kind| provider_config(*kind, &lookup))
            .collect();

        if providers.is_empty() {
            let keys: Vec<&str> = ProviderKind::ALL
                .iter()
                .map(|kind| kind.credential_key())
                .collect();
            bail!(
                "No provider credentials configured. Set at least one of {}",
                keys.join(", ")
            );
        }

        let system_message = lookup("ADVISOR_SYSTEM_MESSAGE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| SYSTEM_MESSAGE.to_string());
        let web_ui_path = lookup("ADVISOR_WEB_UI_PATH").unwrap_or_else(|| "./web-ui".to_string());
        let session_idle_timeout = match lookup("ADVISOR_SESSION_IDLE_MINUTES") {
            Some(minutes) => parse_minutes(&minutes)
                .context("Invalid ADVISOR_SESSION_IDLE_MINUTES")?,
            None => Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
        };

        Ok(Self {
            providers,
            system_message,
            web_ui_path,
            session_idle_timeout,
        })
    }
}

fn provider_config<F>(kind: ProviderKind, lookup: &F) -> Option<ProviderConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup(kind.credential_key())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())?;
    let prefix = kind.env_prefix();
    let api_hostname = lookup(&format!("{prefix}_HOST"))
        .unwrap_or_else(|| kind.default_hostname().to_string());
    let models = lookup(&format!("{prefix}_MODELS"))
        .map(|s| parse_models(&s))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| kind.default_models().iter().map(|m| m.to_string()).collect());

    Some(ProviderConfig {
        kind,
        api_key,
        api_hostname,
        models,
    })
}

fn parse_minutes(s: &str) -> Result<Duration> {
    let minutes: u64 = s.trim().parse()?;
    if minutes == 0 {
        bail!("Idle timeout must be at least one minute");
    }
    Ok(Duration::from_secs(minutes * 60))
}

fn parse_models(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}
