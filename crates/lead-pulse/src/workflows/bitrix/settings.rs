use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level domains Bitrix24 cloud portals are served from.
pub const PORTAL_TLDS: [&str; 14] = [
    "ru", "com", "de", "eu", "es", "fr", "it", "pl", "br", "in", "uk", "ua", "by", "kz",
];

fn portal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(
            r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.bitrix24\.(?:{})$",
            PORTAL_TLDS.join("|")
        );
        Regex::new(&pattern).expect("portal domain pattern compiles")
    })
}

/// Connection settings for a Bitrix24 portal inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmSettings {
    pub domain: String,
    /// Inbound webhook path as issued by Bitrix24, `<user>/<token>`.
    pub webhook: String,
    /// Restricts lead reads to one assignee when set.
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl CrmSettings {
    pub fn new(
        domain: impl Into<String>,
        webhook: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            webhook: webhook.into(),
            user_id,
        }
    }

    /// Normalise and check the settings. The returned copy has a bare
    /// lowercase host, a webhook path without surrounding slashes, and no
    /// blank user filter.
    pub fn validated(&self) -> Result<Self, SettingsError> {
        let domain = normalize_domain(&self.domain);
        if !is_portal_domain(&domain) {
            return Err(SettingsError::InvalidDomain(self.domain.trim().to_string()));
        }

        let webhook = self.webhook.trim().trim_matches('/').to_string();
        if webhook.is_empty() {
            return Err(SettingsError::MissingWebhook);
        }

        let user_id = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self {
            domain,
            webhook,
            user_id,
        })
    }

    pub fn base_url(&self) -> String {
        format!("https://{}/rest/{}", self.domain, self.webhook)
    }

    /// Public view with the webhook secret reduced to its last characters.
    pub fn masked(&self) -> MaskedSettings {
        let visible: String = {
            let chars: Vec<char> = self.webhook.chars().collect();
            let start = chars.len().saturating_sub(4);
            chars[start..].iter().collect()
        };
        MaskedSettings {
            configured: true,
            domain: self.domain.clone(),
            webhook: format!("****{visible}"),
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedSettings {
    pub configured: bool,
    pub domain: String,
    pub webhook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("'{0}' is not a Bitrix24 portal domain (expected <portal>.bitrix24.<tld>)")]
    InvalidDomain(String),
    #[error("Bitrix24 webhook path is empty")]
    MissingWebhook,
}

pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_ascii_lowercase()
}

pub fn is_portal_domain(domain: &str) -> bool {
    portal_pattern().is_match(domain)
}

/// JSON file holding the settings saved from the dashboard.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsStoreError {
    #[error("settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved settings; `None` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<CrmSettings>, SettingsStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| SettingsStoreError::Format {
                path: self.path.clone(),
                source,
            })
    }

    pub async fn save(&self, settings: &CrmSettings) -> Result<(), SettingsStoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let body =
            serde_json::to_vec_pretty(settings).map_err(|source| SettingsStoreError::Format {
                path: self.path.clone(),
                source,
            })?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> SettingsStoreError {
        SettingsStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
