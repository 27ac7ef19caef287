use super::settings::SettingsError;
use crate::workflows::leads::domain::{Lead, Operator};
use crate::workflows::leads::period::DateRange;
use async_trait::async_trait;

/// Read access to the CRM. Implemented by the Bitrix24 REST client and by
/// test doubles.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    async fn fetch_leads(&self, range: DateRange) -> Result<Vec<Lead>, CrmError>;
    async fn fetch_users(&self) -> Result<Vec<Operator>, CrmError>;
}

/// Reasons a CRM read did not produce data. Every variant sends the
/// dashboard into demo mode.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("Bitrix24 connection is not configured")]
    ConfigurationMissing,
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error("Bitrix24 request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Bitrix24 returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Bitrix24 error {code}: {description}")]
    Application { code: String, description: String },
    #[error("unable to decode Bitrix24 response: {0}")]
    Decode(String),
}
