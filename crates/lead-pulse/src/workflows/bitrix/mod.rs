//! Bitrix24 REST access: settings validation, the webhook client and the
//! gateway seam the dashboard service depends on.

pub mod client;
pub mod gateway;
pub mod settings;
mod wire;

pub use client::{BitrixClient, DEFAULT_REQUEST_TIMEOUT};
pub use gateway::{CrmError, CrmGateway};
pub use settings::{
    is_portal_domain, normalize_domain, CrmSettings, MaskedSettings, SettingsError,
    SettingsStore, SettingsStoreError, PORTAL_TLDS,
};
