//! Bitrix24 lead statistics for the operator dashboard.
//!
//! Leads and operators are pulled from a Bitrix24 portal, classified into the
//! three pipeline stages the dashboard tracks, and rolled up per operator and
//! per day. When the portal is unreachable or not configured the pipeline runs
//! on synthetic demo data and flags the result accordingly.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
