use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::workflows::bitrix::{CrmError, CrmGateway};
use crate::workflows::leads::domain::{Lead, LeadId, Operator, OperatorId, Stage};
use crate::workflows::leads::period::DateRange;

pub(super) fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

pub(super) fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

pub(super) fn lead(id: &str, status: &str, operator: Option<&str>, created_at: &str) -> Lead {
    Lead {
        id: LeadId(id.to_string()),
        title: format!("Lead {id}"),
        status_code: status.to_string(),
        assigned_operator_id: operator.map(|value| OperatorId(value.to_string())),
        created_at: Some(at(created_at)),
        modified_at: Some(at(created_at)),
    }
}

pub(super) fn operator(id: &str, name: &str) -> Operator {
    Operator {
        id: OperatorId(id.to_string()),
        full_name: name.to_string(),
        department: "Recruitment".to_string(),
        is_online: id.len() % 2 == 0,
        last_activity_at: None,
    }
}

/// `count` leads in `stage`, all assigned to `operator`.
pub(super) fn leads_for(operator: &str, stage: Stage, count: usize, created_at: &str) -> Vec<Lead> {
    (0..count)
        .map(|n| {
            lead(
                &format!("{operator}-{n}"),
                stage.status_code(),
                Some(operator),
                created_at,
            )
        })
        .collect()
}

/// Gateway double returning canned data and counting calls.
#[derive(Debug, Default)]
pub(super) struct StaticGateway {
    pub(super) leads: Vec<Lead>,
    pub(super) operators: Vec<Operator>,
    pub(super) lead_calls: AtomicUsize,
    pub(super) user_calls: AtomicUsize,
}

impl StaticGateway {
    pub(super) fn new(leads: Vec<Lead>, operators: Vec<Operator>) -> Self {
        Self {
            leads,
            operators,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CrmGateway for StaticGateway {
    async fn fetch_leads(&self, _range: DateRange) -> Result<Vec<Lead>, CrmError> {
        self.lead_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.leads.clone())
    }

    async fn fetch_users(&self) -> Result<Vec<Operator>, CrmError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.operators.clone())
    }
}

#[async_trait]
impl CrmGateway for Arc<StaticGateway> {
    async fn fetch_leads(&self, range: DateRange) -> Result<Vec<Lead>, CrmError> {
        (**self).fetch_leads(range).await
    }

    async fn fetch_users(&self) -> Result<Vec<Operator>, CrmError> {
        (**self).fetch_users().await
    }
}

/// Gateway double whose lead or user call fails.
#[derive(Debug)]
pub(super) enum FailingGateway {
    Leads,
    Users,
}

#[async_trait]
impl CrmGateway for FailingGateway {
    async fn fetch_leads(&self, _range: DateRange) -> Result<Vec<Lead>, CrmError> {
        match self {
            FailingGateway::Leads => Err(CrmError::Http {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            FailingGateway::Users => Ok(Vec::new()),
        }
    }

    async fn fetch_users(&self) -> Result<Vec<Operator>, CrmError> {
        match self {
            FailingGateway::Leads => Ok(Vec::new()),
            FailingGateway::Users => Err(CrmError::Application {
                code: "ACCESS_DENIED".to_string(),
                description: "Access denied".to_string(),
            }),
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
