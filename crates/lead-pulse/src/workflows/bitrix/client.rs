use super::gateway::{CrmError, CrmGateway};
use super::settings::CrmSettings;
use super::wire::{Envelope, LeadRow, RowError, UserRow};
use crate::workflows::leads::domain::{Lead, Operator};
use crate::workflows::leads::period::DateRange;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `crm.lead.list` pages are 50 records; stop following `next` after this many.
const MAX_LEAD_PAGES: usize = 40;
const ERROR_BODY_LIMIT: usize = 512;
const FILTER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const LEAD_FIELDS: [&str; 6] = [
    "ID",
    "TITLE",
    "STATUS_ID",
    "ASSIGNED_BY_ID",
    "DATE_CREATE",
    "DATE_MODIFY",
];
const USER_FIELDS: [&str; 8] = [
    "ID",
    "NAME",
    "LAST_NAME",
    "WORK_DEPARTMENT",
    "WORK_POSITION",
    "IS_ONLINE",
    "LAST_ACTIVITY_DATE",
    "ACTIVE",
];

/// REST client for a Bitrix24 portal inbound webhook.
///
/// Built only from validated [`CrmSettings`], so no request is ever sent to a
/// host that fails the portal domain check.
#[derive(Debug, Clone)]
pub struct BitrixClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
}

impl BitrixClient {
    pub fn new(settings: &CrmSettings) -> Result<Self, CrmError> {
        Self::with_timeout(settings, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(settings: &CrmSettings, timeout: Duration) -> Result<Self, CrmError> {
        let settings = settings.validated()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: settings.base_url(),
            user_id: settings.user_id,
        })
    }

    /// Point the client at a local mock server.
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Envelope, CrmError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), method);
        debug!(method, "calling Bitrix24");

        let response = self.http.post(&url).json(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CrmError::Http {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|err| CrmError::Decode(err.to_string()))?;

        if let Some(code) = envelope.error.clone() {
            return Err(CrmError::Application {
                code,
                description: envelope.error_description.clone().unwrap_or_default(),
            });
        }

        Ok(envelope)
    }

    fn lead_list_params(&self, range: &DateRange, start: u64) -> Value {
        let mut filter = Map::new();
        if let Some(from) = range.from {
            filter.insert(">=DATE_CREATE".into(), json!(filter_timestamp(from)));
        }
        if let Some(to) = range.to {
            filter.insert("<=DATE_CREATE".into(), json!(filter_timestamp(to)));
        }
        if let Some(user_id) = &self.user_id {
            filter.insert("ASSIGNED_BY_ID".into(), json!(user_id));
        }

        json!({
            "select": LEAD_FIELDS,
            "filter": filter,
            "order": { "DATE_CREATE": "DESC" },
            "start": start,
        })
    }
}

#[async_trait]
impl CrmGateway for BitrixClient {
    async fn fetch_leads(&self, range: DateRange) -> Result<Vec<Lead>, CrmError> {
        let mut leads = Vec::new();
        let mut start = 0;

        for _ in 0..MAX_LEAD_PAGES {
            let envelope = self
                .call("crm.lead.list", self.lead_list_params(&range, start))
                .await?;
            let rows = result_rows(envelope.result)?;
            leads.extend(rows.into_iter().filter_map(|row| {
                LeadRow::from_value(row)
                    .and_then(LeadRow::into_lead)
                    .map_err(|err| log_rejected("lead", &err))
                    .ok()
            }));

            match envelope.next {
                Some(next) if next > start => start = next,
                _ => {
                    info!(count = leads.len(), total = ?envelope.total, "fetched Bitrix24 leads");
                    return Ok(leads);
                }
            }
        }

        warn!(
            count = leads.len(),
            pages = MAX_LEAD_PAGES,
            "stopped paging crm.lead.list at page limit"
        );
        Ok(leads)
    }

    async fn fetch_users(&self) -> Result<Vec<Operator>, CrmError> {
        let params = json!({
            "filter": { "ACTIVE": true },
            "select": USER_FIELDS,
        });
        let envelope = self.call("user.get", params).await?;
        let operators: Vec<Operator> = result_rows(envelope.result)?
            .into_iter()
            .filter_map(|row| {
                UserRow::from_value(row)
                    .and_then(UserRow::into_operator)
                    .map_err(|err| log_rejected("user", &err))
                    .ok()
            })
            .collect();

        info!(count = operators.len(), "fetched Bitrix24 users");
        Ok(operators)
    }
}

fn result_rows(result: Option<Value>) -> Result<Vec<Value>, CrmError> {
    match result {
        Some(Value::Array(rows)) => Ok(rows),
        Some(other) => Err(CrmError::Decode(format!(
            "expected a list result, got {}",
            kind_of(&other)
        ))),
        None => Err(CrmError::Decode(
            "response carried neither result nor error".to_string(),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn log_rejected(kind: &'static str, err: &RowError) {
    warn!(kind, error = %err, "skipping malformed Bitrix24 record");
}

fn filter_timestamp(value: NaiveDateTime) -> String {
    value.format(FILTER_TIMESTAMP_FORMAT).to_string()
}

fn truncate(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(limit).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::bitrix::settings::SettingsError;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> CrmSettings {
        CrmSettings::new("acme.bitrix24.ru", "1/token", None)
    }

    fn client(server: &MockServer) -> BitrixClient {
        BitrixClient::new(&settings())
            .expect("client builds")
            .with_base_url(server.uri())
    }

    #[test]
    fn refuses_to_build_for_foreign_domains() {
        let err = BitrixClient::new(&CrmSettings::new("crm.example.com", "1/token", None))
            .expect_err("invalid domain");
        assert!(matches!(
            err,
            CrmError::InvalidSettings(SettingsError::InvalidDomain(_))
        ));
    }

    #[test]
    fn base_url_uses_the_webhook_path() {
        let client = BitrixClient::new(&settings()).expect("client builds");
        assert_eq!(client.base_url(), "https://acme.bitrix24.ru/rest/1/token");
    }

    #[tokio::test]
    async fn fetch_leads_follows_pagination_and_skips_bad_rows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crm.lead.list"))
            .and(body_partial_json(serde_json::json!({ "start": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    { "ID": "1", "TITLE": "A", "STATUS_ID": "IN_PROCESS", "ASSIGNED_BY_ID": "7",
                      "DATE_CREATE": "2025-03-14T10:00:00+03:00" },
                    { "TITLE": "no id" }
                ],
                "next": 50,
                "total": 3
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/crm.lead.list"))
            .and(body_partial_json(serde_json::json!({ "start": 50 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    { "ID": 3, "TITLE": "C", "STATUS_ID": "CONVERTED", "ASSIGNED_BY_ID": null,
                      "DATE_CREATE": "14.03.2025 11:00:00" }
                ],
                "total": 3
            })))
            .mount(&server)
            .await;

        let leads = client(&server)
            .fetch_leads(DateRange::default())
            .await
            .expect("leads fetched");

        let ids: Vec<&str> = leads.iter().map(|lead| lead.id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(leads[1].assigned_operator_id, None);
    }

    #[tokio::test]
    async fn lead_filter_carries_window_and_user() {
        let server = MockServer::start().await;
        let from = NaiveDateTime::parse_from_str("2025-03-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .expect("valid timestamp");

        Mock::given(method("POST"))
            .and(path("/crm.lead.list"))
            .and(body_partial_json(serde_json::json!({
                "filter": { ">=DATE_CREATE": "2025-03-01T00:00:00", "ASSIGNED_BY_ID": "7" },
                "order": { "DATE_CREATE": "DESC" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BitrixClient::new(&CrmSettings::new(
            "acme.bitrix24.ru",
            "1/token",
            Some("7".into()),
        ))
        .expect("client builds")
        .with_base_url(server.uri());

        let leads = client
            .fetch_leads(DateRange::since(from))
            .await
            .expect("leads fetched");
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn http_errors_map_to_http_variant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/user.get"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_users().await.expect_err("503");
        assert!(matches!(err, CrmError::Http { status: 503, ref body } if body == "maintenance"));
    }

    #[tokio::test]
    async fn error_bodies_map_to_application_variant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/user.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "INVALID_CREDENTIALS",
                "error_description": "Invalid request credentials"
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_users().await.expect_err("app error");
        match err {
            CrmError::Application { code, description } => {
                assert_eq!(code, "INVALID_CREDENTIALS");
                assert_eq!(description, "Invalid request credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_bodies_map_to_decode_variant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/user.get"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_users().await.expect_err("not json");
        assert!(matches!(err, CrmError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_portals_map_to_transport_variant() {
        let server = MockServer::start().await;
        let client = client(&server);
        drop(server);

        let err = client.fetch_users().await.expect_err("connection refused");
        assert!(matches!(err, CrmError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/user.get"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(2_000)))
            .mount(&server)
            .await;

        let err = client(&server).fetch_users().await.expect_err("500");
        match err {
            CrmError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_users_requests_active_users() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/user.get"))
            .and(body_partial_json(serde_json::json!({ "filter": { "ACTIVE": true } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": [
                    { "ID": "7", "NAME": "Anna", "LAST_NAME": "Sokolova", "IS_ONLINE": "Y" },
                    { "NAME": "No id" }
                ]
            })))
            .mount(&server)
            .await;

        let operators = client(&server).fetch_users().await.expect("users fetched");
        assert_eq!(operators.len(), 1);
        assert_eq!(operators[0].full_name, "Anna Sokolova");
    }
}
