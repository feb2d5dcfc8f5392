use crate::domain::alert::AlertRule;
use crate::domain::folder::Folder;
use crate::domain::ToJsonData;
use crate::utils::error::{GritError, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

const PROVENANCE_HEADER: &str = "X-Disable-Provenance";

#[derive(Debug, Deserialize)]
struct FolderEntry {
    uid: String,
    title: String,
}

/// Minimal client for the Grafana HTTP API endpoints `grit publish` needs.
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl GrafanaClient {
    pub fn new(url: &str, token: Option<String>) -> Result<Self> {
        // A trailing slash keeps sub-path installs (https://host/grafana) intact on join.
        let normalized = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| GritError::InvalidConfigValueError {
            field: "grafana.url".to_string(),
            value: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: Client::new(),
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| GritError::InvalidConfigValueError {
                field: "grafana.url".to_string(),
                value: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn check(endpoint: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("Grafana {} responded {}", endpoint, status);
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GritError::GrafanaApiError {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        })
    }

    /// Returns the uid of the folder titled `folder.title`, creating it when
    /// Grafana has none.
    pub async fn ensure_folder(&self, folder: &Folder) -> Result<String> {
        let endpoint = "api/folders";
        let response = self
            .request(Method::GET, endpoint)?
            .query(&[("limit", "1000")])
            .send()
            .await?;
        let existing: Vec<FolderEntry> = Self::check(endpoint, response).await?.json().await?;

        if let Some(found) = existing.into_iter().find(|f| f.title == folder.title) {
            tracing::debug!("Folder '{}' exists with uid {}", folder.title, found.uid);
            return Ok(found.uid);
        }

        let mut body = json!({ "title": folder.title });
        if let Some(uid) = &folder.uid {
            body["uid"] = json!(uid);
        }
        let response = self
            .request(Method::POST, endpoint)?
            .json(&body)
            .send()
            .await?;
        let created: FolderEntry = Self::check(endpoint, response).await?.json().await?;
        tracing::info!("Created folder '{}' ({})", created.title, created.uid);
        Ok(created.uid)
    }

    pub async fn upload_dashboard(
        &self,
        dashboard: &Value,
        folder_uid: &str,
        overwrite: bool,
    ) -> Result<Value> {
        let endpoint = "api/dashboards/db";
        let body = json!({
            "dashboard": dashboard,
            "folderUid": folder_uid,
            "message": "Published by grit",
            "overwrite": overwrite,
        });
        let response = self
            .request(Method::POST, endpoint)?
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(endpoint, response).await?.json().await?)
    }

    /// Creates or replaces one alert rule through the provisioning API.
    pub async fn upload_alert_rule(
        &self,
        rule: &AlertRule,
        folder_uid: &str,
        group: &str,
    ) -> Result<()> {
        let mut body = rule.to_json_data();
        body["folderUID"] = json!(folder_uid);
        body["ruleGroup"] = json!(group);
        body["orgID"] = json!(1);

        let update = format!("api/v1/provisioning/alert-rules/{}", rule.uid);
        let response = self
            .request(Method::PUT, &update)?
            .header(PROVENANCE_HEADER, "true")
            .json(&body)
            .send()
            .await?;
        if response.status() != StatusCode::NOT_FOUND {
            Self::check(&update, response).await?;
            return Ok(());
        }

        tracing::debug!("Alert rule {} not found, creating it", rule.uid);
        let create = "api/v1/provisioning/alert-rules";
        let response = self
            .request(Method::POST, create)?
            .header(PROVENANCE_HEADER, "true")
            .json(&body)
            .send()
            .await?;
        Self::check(create, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertState, AlertTrigger, AlertExpression};
    use httpmock::prelude::*;
    use std::collections::BTreeMap;

    fn rule() -> AlertRule {
        AlertRule {
            uid: "abc123".to_string(),
            title: "[PROD] Errors".to_string(),
            triggers: vec![AlertTrigger::Expression(AlertExpression::math("A", "1 > 0"))],
            time_range_from: 300,
            time_range_to: 0,
            annotations: BTreeMap::new(),
            labels: BTreeMap::new(),
            condition: "A".to_string(),
            no_data_state: AlertState::KeepLast,
            exec_err_state: AlertState::Alerting,
            evaluate_for: "5m".to_string(),
            dashboard_uid: None,
            panel_id: None,
            is_paused: false,
        }
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            GrafanaClient::new("not a url", None).unwrap_err(),
            GritError::InvalidConfigValueError { .. }
        ));
    }

    #[test]
    fn test_sub_path_is_kept() {
        let client = GrafanaClient::new("https://example.com/grafana", None).unwrap();
        assert_eq!(client.base_url(), "https://example.com/grafana/");
    }

    #[tokio::test]
    async fn test_ensure_folder_finds_existing() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/folders")
                    .header("Authorization", "Bearer secret");
                then.status(200).json_body(json!([
                    {"id": 1, "uid": "f1", "title": "Other"},
                    {"id": 2, "uid": "f2", "title": "Services"}
                ]));
            })
            .await;

        let client = GrafanaClient::new(&server.base_url(), Some("secret".to_string())).unwrap();
        let uid = client.ensure_folder(&Folder::new("Services")).await.unwrap();

        assert_eq!(uid, "f2");
        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_folder_creates_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/folders");
                then.status(200).json_body(json!([]));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/folders")
                    .json_body(json!({"title": "Services", "uid": "svc"}));
                then.status(200)
                    .json_body(json!({"id": 3, "uid": "svc", "title": "Services"}));
            })
            .await;

        let client = GrafanaClient::new(&server.base_url(), None).unwrap();
        let folder = Folder {
            title: "Services".to_string(),
            uid: Some("svc".to_string()),
        };
        assert_eq!(client.ensure_folder(&folder).await.unwrap(), "svc");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_dashboard_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/dashboards/db");
                then.status(412).body("version-mismatch");
            })
            .await;

        let client = GrafanaClient::new(&server.base_url(), None).unwrap();
        let err = client
            .upload_dashboard(&json!({"uid": "d"}), "f1", false)
            .await
            .unwrap_err();
        match err {
            GritError::GrafanaApiError {
                status,
                endpoint,
                body,
            } => {
                assert_eq!(status, 412);
                assert_eq!(endpoint, "api/dashboards/db");
                assert_eq!(body, "version-mismatch");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_alert_rule_falls_back_to_create() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/v1/provisioning/alert-rules/abc123")
                    .header("X-Disable-Provenance", "true");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/provisioning/alert-rules")
                    .header("X-Disable-Provenance", "true")
                    .body_contains("\"ruleGroup\":\"API\"")
                    .body_contains("\"folderUID\":\"f1\"");
                then.status(201).json_body(json!({"uid": "abc123"}));
            })
            .await;

        let client = GrafanaClient::new(&server.base_url(), None).unwrap();
        client.upload_alert_rule(&rule(), "f1", "API").await.unwrap();

        update.assert_async().await;
        create.assert_async().await;
    }
}
