use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lark_config::LarkConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::models::{ApiEnvelope, InstanceListData, TokenResponse, UserData};

/// Open platform codes meaning the tenant token is invalid or expired.
const TOKEN_ERROR_CODES: &[i64] = &[99991661, 99991663, 99991668];

/// Bearer token for one sync run. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LarkClientError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API error {code}: {msg}")]
    ApiError { code: i64, msg: String },

    #[error("token response has no tenant_access_token: {body}")]
    MissingToken { body: String },

    #[error("response has no data")]
    MissingData,
}

impl LarkClientError {
    /// Whether the remote rejected our credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status == StatusCode::UNAUTHORIZED,
            Self::ApiError { code, .. } => TOKEN_ERROR_CODES.contains(code),
            Self::MissingToken { .. } => true,
            _ => false,
        }
    }
}

/// One page of the instance listing, items not yet validated.
#[derive(Debug, Default)]
pub struct InstancePage {
    pub items: Vec<Value>,
    pub has_more: bool,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct InstanceListRequest<'a> {
    approval_code: &'a str,
    start_time: String,
    end_time: String,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Clone)]
pub struct LarkClient {
    client: Client,
    config: LarkConfig,
}

impl LarkClient {
    pub fn new(config: LarkConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LarkConfig {
        &self.config
    }

    /// Exchange app credentials for a tenant access token.
    pub async fn tenant_access_token(&self) -> Result<AccessToken, LarkClientError> {
        let url = format!(
            "{}/auth/v3/tenant_access_token/internal",
            self.config.base_url
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LarkClientError::HttpError { status, body });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|_| LarkClientError::MissingToken {
                body: body.clone(),
            })?;
        if parsed.code != 0 {
            return Err(LarkClientError::ApiError {
                code: parsed.code,
                msg: parsed.msg,
            });
        }

        match parsed.tenant_access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::debug!(expire = ?parsed.expire, "obtained tenant access token");
                Ok(AccessToken::new(token))
            }
            None => Err(LarkClientError::MissingToken { body }),
        }
    }

    /// Fetch one page of instances of `approval_code` started within `[start, end]`.
    pub async fn list_instances_page(
        &self,
        token: &AccessToken,
        approval_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<InstancePage, LarkClientError> {
        let url = format!("{}/approval/v4/instance/list", self.config.base_url);
        let body = InstanceListRequest {
            approval_code,
            start_time: start.timestamp_millis().to_string(),
            end_time: end.timestamp_millis().to_string(),
            page_size: self.config.page_size,
            page_token,
        };

        let data: Option<InstanceListData> = self
            .send(self.client.post(&url).json(&body), token)
            .await?;

        // No `data` at all means nothing new in the window.
        let data = data.unwrap_or_default();
        Ok(InstancePage {
            items: data.instance_list,
            has_more: data.has_more.unwrap_or(false),
            page_token: data.page_token.filter(|t| !t.is_empty()),
        })
    }

    /// Fetch the full detail of one instance.
    pub async fn get_instance_detail(
        &self,
        token: &AccessToken,
        instance_code: &str,
    ) -> Result<Value, LarkClientError> {
        let url = format!(
            "{}/approval/v4/instances/{}",
            self.config.base_url, instance_code
        );
        self.send::<Value>(self.client.get(&url), token)
            .await?
            .ok_or(LarkClientError::MissingData)
    }

    /// Fetch a contact user by tenant `user_id`.
    pub async fn get_user(&self, token: &AccessToken, user_id: &str) -> Result<Value, LarkClientError> {
        let url = format!("{}/contact/v3/users/{}", self.config.base_url, user_id);
        let data: Option<UserData> = self
            .send(
                self.client.get(&url).query(&[("user_id_type", "user_id")]),
                token,
            )
            .await?;
        data.map(|d| d.user).ok_or(LarkClientError::MissingData)
    }

    /// Send an authorized request and unwrap the `{code, msg, data}` envelope.
    /// No retries: a failed call is reported to the caller as-is.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
    ) -> Result<Option<T>, LarkClientError> {
        let response = request.bearer_auth(token.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Token failures come back as HTTP 4xx with the open platform code in the body.
            if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<Value>>(&body) {
                if TOKEN_ERROR_CODES.contains(&envelope.code) {
                    return Err(LarkClientError::ApiError {
                        code: envelope.code,
                        msg: envelope.msg,
                    });
                }
            }
            return Err(LarkClientError::HttpError { status, body });
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(LarkClientError::ApiError {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LarkClient {
        LarkClient::new(LarkConfig::for_base_url(&server.uri())).unwrap()
    }

    #[tokio::test]
    async fn token_is_returned_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal"))
            .and(body_partial_json(serde_json::json!({
                "app_id": "cli_test",
                "app_secret": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": "t-abc",
                "expire": 7200
            })))
            .mount(&server)
            .await;

        let token = client_for(&server).tenant_access_token().await.unwrap();
        assert_eq!(token.as_str(), "t-abc");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[tokio::test]
    async fn token_missing_from_body_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 0, "msg": "ok" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).tenant_access_token().await.unwrap_err();
        assert!(matches!(err, LarkClientError::MissingToken { .. }));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn token_rejected_credentials_surface_api_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v3/tenant_access_token/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 10014,
                "msg": "app secret invalid"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).tenant_access_token().await.unwrap_err();
        assert!(matches!(err, LarkClientError::ApiError { code: 10014, .. }));
    }

    #[tokio::test]
    async fn list_page_sends_window_and_token() {
        let server = MockServer::start().await;
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();

        Mock::given(method("POST"))
            .and(path("/approval/v4/instance/list"))
            .and(header("authorization", "Bearer t-abc"))
            .and(body_partial_json(serde_json::json!({
                "approval_code": "A-1",
                "start_time": start.timestamp_millis().to_string(),
                "end_time": end.timestamp_millis().to_string(),
                "page_size": 50,
                "page_token": "tok2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {
                    "instance_list": [
                        { "instance_code": "I-1", "status": "PENDING", "start_time": "1735689600000" }
                    ],
                    "has_more": true,
                    "page_token": "tok3"
                }
            })))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_instances_page(&AccessToken::new("t-abc"), "A-1", start, end, Some("tok2"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
        assert_eq!(page.page_token.as_deref(), Some("tok3"));
    }

    #[tokio::test]
    async fn list_page_without_data_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approval/v4/instance/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 0, "msg": "success" })),
            )
            .mount(&server)
            .await;

        let now = Utc::now();
        let page = client_for(&server)
            .list_instances_page(&AccessToken::new("t"), "A-1", now, now, None)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert!(page.page_token.is_none());
    }

    #[tokio::test]
    async fn non_zero_code_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/approval/v4/instances/I-404"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 1390001,
                "msg": "instance not found"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_instance_detail(&AccessToken::new("t"), "I-404")
            .await
            .unwrap_err();
        assert!(matches!(err, LarkClientError::ApiError { code: 1390001, .. }));
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn expired_token_code_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact/v3/users/u1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 99991663,
                "msg": "Invalid access token for authorization"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_user(&AccessToken::new("t"), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, LarkClientError::ApiError { code: 99991663, .. }));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn get_user_unwraps_user_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact/v3/users/u1"))
            .and(query_param("user_id_type", "user_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": { "user": { "user_id": "u1", "name": "Wu Qian" } }
            })))
            .mount(&server)
            .await;

        let user = client_for(&server)
            .get_user(&AccessToken::new("t"), "u1")
            .await
            .unwrap();
        assert_eq!(user["name"], "Wu Qian");
    }

    #[tokio::test]
    async fn http_500_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/approval/v4/instances/I-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_instance_detail(&AccessToken::new("t"), "I-1")
            .await
            .unwrap_err();
        match err {
            LarkClientError::HttpError { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
