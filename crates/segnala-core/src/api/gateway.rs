//! The single chokepoint for backend traffic.
//!
//! Every outbound call goes through [`ApiGateway::request`]: it attaches the
//! bearer token when a session exists and normalizes every outcome into
//! [`GatewayError`]. On 401/403 the session is ended before the error is
//! returned, so a request issued after the failure can never reuse the stale
//! token. Pages never read storage or the token themselves.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionManager;
use crate::models::{Identity, Role};

use super::GatewayError;

/// HTTP request timeout in seconds.
/// Long enough for a slow backend, short enough to fail usably.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The one public route the core itself calls.
const LOGIN_PATH: &str = "/auth/login";

/// Login response: the token plus the identity fields, flat.
#[derive(Debug, Deserialize)]
struct LoginGrant {
    token: String,
    id: i64,
    email: String,
    role: Role,
    #[serde(rename = "clienteId", default)]
    cliente_id: Option<i64>,
}

/// Gateway to the segnala backend.
/// Clone is cheap - reqwest::Client shares its connection pool via Arc.
#[derive(Clone)]
pub struct ApiGateway {
    http: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiGateway {
    /// Build a gateway over an already-validated base URL (see
    /// [`Config::backend_base`](crate::config::Config::backend_base)).
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<SessionManager>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Issue a request against a backend-relative path (starting with `/`).
    ///
    /// Returns the decoded JSON payload, or `None` for a 2xx response with an
    /// empty or non-JSON body. Anonymous sessions still issue the request
    /// without a credential (some routes are public); gating protected views
    /// is the guard's job, earlier, at the navigation layer.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, GatewayError> {
        debug_assert!(path.starts_with('/'), "backend paths are absolute: {path}");
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "Dispatching API request");

        let mut builder = self.http.request(method, &url);
        if let Some(token) = self.session.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let error = GatewayError::from_status(status, &body_text);
            if error == GatewayError::Auth {
                // Invalidate before returning: the next request must already
                // see an anonymous session.
                warn!(status = status.as_u16(), path, "Credential rejected, ending session");
                self.session.logout();
            }
            return Err(error);
        }

        let body_text = response.text().await?;
        if body_text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&body_text) {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                // A non-JSON 2xx body counts as "no content", not a failure.
                debug!(path, "2xx body is not JSON, treating as no content");
                Ok(None)
            }
        }
    }

    /// Authenticate and establish the session. Goes through the same
    /// normalization as every other call: a rejected login surfaces as
    /// [`GatewayError::Auth`] with the (already anonymous) session untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, GatewayError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let payload = self.request(Method::POST, LOGIN_PATH, Some(&body)).await?;
        let grant: LoginGrant = Self::decode(LOGIN_PATH, payload)?;

        let identity = Identity {
            id: grant.id,
            email: grant.email,
            role: grant.role,
            cliente_id: grant.cliente_id,
        };
        self.session.login(grant.token, identity.clone());
        Ok(identity)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let payload = self.request(Method::GET, path, None).await?;
        Self::decode(path, payload)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let body = Self::encode(path, body)?;
        let payload = self.request(Method::POST, path, Some(&body)).await?;
        Self::decode(path, payload)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let body = Self::encode(path, body)?;
        let payload = self.request(Method::PUT, path, Some(&body)).await?;
        Self::decode(path, payload)
    }

    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    fn encode<B: Serialize>(path: &str, body: &B) -> Result<Value, GatewayError> {
        serde_json::to_value(body)
            .map_err(|e| GatewayError::Network(format!("failed to encode body for {}: {}", path, e)))
    }

    /// Map a payload into the caller's type; `None` decodes as JSON `null`,
    /// so `Option<T>` and `()` targets accept no-content responses.
    fn decode<T: DeserializeOwned>(path: &str, payload: Option<Value>) -> Result<T, GatewayError> {
        serde_json::from_value(payload.unwrap_or(Value::Null))
            .map_err(|e| GatewayError::Network(format!("malformed response from {}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{Credential, CredentialStore, FileStore};
    use tempfile::{tempdir, TempDir};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity(id: i64, role: Role) -> Identity {
        Identity {
            id,
            email: format!("user{}@x.com", id),
            role,
            cliente_id: None,
        }
    }

    fn anonymous_session(dir: &TempDir) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(Box::new(FileStore::new(
            dir.path().to_path_buf(),
        ))))
    }

    fn authenticated_session(dir: &TempDir, token: &str) -> Arc<SessionManager> {
        let store = FileStore::new(dir.path().to_path_buf());
        store
            .save(&Credential::new(token, identity(1, Role::Admin)))
            .unwrap();
        anonymous_session(dir)
    }

    #[tokio::test]
    async fn login_then_request_attaches_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({
                "email": "a@x.com",
                "password": "p"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc",
                "id": 1,
                "email": "a@x.com",
                "role": "admin"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categorie"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = anonymous_session(&dir);
        let gateway = ApiGateway::new(server.uri(), session.clone()).unwrap();

        let who = gateway.login("a@x.com", "p").await.unwrap();
        assert_eq!(who.id, 1);
        assert_eq!(who.role, Role::Admin);
        assert!(session.is_authenticated());

        let categories: Vec<Value> = gateway.get("/categorie").await.unwrap();
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn rejected_login_leaves_session_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = anonymous_session(&dir);
        let gateway = ApiGateway::new(server.uri(), session.clone()).unwrap();

        let err = gateway.login("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(err, GatewayError::Auth);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn unauthorized_response_ends_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segnalazioni"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        assert!(session.is_authenticated());
        let gateway = ApiGateway::new(server.uri(), session.clone()).unwrap();

        let err = gateway.get::<Vec<Value>>("/segnalazioni").await.unwrap_err();
        assert_eq!(err, GatewayError::Auth);
        assert!(!session.is_authenticated());

        // The persisted pair is gone as well.
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn forbidden_response_also_ends_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/utenti/3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session.clone()).unwrap();

        let err = gateway.delete("/utenti/3").await.unwrap_err();
        assert_eq!(err, GatewayError::Auth);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn server_error_passes_through_without_touching_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segnalazioni"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session.clone()).unwrap();

        let err = gateway.get::<Vec<Value>>("/segnalazioni").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Api {
                status: 500,
                body: "db down".to_string(),
            }
        );
        assert!(session.is_authenticated());

        let store = FileStore::new(dir.path().to_path_buf());
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categorie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = anonymous_session(&dir);
        let gateway = ApiGateway::new(server.uri(), session).unwrap();

        let payload = gateway.request(Method::GET, "/categorie", None).await.unwrap();
        assert!(payload.is_some());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn stale_token_is_not_reused_after_invalidation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segnalazioni"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categorie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session).unwrap();

        let _ = gateway.get::<Vec<Value>>("/segnalazioni").await.unwrap_err();
        let _ = gateway
            .request(Method::GET, "/categorie", None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let follow_up = requests
            .iter()
            .find(|r| r.url.path() == "/categorie")
            .expect("follow-up request was issued");
        assert!(!follow_up.headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn empty_success_body_is_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/clienti/9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session).unwrap();

        let payload = gateway.request(Method::DELETE, "/clienti/9", None).await.unwrap();
        assert!(payload.is_none());
        gateway.delete("/clienti/9").await.unwrap();
    }

    #[tokio::test]
    async fn non_json_success_body_is_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session).unwrap();

        let payload = gateway.request(Method::GET, "/export", None).await.unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error_and_keeps_the_session() {
        // Nothing listens on port 1.
        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new("http://127.0.0.1:1", session.clone()).unwrap();

        let err = gateway.get::<Vec<Value>>("/segnalazioni").await.unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn mismatched_payload_shape_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categorie"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"not": "a list"})),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = authenticated_session(&dir, "abc");
        let gateway = ApiGateway::new(server.uri(), session).unwrap();

        let err = gateway.get::<Vec<Value>>("/categorie").await.unwrap_err();
        match err {
            GatewayError::Network(message) => assert!(message.contains("malformed response")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categorie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let session = anonymous_session(&dir);
        let gateway = ApiGateway::new(format!("{}/", server.uri()), session).unwrap();

        let categories: Vec<Value> = gateway.get("/categorie").await.unwrap();
        assert!(categories.is_empty());
    }
}
