mod token;

pub use token::{ decode_payload, user_label, DEFAULT_USER_LABEL };

use crate::api::ApiClient;
use crate::error::{ ChatError, Result };
use crate::models::api::TokenResponse;
use crate::storage::{ LocalStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_TYPE_KEY };
use log::{ info, warn };
use std::sync::Arc;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const NO_REFRESH_TOKEN: &str = "No refresh token available";

/// Decides access from the presence of a stored access token. The token is never verified.
#[derive(Clone)]
pub struct AuthGate {
    storage: Arc<dyn LocalStorage>,
}

impl AuthGate {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get_item(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn require_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ChatError::Unauthenticated)
        }
    }

    /// `"<token_type> <access_token>"`, with the type defaulting to `Bearer`.
    pub fn auth_header(&self) -> Option<String> {
        let token = self.access_token()?;
        let token_type = self.storage
            .get_item(TOKEN_TYPE_KEY)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Some(format!("{} {}", token_type, token))
    }

    pub fn user_label(&self) -> String {
        match self.access_token() {
            Some(token) => user_label(&token),
            None => DEFAULT_USER_LABEL.to_string(),
        }
    }

    pub fn store_tokens(&self, tokens: &TokenResponse) -> Result<()> {
        self.storage.set_item(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        match &tokens.token_type {
            Some(token_type) => self.storage.set_item(TOKEN_TYPE_KEY, token_type)?,
            None => self.storage.remove_item(TOKEN_TYPE_KEY)?,
        }
        match &tokens.refresh_token {
            Some(refresh_token) => self.storage.set_item(REFRESH_TOKEN_KEY, refresh_token)?,
            None => self.storage.remove_item(REFRESH_TOKEN_KEY)?,
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(ACCESS_TOKEN_KEY)?;
        self.storage.remove_item(TOKEN_TYPE_KEY)?;
        self.storage.remove_item(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    fn refresh_token(&self) -> Option<String> {
        self.storage.get_item(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }
}

/// Login, signup, refresh and logout against the remote API, keeping stored credentials in step.
pub struct AuthService {
    api: ApiClient,
    gate: AuthGate,
}

impl AuthService {
    pub fn new(api: ApiClient, gate: AuthGate) -> Self {
        Self { api, gate }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let tokens = self.api.login(email, password).await?;
        self.gate.store_tokens(&tokens)
    }

    pub async fn signup(&self, email: &str, password: &str, confirm_password: &str) -> Result<()> {
        if password != confirm_password {
            return Err(ChatError::Validation(PASSWORD_MISMATCH.to_string()));
        }
        self.api.signup(email, password).await
    }

    /// Exchanges the refresh token for new credentials. A rejected refresh logs the user out.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = self.gate
            .refresh_token()
            .ok_or_else(|| ChatError::Validation(NO_REFRESH_TOKEN.to_string()))?;

        match self.api.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.gate.store_tokens(&tokens)?;
                info!("Access token refreshed");
                Ok(())
            }
            Err(ChatError::SessionExpired) => {
                warn!("Refresh token rejected, clearing stored credentials");
                self.gate.clear()?;
                Err(ChatError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.gate.clear()?;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server;
    use crate::storage::MemoryStorage;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{ Json, Router };
    use serde_json::{ json, Value as JsonValue };

    fn gate() -> (AuthGate, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (AuthGate::new(storage.clone()), storage)
    }

    fn tokens(access: &str) -> TokenResponse {
        TokenResponse {
            access_token: access.to_string(),
            token_type: Some("bearer".to_string()),
            refresh_token: Some(format!("{}-refresh", access)),
        }
    }

    #[test]
    fn test_gate_requires_a_non_empty_token() {
        let (gate, storage) = gate();
        assert!(!gate.is_authenticated());
        assert!(matches!(gate.require_authenticated(), Err(ChatError::Unauthenticated)));

        storage.set_item(ACCESS_TOKEN_KEY, "").unwrap();
        assert!(!gate.is_authenticated());

        storage.set_item(ACCESS_TOKEN_KEY, "abc").unwrap();
        assert!(gate.require_authenticated().is_ok());
    }

    #[test]
    fn test_auth_header_defaults_to_bearer() {
        let (gate, storage) = gate();
        assert_eq!(gate.auth_header(), None);

        storage.set_item(ACCESS_TOKEN_KEY, "abc").unwrap();
        assert_eq!(gate.auth_header().as_deref(), Some("Bearer abc"));

        storage.set_item(TOKEN_TYPE_KEY, "token").unwrap();
        assert_eq!(gate.auth_header().as_deref(), Some("token abc"));
    }

    #[test]
    fn test_clear_removes_all_credentials() {
        let (gate, storage) = gate();
        gate.store_tokens(&tokens("abc")).unwrap();
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("abc-refresh"));

        gate.clear().unwrap();
        for key in [ACCESS_TOKEN_KEY, TOKEN_TYPE_KEY, REFRESH_TOKEN_KEY] {
            assert!(storage.get_item(key).is_none());
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_mismatched_passwords_locally() {
        let (gate, _) = gate();
        // Nothing listens here; a request would fail with a transport error instead.
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let service = AuthService::new(api, gate);

        let err = service.signup("a@b.c", "one", "two").await.unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_MISMATCH);
    }

    #[tokio::test]
    async fn test_login_stores_credentials() {
        let app = Router::new().route(
            "/login",
            post(|Json(body): Json<JsonValue>| async move {
                Json(
                    json!({
                    "access_token": format!("tok-{}", body["email"].as_str().unwrap_or("")),
                    "token_type": "bearer",
                    "refresh_token": "r1",
                })
                )
            })
        );
        let base = test_server::spawn(app).await;
        let (gate, storage) = gate();
        let service = AuthService::new(ApiClient::new(&base).unwrap(), gate);

        service.login("dana@example.com", "pw").await.unwrap();
        assert!(service.gate().is_authenticated());
        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("tok-dana@example.com"));
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_credentials() {
        let app = Router::new().route("/refresh", post(|| async { StatusCode::UNAUTHORIZED }));
        let base = test_server::spawn(app).await;
        let (gate, storage) = gate();
        gate.store_tokens(&tokens("old")).unwrap();
        let service = AuthService::new(ApiClient::new(&base).unwrap(), gate);

        let err = service.refresh().await.unwrap_err();
        assert!(matches!(err, ChatError::SessionExpired));
        assert!(!service.gate().is_authenticated());
        assert!(storage.get_item(REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_refresh_success_replaces_tokens() {
        let app = Router::new().route(
            "/refresh",
            post(|| async {
                Json(json!({"access_token": "new", "token_type": "bearer", "refresh_token": "r2"}))
            })
        );
        let base = test_server::spawn(app).await;
        let (gate, storage) = gate();
        gate.store_tokens(&tokens("old")).unwrap();
        let service = AuthService::new(ApiClient::new(&base).unwrap(), gate);

        service.refresh().await.unwrap();
        assert_eq!(storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("new"));
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_fast() {
        let (gate, _) = gate();
        let service = AuthService::new(ApiClient::new("http://127.0.0.1:9").unwrap(), gate);
        let err = service.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), NO_REFRESH_TOKEN);
    }
}
