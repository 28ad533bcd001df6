use crate::error::{ ChatError, Result };
use crate::models::api::{
    extract_detail,
    extract_reply,
    AskRequest,
    Credentials,
    RefreshRequest,
    TokenResponse,
};
use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::header::{ AUTHORIZATION, CONTENT_TYPE };
use reqwest::{ Client as HttpClient, Response };
use serde::Serialize;
use serde_json::Value as JsonValue;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";
const ASK_FAILED: &str = "Failed to get response";

/// Whatever answers chat messages. The dispatcher only sees this seam.
#[async_trait]
pub trait AskBackend: Send + Sync {
    async fn ask(&self, message: &str, access_token: Option<&str>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: HttpClient::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url> {
        Ok(self.base_url.join(route.trim_start_matches('/'))?)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &T,
        bearer: Option<&str>
    ) -> Result<Response> {
        let url = self.endpoint(route)?;
        debug!("POST {}", url);
        let mut req = self.http.post(url).header(CONTENT_TYPE, "application/json").json(body);
        if let Some(token) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(req.send().await?)
    }

    /// Turns a non-success response into `ChatError::Api` carrying the server's `detail` or `fallback`.
    async fn api_error(resp: Response, fallback: &str) -> ChatError {
        let status = resp.status();
        let detail = match resp.json::<JsonValue>().await {
            Ok(body) => extract_detail(&body),
            Err(e) => {
                debug!("Error body for status {} was not JSON: {}", status, e);
                None
            }
        };
        warn!("API request failed with status {}", status);
        ChatError::Api(detail.unwrap_or_else(|| fallback.to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let resp = self.post_json("login", &Credentials { email, password }, None).await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, LOGIN_FAILED).await);
        }
        let tokens = resp.json::<TokenResponse>().await?;
        info!("Logged in as {}", email);
        Ok(tokens)
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<()> {
        let resp = self.post_json("signup", &Credentials { email, password }, None).await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, SIGNUP_FAILED).await);
        }
        info!("Created account for {}", email);
        Ok(())
    }

    /// A rejected refresh token comes back as `SessionExpired`; transport failures stay `Http`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let resp = self.post_json("refresh", &RefreshRequest { refresh_token }, None).await?;
        if !resp.status().is_success() {
            warn!("Token refresh rejected with status {}", resp.status());
            return Err(ChatError::SessionExpired);
        }
        Ok(resp.json::<TokenResponse>().await?)
    }
}

#[async_trait]
impl AskBackend for ApiClient {
    async fn ask(&self, message: &str, access_token: Option<&str>) -> Result<String> {
        let resp = self.post_json("ask", &AskRequest { message }, access_token).await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, ASK_FAILED).await);
        }
        let body = resp.json::<JsonValue>().await?;
        Ok(extract_reply(&body))
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
