//! Typed client for the application's HTTP API.
//!
//! Authentication is cookie based, so the underlying `reqwest` client keeps
//! a cookie store for the lifetime of the `ApiClient`.

pub mod model;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};
pub use model::{Item, LoginResponse, LogoutResponse, Session, SourceResponse, RSS_SPOUT};
use model::SuccessResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str) -> HarnessResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session: Session::Anonymous,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /login
    ///
    /// Rejected credentials are reported through `success`/`error` rather
    /// than as an error, whatever status the application picked.
    pub async fn login(&mut self, username: &str, password: &str) -> HarnessResult<LoginResponse> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let login = match serde_json::from_str::<LoginResponse>(&text) {
            Ok(login) => login,
            Err(_) => return Err(http_error(status, text)),
        };

        if login.success {
            tracing::debug!(username = %username, "Logged in");
            self.session = Session::Authenticated {
                username: username.to_string(),
            };
        } else {
            tracing::debug!(username = %username, error = ?login.error, "Login rejected");
        }
        Ok(login)
    }

    /// GET /logout
    pub async fn logout(&mut self) -> HarnessResult<LogoutResponse> {
        let logout = self
            .send_json::<LogoutResponse>(self.client.get(self.url("/logout")))
            .await?;
        self.session = Session::Anonymous;
        Ok(logout)
    }

    /// GET /items, optionally filtered by a search term
    pub async fn list_items(&self, search: Option<&str>) -> HarnessResult<Vec<Item>> {
        let mut request = self.client.get(self.url("/items"));
        if let Some(term) = search {
            request = request.query(&[("search", term)]);
        }
        self.send_json(request).await
    }

    /// POST /mark/{id} or /unmark/{id}
    pub async fn mark_read(&self, id: i64, read: bool) -> HarnessResult<bool> {
        let endpoint = if read { "mark" } else { "unmark" };
        self.toggle(endpoint, id).await
    }

    /// POST /starr/{id} or /unstarr/{id}
    pub async fn mark_starred(&self, id: i64, starred: bool) -> HarnessResult<bool> {
        let endpoint = if starred { "starr" } else { "unstarr" };
        self.toggle(endpoint, id).await
    }

    async fn toggle(&self, endpoint: &str, id: i64) -> HarnessResult<bool> {
        // Some PHP versions choke on empty POST bodies without a form content type.
        let request = self
            .client
            .post(self.url(&format!("/{}/{}", endpoint, id)))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        let response: SuccessResponse = self.send_json(request).await?;
        Ok(response.success)
    }

    /// POST /source with the spout discriminator and its parameters
    pub async fn add_source(
        &self,
        spout: &str,
        params: &[(&str, &str)],
    ) -> HarnessResult<SourceResponse> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("spout", spout));

        self.send_json(self.client.post(self.url("/source")).form(&form))
            .await
    }

    /// GET /update; returns the completion token once every source was fetched
    pub async fn refresh_all(&self) -> HarnessResult<String> {
        let response = self.client.get(self.url("/update")).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?.trim().to_string())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> HarnessResult<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response) -> HarnessResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    tracing::debug!(%status, body = %text, "Request failed");
    Err(http_error(status, text))
}

fn http_error(status: reqwest::StatusCode, text: String) -> HarnessError {
    HarnessError::Http {
        status,
        body: serde_json::from_str(&text).ok(),
        text,
    }
}
