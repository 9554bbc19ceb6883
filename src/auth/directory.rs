//! Directory client: the external source of truth for account existence and status.
//!
//! The core only reads from the directory. Searches are case-insensitive partial
//! matches on username or email; callers pick the exact record with
//! [`DirectoryPage::find_exact`].

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info_span, Instrument};
use url::Url;

use crate::APP_USER_AGENT;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 1000;
const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Locked,
    #[serde(other)]
    Unknown,
}

impl AccountStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Locked => "locked",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    #[serde(alias = "user_id")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub status: AccountStatus,
}

impl DirectoryRecord {
    #[must_use]
    pub fn new(username: &str, email: &str, status: AccountStatus) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            status,
        }
    }

    /// Exact, case-insensitive match on username or email.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.username.eq_ignore_ascii_case(name)
            || (!self.email.is_empty() && self.email.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    #[serde(default)]
    pub total: usize,
    #[serde(default, alias = "items", alias = "info")]
    pub records: Vec<DirectoryRecord>,
}

impl DirectoryPage {
    #[must_use]
    pub fn find_exact(&self, name: &str) -> Option<&DirectoryRecord> {
        self.records.iter().find(|record| record.matches(name))
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(String),
    #[error("directory responded with status {0}")]
    Status(u16),
    #[error("directory response could not be decoded: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<DirectoryPage, DirectoryError>;

    /// Exact, case-insensitive lookup on top of the partial search. A page that
    /// may have been truncated before the exact match is searched again with
    /// [`MAX_SEARCH_LIMIT`].
    async fn find_account(&self, name: &str) -> Result<Option<DirectoryRecord>, DirectoryError> {
        let page = self.search(name, DEFAULT_SEARCH_LIMIT).await?;
        if let Some(record) = page.find_exact(name) {
            return Ok(Some(record.clone()));
        }
        let truncated =
            page.total > page.records.len() || page.records.len() >= DEFAULT_SEARCH_LIMIT;
        if !truncated {
            return Ok(None);
        }
        let page = self.search(name, MAX_SEARCH_LIMIT).await?;
        Ok(page.find_exact(name).cloned())
    }
}

/// Directory backed by an HTTP search endpoint: `GET {url}?search=..&limit=..`.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    client: Client,
    search_url: Url,
    token: Option<SecretString>,
}

impl HttpDirectoryClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(search_url: Url, token: Option<SecretString>) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DIRECTORY_TIMEOUT)
            .build()
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            search_url,
            token,
        })
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn search(&self, query: &str, limit: usize) -> Result<DirectoryPage, DirectoryError> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("limit", &limit.to_string());

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let span = info_span!("directory.search", limit);
        async move {
            let response = request
                .send()
                .await
                .map_err(|err| DirectoryError::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(DirectoryError::Status(status.as_u16()));
            }
            let page: DirectoryPage = response
                .json()
                .await
                .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
            debug!(total = page.total, returned = page.records.len(), "directory search");
            Ok(page)
        }
        .instrument(span)
        .await
    }
}

/// In-memory directory, used when no directory URL is configured and in tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    records: RwLock<Vec<DirectoryRecord>>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(records: Vec<DirectoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Change the status of an account. Returns false when the account is unknown.
    pub async fn set_status(&self, username: &str, status: AccountStatus) -> bool {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|record| record.matches(username)) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, username: &str) {
        self.records
            .write()
            .await
            .retain(|record| !record.matches(username));
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn search(&self, query: &str, limit: usize) -> Result<DirectoryPage, DirectoryError> {
        let needle = query.to_lowercase();
        let records = self.records.read().await;
        let matching: Vec<DirectoryRecord> = records
            .iter()
            .filter(|record| {
                record.username.to_lowercase().contains(&needle)
                    || record.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        let total = matching.len();
        Ok(DirectoryPage {
            total,
            records: matching.into_iter().take(limit).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn status_decodes_unknown_values() {
        let record: DirectoryRecord =
            serde_json::from_value(json!({"user_id": "a", "status": "archived"})).unwrap();
        assert_eq!(record.status, AccountStatus::Unknown);
        assert!(!record.status.is_active());
    }

    #[test]
    fn find_exact_ignores_partial_matches() {
        let page = DirectoryPage {
            total: 2,
            records: vec![
                DirectoryRecord::new("alice.smith", "alice.smith@example.com", AccountStatus::Active),
                DirectoryRecord::new("alice", "Alice@Example.com", AccountStatus::Locked),
            ],
        };
        let found = page.find_exact("alice@example.com").unwrap();
        assert_eq!(found.username, "alice");
        assert!(page.find_exact("ali").is_none());
    }

    fn crowded_directory() -> StaticDirectory {
        let mut records: Vec<DirectoryRecord> = (0..15)
            .map(|i| DirectoryRecord::new(&format!("al{i}"), "", AccountStatus::Active))
            .collect();
        records.push(DirectoryRecord::new("al", "al@example.com", AccountStatus::Active));
        StaticDirectory::new(records)
    }

    #[tokio::test]
    async fn find_account_looks_past_a_truncated_page() {
        let directory = crowded_directory();
        let page = directory.search("al", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert!(page.find_exact("al").is_none());

        let record = directory.find_account("al").await.unwrap().unwrap();
        assert_eq!(record.email, "al@example.com");
        assert!(directory.find_account("al99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn static_directory_partial_search_and_status_change() {
        let directory = StaticDirectory::new(vec![
            DirectoryRecord::new("alice@example.com", "alice@example.com", AccountStatus::Active),
            DirectoryRecord::new("bob@example.com", "bob@example.com", AccountStatus::Active),
        ]);
        let page = directory.search("ALICE", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(page.total, 1);

        assert!(directory.set_status("alice@example.com", AccountStatus::Locked).await);
        assert!(!directory.set_status("carol@example.com", AccountStatus::Locked).await);
        let page = directory.search("alice", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(page.records[0].status, AccountStatus::Locked);

        directory.remove("bob@example.com").await;
        assert_eq!(directory.search("bob", 10).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn http_directory_sends_query_and_token() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("search", "alice@example.com"))
            .and(query_param("limit", "10"))
            .and(header("authorization", "Bearer dir-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "info": [{"user_id": "alice@example.com", "email": "alice@example.com", "status": "active"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(
            Url::parse(&format!("{}/users", server.uri())).unwrap(),
            Some(SecretString::from("dir-token".to_string())),
        )
        .unwrap();
        let page = client.search("alice@example.com", DEFAULT_SEARCH_LIMIT).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.find_exact("alice@example.com").unwrap().status.is_active());
    }

    #[tokio::test]
    async fn http_directory_maps_error_status() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            HttpDirectoryClient::new(Url::parse(&format!("{}/users", server.uri())).unwrap(), None)
                .unwrap();
        let err = client.search("alice", DEFAULT_SEARCH_LIMIT).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Status(503)));
    }
}
