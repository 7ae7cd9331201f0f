use std::{
    fmt,
    future::Future,
};

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    errors::{
        ClientError,
        ClientResult,
    },
    snapshot::{
        Snapshot,
        TransactionRequest,
    },
};

pub const CHAIN_PATH: &str = "/api/chain";
pub const MINE_PATH: &str = "/api/mine";

/// How the server answered a mining request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    /// Any `2xx` status.
    Accepted,
    /// `403` with the server's `error` text.
    Rejected(String),
    /// Anything else. The transaction may or may not have been mined.
    Unknown(u16),
}

impl MineOutcome {
    /// Maps a response status to an outcome. `rejection` reads the server's
    /// reason and is only called for `403`.
    pub fn from_status(
        status: StatusCode,
        rejection: impl FnOnce() -> ClientResult<String>,
    ) -> ClientResult<Self> {
        if status == StatusCode::FORBIDDEN {
            return rejection().map(MineOutcome::Rejected);
        }
        if status.is_success() {
            Ok(MineOutcome::Accepted)
        } else {
            Ok(MineOutcome::Unknown(status.as_u16()))
        }
    }
}

/// The two endpoints of the ledger service this client consumes.
pub trait LedgerApi: Clone + Send + Sync + 'static {
    fn fetch_snapshot(&self) -> impl Future<Output = ClientResult<Snapshot>> + Send;

    fn mine(
        &self,
        request: &TransactionRequest,
    ) -> impl Future<Output = ClientResult<MineOutcome>> + Send;
}

#[derive(Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct RejectionDto {
    error: String,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build().map_err(|e| {
            ClientError::Connectivity(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl LedgerApi for HttpLedgerClient {
    async fn fetch_snapshot(&self) -> ClientResult<Snapshot> {
        let url = self.endpoint(CHAIN_PATH);
        let res = self.http.get(&url).send().await.map_err(|e| {
            ClientError::Connectivity(format!("GET {url} failed: {e}"))
        })?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| {
            ClientError::Connectivity(format!("failed to read snapshot body: {e}"))
        })?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(ClientError::Connectivity(format!(
                "ledger responded with {status} when fetching the chain: {body}"
            )));
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::Connectivity(format!("invalid snapshot payload: {e}"))
        })
    }

    async fn mine(&self, request: &TransactionRequest) -> ClientResult<MineOutcome> {
        let url = self.endpoint(MINE_PATH);
        let res = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(format!("POST {url} failed: {e}")))?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| {
            ClientError::Connectivity(format!("failed to read mine response body: {e}"))
        })?;
        MineOutcome::from_status(status, || {
            serde_json::from_slice::<RejectionDto>(&bytes)
                .map(|dto| dto.error)
                .map_err(|e| {
                    ClientError::Connectivity(format!("invalid rejection payload: {e}"))
                })
        })
    }
}

impl fmt::Display for HttpLedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn no_reason() -> ClientResult<String> {
        panic!("rejection body should only be read for 403")
    }

    #[test]
    fn from_status__2xx__is_accepted() {
        for status in [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT] {
            assert_eq!(
                MineOutcome::from_status(status, no_reason),
                Ok(MineOutcome::Accepted)
            );
        }
    }

    #[test]
    fn from_status__403__is_rejected_with_reason() {
        // when
        let outcome = MineOutcome::from_status(StatusCode::FORBIDDEN, || {
            Ok("User Blacklisted".to_string())
        });

        // then
        assert_eq!(outcome, Ok(MineOutcome::Rejected("User Blacklisted".to_string())));
    }

    #[test]
    fn from_status__403_with_malformed_body__is_connectivity_error() {
        let outcome = MineOutcome::from_status(StatusCode::FORBIDDEN, || {
            Err(ClientError::Connectivity("invalid rejection payload".to_string()))
        });

        assert!(matches!(outcome, Err(ClientError::Connectivity(_))));
    }

    #[test]
    fn from_status__other_statuses__are_unknown_not_accepted() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NOT_FOUND,
            StatusCode::BAD_REQUEST,
            StatusCode::MOVED_PERMANENTLY,
        ] {
            assert_eq!(
                MineOutcome::from_status(status, no_reason),
                Ok(MineOutcome::Unknown(status.as_u16()))
            );
        }
    }

    #[test]
    fn new__trims_trailing_slash() {
        let client = HttpLedgerClient::new("http://localhost:8000/").unwrap();

        assert_eq!(client.endpoint(CHAIN_PATH), "http://localhost:8000/api/chain");
    }
}
