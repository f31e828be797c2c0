//! HTTP download of the three data sources.
//!
//! All network access goes through the `DownloadClient` trait so the
//! application layer and its tests never touch the wire.

use std::fs::File;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::archive::extract_csv_entry;
use crate::error::DecpError;
use crate::store::DataStore;

/// Environment variable holding the Sirene API bearer token. Passed through
/// verbatim when present; downloads work unauthenticated otherwise.
pub const SIRENE_BEARER_ENV: &str = "SIRENE_API_BEARER";

pub trait DownloadClient: Send + Sync {
    fn download_decp(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError>;
    fn download_sirens(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError>;
    fn download_contour(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError>;
}

#[derive(Clone)]
pub struct HttpDownloadClient {
    client: Client,
    sirene_bearer: Option<String>,
}

impl HttpDownloadClient {
    pub fn new() -> Result<Self, DecpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("decp-couverture/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DecpError::Filesystem(err.to_string()))?,
        );

        let sirene_bearer = std::env::var(SIRENE_BEARER_ENV)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| DecpError::DecpHttp(err.to_string()))?;

        Ok(Self {
            client,
            sirene_bearer,
        })
    }

    fn send_with_retries<F, E>(&self, mut make_req: F, wrap: E) -> Result<reqwest::blocking::Response, DecpError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
        E: Fn(String) -> DecpError,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(wrap(err.to_string()));
                }
            }
        }
    }

    fn write_response_to_file<S>(
        mut response: reqwest::blocking::Response,
        destination: &Utf8Path,
        status_error: S,
    ) -> Result<ResponseInfo, DecpError>
    where
        S: Fn(u16, String) -> DecpError,
    {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(status_error(status, message));
        }
        let is_zip = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("zip"))
            .unwrap_or(false);

        DataStore::ensure_parent(destination)?;
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        Ok(ResponseInfo { is_zip })
    }
}

#[derive(Debug, Clone, Copy)]
struct ResponseInfo {
    is_zip: bool,
}

impl DownloadClient for HttpDownloadClient {
    fn download_decp(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        let response = self.send_with_retries(|| self.client.get(url), DecpError::DecpHttp)?;
        Self::write_response_to_file(response, destination, |status, message| {
            DecpError::DecpStatus { status, message }
        })?;
        Ok(())
    }

    fn download_sirens(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        let response = self.send_with_retries(
            || {
                let mut request = self.client.get(url);
                if let Some(token) = &self.sirene_bearer {
                    request = request.bearer_auth(token);
                }
                request
            },
            DecpError::SireneHttp,
        )?;

        // The stock file is distributed as a zip holding a single CSV; some
        // mirrors serve the CSV directly.
        let archive_path = destination.with_extension("download");
        let info = Self::write_response_to_file(response, &archive_path, |status, message| {
            DecpError::SireneStatus { status, message }
        })?;
        if info.is_zip || url.ends_with(".zip") {
            info!("extracting Sirene stock archive to {destination}");
            let result = extract_csv_entry(&archive_path, destination);
            let _ = std::fs::remove_file(archive_path.as_std_path());
            result
        } else {
            std::fs::rename(archive_path.as_std_path(), destination.as_std_path())
                .map_err(|err| DecpError::Filesystem(err.to_string()))
        }
    }

    fn download_contour(&self, url: &str, destination: &Utf8Path) -> Result<(), DecpError> {
        let response = self.send_with_retries(|| self.client.get(url), DecpError::ContoursHttp)?;
        Self::write_response_to_file(response, destination, |status, message| {
            DecpError::ContoursStatus { status, message }
        })?;
        Ok(())
    }
}

/// DECP export URL with an optional row cap appended, used to work against a
/// small sample during development.
pub fn decp_url(base: &str, rows: Option<usize>) -> String {
    match rows {
        Some(rows) => format!("{base}&rows={rows}"),
        None => base.to_string(),
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
