use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::domain::DatasetId;
use crate::download::FileClient;
use crate::error::OsdrError;

pub const DEFAULT_API_BASE: &str = "https://visualization.osdr.nasa.gov/biodata/api/v2";
pub const DEFAULT_SITE_BASE: &str = "https://visualization.osdr.nasa.gov";

pub const FIELD_FILE_NAME: &str = "file.file_name";
pub const FIELD_DATA_TYPE: &str = "file.data_type";
pub const FIELD_FILE_SIZE: &str = "file.file_size";
pub const FIELD_REMOTE_URL: &str = "file.remote_url";
pub const FIELD_CATEGORY: &str = "file.category";
pub const FIELD_PROTOCOL_REF: &str = "assay.protocol ref";
pub const FIELD_MEASUREMENT: &str = "investigation.study assays.study assay measurement type";
pub const FIELD_TECHNOLOGY: &str = "investigation.study assays.study assay technology type";

const QUERY_FIELDS: [&str; 8] = [
    FIELD_FILE_NAME,
    FIELD_DATA_TYPE,
    FIELD_FILE_SIZE,
    FIELD_REMOTE_URL,
    FIELD_CATEGORY,
    FIELD_PROTOCOL_REF,
    FIELD_MEASUREMENT,
    FIELD_TECHNOLOGY,
];

pub trait MetadataClient: Send + Sync {
    fn check_connectivity(&self) -> Result<(), OsdrError>;
    fn query_metadata(&self, dataset: &DatasetId) -> Result<Value, OsdrError>;
}

#[derive(Clone)]
pub struct OsdrHttpClient {
    client: Client,
    api_base: String,
    metadata_timeout: Duration,
    download_timeout: Duration,
}

impl OsdrHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, OsdrError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("osdr-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| OsdrError::MetadataHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| OsdrError::MetadataHttp(err.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            metadata_timeout: config.metadata_timeout,
            download_timeout: config.download_timeout,
        })
    }

    pub fn metadata_query_url(api_base: &str, dataset: &DatasetId) -> String {
        let mut parts = vec![format!("id.accession={}", dataset.as_str())];
        parts.extend(QUERY_FIELDS.iter().map(|field| field.replace(' ', "%20")));
        parts.push("format=json.records".to_string());
        format!(
            "{}/query/metadata/?{}",
            api_base.trim_end_matches('/'),
            parts.join("&")
        )
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, OsdrError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "OSDR request failed".to_string());
        Err(OsdrError::MetadataStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, OsdrError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
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
                        debug!(status, delay_ms = delay, "retrying metadata request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(error = %err, delay_ms = delay, "retrying metadata request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(OsdrError::MetadataHttp(err.to_string()));
                }
            }
        }
    }
}

impl MetadataClient for OsdrHttpClient {
    fn check_connectivity(&self) -> Result<(), OsdrError> {
        let url = format!("{}/datasets/", self.api_base);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .map_err(|err| OsdrError::MetadataHttp(err.to_string()))?;
        Self::handle_status(response)?;
        Ok(())
    }

    fn query_metadata(&self, dataset: &DatasetId) -> Result<Value, OsdrError> {
        let url = Self::metadata_query_url(&self.api_base, dataset);
        info!(%url, "querying OSDR metadata");
        let start = Instant::now();
        let response = self.send_with_retries(|| {
            self.client.get(&url).timeout(self.metadata_timeout)
        })?;
        let response = Self::handle_status(response)?;
        let value: Value = response
            .json()
            .map_err(|err| OsdrError::MetadataFormat(err.to_string()))?;
        debug!(latency_ms = start.elapsed().as_millis() as u64, "metadata received");
        Ok(value)
    }
}

impl FileClient for OsdrHttpClient {
    fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, OsdrError> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .map_err(|err| OsdrError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OsdrError::DownloadStatus {
                status: response.status().as_u16(),
            });
        }
        let mut file =
            File::create(destination).map_err(|err| OsdrError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| OsdrError::DownloadHttp(err.to_string()))
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
