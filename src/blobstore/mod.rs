//! Blob container access over the storage REST API.
//!
//! Supports shared-key and SAS connection strings. Listing and downloads
//! go through a blocking HTTP client with no request timeout, since
//! recordings can be large and slow to fetch.

mod auth;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the storage connection string.
pub const CONNECTION_STRING_VAR: &str = "AZURE_STORAGE_CONNECTION_STRING";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("{0} not found in the environment")]
    MissingSecret(&'static str),
    #[error("malformed connection string entry '{0}'")]
    MalformedEntry(String),
    #[error("connection string is missing {0}")]
    MissingField(&'static str),
}

/// Parsed storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    pub blob_endpoint: String,
}

impl ConnectionString {
    /// Parse the `Key=Value;...` format. Values may themselves contain
    /// `=` (account keys are base64), so only the first `=` of an entry
    /// separates key from value.
    pub fn parse(raw: &str) -> Result<Self, BlobStoreError> {
        let mut fields = HashMap::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| BlobStoreError::MalformedEntry(entry.to_string()))?;
            fields.insert(key, value);
        }

        let account_name = fields
            .get("AccountName")
            .map(|v| v.to_string())
            .ok_or(BlobStoreError::MissingField("AccountName"))?;
        let account_key = fields.get("AccountKey").map(|v| v.to_string());
        let sas_token = fields
            .get("SharedAccessSignature")
            .map(|v| v.trim_start_matches('?').to_string());
        if account_key.is_none() && sas_token.is_none() {
            return Err(BlobStoreError::MissingField(
                "AccountKey or SharedAccessSignature",
            ));
        }

        let protocol = fields
            .get("DefaultEndpointsProtocol")
            .copied()
            .unwrap_or("https");
        let suffix = fields.get("EndpointSuffix").copied().unwrap_or("core.windows.net");
        let blob_endpoint = fields
            .get("BlobEndpoint")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{protocol}://{account_name}.blob.{suffix}"));

        Ok(Self {
            account_name,
            account_key,
            sas_token,
            blob_endpoint,
        })
    }

    /// Read and parse the connection string from the environment.
    pub fn from_env() -> Result<Self, BlobStoreError> {
        let raw = std::env::var(CONNECTION_STRING_VAR)
            .map_err(|_| BlobStoreError::MissingSecret(CONNECTION_STRING_VAR))?;
        Self::parse(&raw)
    }
}

/// Client scoped to one blob container.
pub struct ContainerClient {
    http: reqwest::blocking::Client,
    conn: ConnectionString,
    container: String,
}

impl ContainerClient {
    /// Build a client for `container`. Construction performs no network
    /// calls; the first request surfaces connectivity problems.
    pub fn new(conn: ConnectionString, container: impl Into<String>) -> Result<Self> {
        // Recordings are large; let transfers run as long as they need.
        let http = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("Failed to build the HTTP client")?;
        let container = container.into();
        tracing::info!("Using blob container '{}'", container);
        Ok(Self {
            http,
            conn,
            container,
        })
    }

    /// Read the connection string from the environment and build a client.
    pub fn from_env(container: impl Into<String>) -> Result<Self> {
        let conn = ConnectionString::from_env()?;
        Self::new(conn, container)
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// All blob names in the container, following continuation markers.
    /// Failures are logged and produce an empty list so callers can treat
    /// an unreachable store like an empty one.
    pub fn list_blobs(&self) -> Vec<String> {
        match self.try_list_blobs() {
            Ok(names) => names,
            Err(e) => {
                tracing::error!("Failed to list blobs in '{}': {:#}", self.container, e);
                Vec::new()
            }
        }
    }

    fn try_list_blobs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut query = vec![
                ("restype".to_string(), "container".to_string()),
                ("comp".to_string(), "list".to_string()),
            ];
            if let Some(marker) = &marker {
                query.push(("marker".to_string(), marker.clone()));
            }

            let resp = self.get(None, &query)?;
            let body = resp.text().context("Failed to read the blob listing")?;
            let listing: ListBlobsResponse =
                quick_xml::de::from_str(&body).context("Failed to parse the blob listing")?;

            if let Some(blobs) = listing.blobs {
                names.extend(blobs.blob.into_iter().map(|b| b.name));
            }
            marker = listing.next_marker.filter(|m| !m.is_empty());
            if marker.is_none() {
                break;
            }
        }
        Ok(names)
    }

    /// Download `blob_name` to `dest`. A directory `dest` gets the blob
    /// name appended. With `when_missing` set, an existing destination
    /// file short-circuits without any network traffic.
    pub fn download_blob(&self, blob_name: &str, dest: &Path, when_missing: bool) -> Result<PathBuf> {
        let dest = resolve_destination(dest, blob_name);
        if when_missing && dest.is_file() {
            tracing::info!("File {} already exists, skipping download", dest.display());
            return Ok(dest);
        }

        tracing::info!("Starting download of blob '{}'", blob_name);
        let mut resp = self.get(Some(blob_name), &[])?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let mut file = std::fs::File::create(&dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let bytes = std::io::copy(&mut resp, &mut file)
            .with_context(|| format!("Failed to stream blob '{}' to disk", blob_name))?;

        tracing::info!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(dest)
    }

    fn get(
        &self,
        blob: Option<&str>,
        query: &[(String, String)],
    ) -> Result<reqwest::blocking::Response> {
        let url = self.request_url(blob, query);
        let date = auth::rfc1123_now();

        let mut req = self
            .http
            .get(&url)
            .header("x-ms-date", &date)
            .header("x-ms-version", auth::API_VERSION);
        if let Some(authorization) =
            auth::authorization_header(&self.conn, "GET", &self.resource_path(blob), query, &date)?
        {
            req = req.header("Authorization", authorization);
        }

        let resp = req
            .send()
            .with_context(|| format!("Request to {url} failed"))?;
        resp.error_for_status()
            .with_context(|| format!("Blob store rejected the request to {url}"))
    }

    /// Request URL with encoded path segments, the query pairs and, for
    /// SAS connections, the token appended.
    fn request_url(&self, blob: Option<&str>, query: &[(String, String)]) -> String {
        let mut url = format!(
            "{}/{}",
            self.conn.blob_endpoint,
            urlencoding::encode(&self.container)
        );
        if let Some(blob) = blob {
            for segment in blob.split('/') {
                url.push('/');
                url.push_str(&urlencoding::encode(segment));
            }
        }

        let mut pairs: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if let Some(sas) = &self.conn.sas_token {
            pairs.push(sas.clone());
        }
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    /// Path portion of the canonicalized resource, with raw names.
    fn resource_path(&self, blob: Option<&str>) -> String {
        match blob {
            Some(blob) => format!("/{}/{}", self.container, blob),
            None => format!("/{}", self.container),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBlobsResponse {
    blobs: Option<BlobList>,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
}

/// Resolve the download destination: directories get the blob name
/// appended, anything else is used as the file path.
pub fn resolve_destination(dest: &Path, blob_name: &str) -> PathBuf {
    if dest.is_dir() {
        dest.join(blob_name)
    } else {
        dest.to_path_buf()
    }
}

/// Derive a readable recording name from the first three numeric groups
/// in a blob name (date, time and recording number).
pub fn recording_label(blob_name: &str) -> Result<String> {
    let digits = regex::Regex::new(r"\d+").context("Failed to compile the digit pattern")?;
    let groups: Vec<&str> = digits
        .find_iter(blob_name)
        .map(|m| m.as_str())
        .take(3)
        .collect();
    if groups.len() < 3 {
        anyhow::bail!(
            "Blob name '{}' does not contain the three numeric groups (date, time, recording number)",
            blob_name
        );
    }
    Ok(format!(
        "{}-{}_recording-{}",
        groups[0], groups[1], groups[2]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "DefaultEndpointsProtocol=https;AccountName=devaccount;\
                        AccountKey=MDEyMzQ1Njc4OWFiY2RlZg==;EndpointSuffix=core.windows.net";

    #[test]
    fn parses_a_full_connection_string() {
        let conn = ConnectionString::parse(FULL).unwrap();
        assert_eq!(conn.account_name, "devaccount");
        assert_eq!(conn.account_key.as_deref(), Some("MDEyMzQ1Njc4OWFiY2RlZg=="));
        assert_eq!(conn.sas_token, None);
        assert_eq!(
            conn.blob_endpoint,
            "https://devaccount.blob.core.windows.net"
        );
    }

    #[test]
    fn account_keys_keep_their_base64_padding() {
        // The trailing == must survive the key=value split.
        let conn = ConnectionString::parse(FULL).unwrap();
        assert!(conn.account_key.unwrap().ends_with("=="));
    }

    #[test]
    fn explicit_blob_endpoint_wins() {
        let raw = "AccountName=devaccount;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/devaccount/";
        let conn = ConnectionString::parse(raw).unwrap();
        assert_eq!(conn.blob_endpoint, "http://127.0.0.1:10000/devaccount");
    }

    #[test]
    fn sas_token_counts_as_credentials() {
        let raw = "AccountName=devaccount;SharedAccessSignature=?sv=2021&sig=abc";
        let conn = ConnectionString::parse(raw).unwrap();
        assert_eq!(conn.sas_token.as_deref(), Some("sv=2021&sig=abc"));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = ConnectionString::parse("AccountName=devaccount").unwrap_err();
        assert_eq!(
            err,
            BlobStoreError::MissingField("AccountKey or SharedAccessSignature")
        );
    }

    #[test]
    fn missing_account_name_is_rejected() {
        let err = ConnectionString::parse("AccountKey=a2V5").unwrap_err();
        assert_eq!(err, BlobStoreError::MissingField("AccountName"));
    }

    #[test]
    fn entries_without_a_separator_are_rejected() {
        let err = ConnectionString::parse("AccountName=devaccount;garbage").unwrap_err();
        assert_eq!(err, BlobStoreError::MalformedEntry("garbage".to_string()));
    }

    #[test]
    fn listing_xml_parses_names_and_marker() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://devaccount.blob.core.windows.net/" ContainerName="recordings">
  <Blobs>
    <Blob><Name>20240101_120000_recording_1.mp4</Name><Properties><Content-Length>10</Content-Length></Properties></Blob>
    <Blob><Name>20240102_130000_recording_2.mp4</Name></Blob>
  </Blobs>
  <NextMarker>abc</NextMarker>
</EnumerationResults>"#;
        let listing: ListBlobsResponse = quick_xml::de::from_str(xml).unwrap();
        let names: Vec<String> = listing.blobs.unwrap().blob.into_iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            vec![
                "20240101_120000_recording_1.mp4",
                "20240102_130000_recording_2.mp4"
            ]
        );
        assert_eq!(listing.next_marker.as_deref(), Some("abc"));
    }

    #[test]
    fn listing_xml_tolerates_an_empty_container() {
        let xml = r#"<EnumerationResults><Blobs /><NextMarker /></EnumerationResults>"#;
        let listing: ListBlobsResponse = quick_xml::de::from_str(xml).unwrap();
        assert!(listing.blobs.map(|b| b.blob.is_empty()).unwrap_or(true));
        assert!(listing.next_marker.filter(|m| !m.is_empty()).is_none());
    }

    #[test]
    fn destination_directories_get_the_blob_name_appended() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_destination(dir.path(), "video.mp4");
        assert_eq!(resolved, dir.path().join("video.mp4"));

        let file_dest = dir.path().join("explicit.mp4");
        assert_eq!(resolve_destination(&file_dest, "video.mp4"), file_dest);
    }

    #[test]
    fn skip_if_exists_returns_the_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        std::fs::write(&dest, b"already here").unwrap();

        // A client pointed at an unroutable endpoint proves no network
        // traffic happens on the skip path.
        let conn = ConnectionString::parse(
            "AccountName=devaccount;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:1",
        )
        .unwrap();
        let client = ContainerClient::new(conn, "recordings").unwrap();

        let path = client.download_blob("video.mp4", &dest, true).unwrap();
        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
    }

    #[test]
    fn request_url_encodes_segments_and_appends_sas() {
        let conn = ConnectionString::parse(
            "AccountName=devaccount;SharedAccessSignature=sv=2021&sig=abc",
        )
        .unwrap();
        let client = ContainerClient::new(conn, "recordings").unwrap();
        let url = client.request_url(Some("folder/rec 1.mp4"), &[]);
        assert_eq!(
            url,
            "https://devaccount.blob.core.windows.net/recordings/folder/rec%201.mp4?sv=2021&sig=abc"
        );
    }

    #[test]
    fn recording_label_joins_three_numeric_groups() {
        let label = recording_label("video_20240101_120000_nr_7.mp4").unwrap();
        assert_eq!(label, "20240101-120000_recording-7");
    }

    #[test]
    fn recording_label_needs_three_groups() {
        let err = recording_label("video_20240101.mp4").unwrap_err();
        assert!(err.to_string().contains("three numeric groups"));
    }

    #[test]
    fn recording_label_ignores_extra_groups() {
        let label = recording_label("1_2_3_4_5").unwrap();
        assert_eq!(label, "1-2_recording-3");
    }
}
