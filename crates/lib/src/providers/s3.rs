//! # Signed Object-Storage Client
//!
//! Talks to S3-compatible object storage over the REST API with AWS
//! Signature V4 request signing, using pure-Rust crypto (`hmac`, `sha2`).
//! Supports custom endpoints for S3-compatible services (MinIO, LocalStack)
//! via path-style addressing, and produces presigned GET URLs for reference
//! resolution.
//!
//! Credentials come from the environment:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (temporary credentials)

use crate::errors::{ConfigError, StoreError};
use crate::providers::object_store::{ObjectInfo, ObjectStore};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "s3";
/// Every storage request carries a finite timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Static credentials for request signing.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret key never goes to logs.
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

impl AwsCredentials {
    /// Reads credentials from the environment; missing required values are
    /// fail-fast configuration errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_key_id: env::var("AWS_ACCESS_KEY_ID")
                .map_err(|_| ConfigError::MissingVar("AWS_ACCESS_KEY_ID"))?,
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY")
                .map_err(|_| ConfigError::MissingVar("AWS_SECRET_ACCESS_KEY"))?,
            session_token: env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

/// Endpoint settings for the store.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    /// Custom endpoint (e.g. `http://localhost:9000` for MinIO). When set,
    /// requests use path-style addressing.
    pub endpoint_url: Option<String>,
}

/// [`ObjectStore`] backed by the S3 REST API.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: ReqwestClient,
    config: S3Config,
    creds: AwsCredentials,
}

impl S3ObjectStore {
    pub fn new(config: S3Config, creds: AwsCredentials) -> Result<Self, StoreError> {
        let client = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(Self {
            client,
            config,
            creds,
        })
    }

    /// `(scheme, host, path)` for an object; the path always starts with `/`.
    fn object_location(&self, container: &str, key: &str) -> (String, String, String) {
        let encoded_key: String = key
            .split('/')
            .map(|segment| uri_encode(segment, false))
            .collect::<Vec<_>>()
            .join("/");
        match &self.config.endpoint_url {
            Some(endpoint) => {
                let (scheme, host) = endpoint
                    .split_once("://")
                    .unwrap_or(("https", endpoint.as_str()));
                (
                    scheme.to_string(),
                    host.trim_end_matches('/').to_string(),
                    format!("/{container}/{encoded_key}"),
                )
            }
            None => (
                "https".to_string(),
                format!("{container}.s3.{}.amazonaws.com", self.config.region),
                format!("/{encoded_key}"),
            ),
        }
    }

    /// Signs and sends one request, with the payload hashed into the
    /// signature as SigV4 requires.
    async fn send_signed(
        &self,
        method: Method,
        container: &str,
        key: &str,
        extra_headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, StoreError> {
        let (scheme, host, path) = self.object_location(container, key);
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(&body);

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.extend(extra_headers);
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();

        let canonical_request = format!(
            "{}\n{path}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            method.as_str()
        );
        let credential_scope = format!("{date_stamp}/{}/{SERVICE}/aws4_request", self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
            hex_sha256(canonical_request.as_bytes())
        );
        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            SERVICE,
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.creds.access_key_id
        );

        let url = format!("{scheme}://{host}{path}");
        debug!("{} {url}", method.as_str());

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", authorization)
            .body(body);
        for (name, value) in &headers {
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        classify_response(response, container, key).await
    }
}

/// Maps throttling and not-found statuses to their dedicated errors so
/// callers can pick the right retry policy.
async fn classify_response(
    response: reqwest::Response,
    container: &str,
    key: &str,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let summary: String = body.chars().take(500).collect();
    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound(format!("s3://{container}/{key}"))),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            Err(StoreError::Throttled(summary))
        }
        _ => Err(StoreError::Request(format!(
            "storage request failed (HTTP {status}): {summary}"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .send_signed(Method::GET, container, key, Vec::new(), Vec::new())
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.send_signed(
            Method::PUT,
            container,
            key,
            vec![("content-type".to_string(), content_type.to_string())],
            body,
        )
        .await?;
        Ok(())
    }

    async fn head(&self, container: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        let response = self
            .send_signed(Method::HEAD, container, key, Vec::new(), Vec::new())
            .await?;

        let header_str = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let size = header_str("content-length").parse().unwrap_or(0);
        Ok(ObjectInfo {
            content_type: header_str("content-type"),
            size,
            etag: header_str("etag").trim_matches('"').to_string(),
        })
    }

    async fn copy(
        &self,
        container: &str,
        src_key: &str,
        dest_key: &str,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut headers = vec![(
            "x-amz-copy-source".to_string(),
            format!("/{container}/{src_key}"),
        )];
        if let Some(ct) = content_type {
            // Replacing metadata is the only way to rewrite the stored
            // content type; a plain copy carries the old one along.
            headers.push(("content-type".to_string(), ct.to_string()));
            headers.push(("x-amz-metadata-directive".to_string(), "REPLACE".to_string()));
        }
        self.send_signed(Method::PUT, container, dest_key, headers, Vec::new())
            .await?;
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StoreError> {
        match self
            .send_signed(Method::DELETE, container, key, Vec::new(), Vec::new())
            .await
        {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn sign_get_url(
        &self,
        container: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        let (scheme, host, path) = self.object_location(container, key);
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential_scope = format!("{date_stamp}/{}/{SERVICE}/aws4_request", self.config.region);

        let mut query: Vec<(String, String)> = vec![
            (
                "X-Amz-Algorithm".to_string(),
                "AWS4-HMAC-SHA256".to_string(),
            ),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{credential_scope}", self.creds.access_key_id),
            ),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            (
                "X-Amz-Expires".to_string(),
                expires_in.as_secs().to_string(),
            ),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        if let Some(token) = &self.creds.session_token {
            query.push(("X-Amz-Security-Token".to_string(), token.clone()));
        }
        query.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_querystring: String = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");
        let canonical_request = format!(
            "GET\n{path}\n{canonical_querystring}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD"
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
            hex_sha256(canonical_request.as_bytes())
        );
        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            SERVICE,
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        Ok(format!(
            "{scheme}://{host}{path}?{canonical_querystring}&X-Amz-Signature={signature}"
        ))
    }
}

// --- SigV4 helpers ---

/// Hex-encoded SHA-256 of `data`.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derives the SigV4 signing key for a date, region, and service.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encodes per the SigV4 rules: unreserved characters pass through,
/// everything else (including `/` when `encode_slash` is set) is escaped.
fn uri_encode(s: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
