use super::ConnectionString;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::hmac;

/// Storage REST API version sent with every request.
pub(crate) const API_VERSION: &str = "2021-08-06";

/// Current time in the RFC 1123 form the storage API expects.
pub(crate) fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Shared-key `Authorization` header value, or `None` when the connection
/// authenticates through a SAS token instead.
pub(crate) fn authorization_header(
    conn: &ConnectionString,
    method: &str,
    resource_path: &str,
    query: &[(String, String)],
    date: &str,
) -> Result<Option<String>> {
    let Some(account_key) = &conn.account_key else {
        return Ok(None);
    };

    let message = string_to_sign(method, date, &conn.account_name, resource_path, query);
    let signature = sign(account_key, &message)?;
    Ok(Some(format!(
        "SharedKey {}:{}",
        conn.account_name, signature
    )))
}

/// The canonical string covered by the shared-key signature: the verb,
/// eleven empty standard-header slots, the canonicalized `x-ms-*` headers
/// and the canonicalized resource.
pub(crate) fn string_to_sign(
    method: &str,
    date: &str,
    account: &str,
    resource_path: &str,
    query: &[(String, String)],
) -> String {
    let mut s = String::new();
    s.push_str(method);
    s.push_str(&"\n".repeat(12));
    s.push_str(&format!("x-ms-date:{date}\nx-ms-version:{API_VERSION}\n"));
    s.push_str(&canonicalized_resource(account, resource_path, query));
    s
}

fn canonicalized_resource(account: &str, resource_path: &str, query: &[(String, String)]) -> String {
    let mut resource = format!("/{account}{resource_path}");
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();
    pairs.sort();
    for (key, value) in pairs {
        resource.push_str(&format!("\n{key}:{value}"));
    }
    resource
}

fn sign(account_key_b64: &str, message: &str) -> Result<String> {
    let key_bytes = BASE64
        .decode(account_key_b64)
        .context("Account key is not valid base64")?;
    let key = hmac::Key::new(hmac::HMAC_SHA256, &key_bytes);
    let tag = hmac::sign(&key, message.as_bytes());
    Ok(BASE64.encode(tag.as_ref()))
}
