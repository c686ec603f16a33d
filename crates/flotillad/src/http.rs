//! Minimal HTTP/1.1 client helpers for the collaborator endpoints.
//!
//! Plain-http only, one connection per request, hard timeout per call.

use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An `http://` URL split into the authority to dial and the path to
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub authority: String,
    pub path: String,
}

/// Split `http://host[:port][/path]` into authority and path.
pub fn parse_endpoint(url: &str) -> anyhow::Result<Endpoint> {
    let Some(rest) = url.strip_prefix("http://") else {
        bail!("unsupported endpoint {url}: only http:// URLs are supported");
    };
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        bail!("endpoint {url} has no host");
    }
    let authority = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{authority}:80")
    };
    Ok(Endpoint {
        authority,
        path: path.to_string(),
    })
}

async fn request(method: &str, url: &str, body: Bytes) -> anyhow::Result<Bytes> {
    let endpoint = parse_endpoint(url)?;

    let run = async {
        let stream = tokio::net::TcpStream::connect(&endpoint.authority)
            .await
            .with_context(|| format!("failed to connect to {}", endpoint.authority))?;
        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context("http handshake failed")?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method(method)
            .uri(&endpoint.path)
            .header("host", &endpoint.authority)
            .header("user-agent", "flotillad/0.1")
            .header("content-type", "application/json")
            .body(Full::new(body))
            .context("failed to build request")?;

        let resp = sender.send_request(req).await.context("request failed")?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .context("failed to read response body")?
            .to_bytes();

        if !status.is_success() {
            bail!("{method} {url} returned {status}");
        }
        debug!(%url, %method, bytes = bytes.len(), "http call succeeded");
        Ok(bytes)
    };

    match tokio::time::timeout(REQUEST_TIMEOUT, run).await {
        Ok(result) => result,
        Err(_) => bail!("{method} {url} timed out"),
    }
}

/// GET a JSON document and deserialize it.
pub async fn get_json<T: DeserializeOwned>(url: &str) -> anyhow::Result<T> {
    let bytes = request("GET", url, Bytes::new()).await?;
    serde_json::from_slice(&bytes).with_context(|| format!("invalid JSON from {url}"))
}

/// GET a document as text.
pub async fn get_text(url: &str) -> anyhow::Result<String> {
    let bytes = request("GET", url, Bytes::new()).await?;
    String::from_utf8(bytes.to_vec()).with_context(|| format!("non-UTF-8 response from {url}"))
}

/// POST a value as JSON, ignoring the response body.
pub async fn post_json<T: Serialize>(url: &str, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_vec(value).context("failed to serialize request body")?;
    request("POST", url, Bytes::from(body)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_path() {
        let ep = parse_endpoint("http://metrics.internal:9000/fleet").unwrap();
        assert_eq!(ep.authority, "metrics.internal:9000");
        assert_eq!(ep.path, "/fleet");
    }

    #[test]
    fn defaults_port_and_path() {
        let ep = parse_endpoint("http://metrics.internal").unwrap();
        assert_eq!(ep.authority, "metrics.internal:80");
        assert_eq!(ep.path, "/");
    }

    #[test]
    fn keeps_query_string() {
        let ep = parse_endpoint("http://h:1/fleet?app=shop").unwrap();
        assert_eq!(ep.path, "/fleet?app=shop");
    }

    #[test]
    fn rejects_https_and_bare_urls() {
        assert!(parse_endpoint("https://secure.example/fleet").is_err());
        assert!(parse_endpoint("metrics.internal/fleet").is_err());
        assert!(parse_endpoint("http://").is_err());
    }
}
