//! `/httpbin/*`: relays an upstream GET as a chunked response.
//!
//! Each upstream read becomes one chunk. The trailers carry the SHA-256 and
//! length of everything relayed.

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use super::pages;
use crate::http::{default_headers, Headers, ResponseError, ResponseWriter, StatusCode};

pub const CONTENT_SHA256: &str = "X-Content-SHA256";
pub const CONTENT_LENGTH: &str = "X-Content-Length";

/// `<base>/<path>` with exactly one slash between them.
pub fn upstream_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub async fn relay<S>(
    writer: &mut ResponseWriter<S>,
    client: &reqwest::Client,
    url: &str,
) -> Result<(), ResponseError>
where
    S: AsyncWrite + Unpin,
{
    let mut upstream = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(url, error = %e, "Upstream request failed");
            return pages::respond(writer, StatusCode::InternalServerError).await;
        }
    };
    tracing::debug!(url, status = %upstream.status(), "Relaying upstream response");

    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", CONTENT_SHA256);
    headers.set("Trailer", CONTENT_LENGTH);

    writer.write_status_line(StatusCode::Ok).await?;
    writer.write_headers(&headers).await?;

    let mut hasher = Sha256::new();
    let mut relayed = 0usize;
    loop {
        match upstream.chunk().await {
            Ok(Some(chunk)) => {
                hasher.update(&chunk);
                relayed += writer.write_chunked_body(&chunk).await?;
            }
            Ok(None) => break,
            Err(e) => {
                // Headers are already out; end the body with what we have.
                tracing::warn!(url, error = %e, relayed, "Upstream body read failed");
                break;
            }
        }
    }

    writer.write_chunked_body_done().await?;

    let mut trailers = Headers::new();
    trailers.set(CONTENT_SHA256, hex::encode(hasher.finalize()));
    trailers.set(CONTENT_LENGTH, relayed.to_string());
    writer.write_trailers(&trailers).await
}
