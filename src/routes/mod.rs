//! Demonstration handler served by the `tcp-http` binary.
//!
//! # Routes
//! ```text
//! /yourproblem     → 400 page
//! /myproblem       → 500 page
//! /video           → <assets_dir>/nature.mp4 as video/mp4
//! /httpbin/<path>  → GET <upstream_url>/<path>, relayed chunked with trailers
//! anything else    → 200 page
//! ```

pub mod pages;
pub mod proxy;
pub mod video;

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::net::TcpStream;

use crate::config::RoutesConfig;
use crate::http::{Handler, Request, ResponseError, ResponseWriter, StatusCode};

const PROXY_PREFIX: &str = "/httpbin/";

/// Target-based dispatch over the demo pages.
#[derive(Debug, Clone)]
pub struct DemoRouter {
    config: Arc<RoutesConfig>,
    client: reqwest::Client,
}

impl DemoRouter {
    pub fn new(config: RoutesConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Write the full response for `request`.
    pub async fn route<S>(&self, writer: &mut ResponseWriter<S>, request: &Request) -> Result<(), ResponseError>
    where
        S: AsyncWrite + Unpin,
    {
        let target = request.target();
        tracing::debug!(request_target = target, "Routing request");

        match target {
            "/yourproblem" => pages::respond(writer, StatusCode::BadRequest).await,
            "/myproblem" => pages::respond(writer, StatusCode::InternalServerError).await,
            "/video" => video::serve(writer, &self.config.assets_dir).await,
            _ => match target.strip_prefix(PROXY_PREFIX) {
                Some(path) => {
                    let url = proxy::upstream_url(&self.config.upstream_url, path);
                    proxy::relay(writer, &self.client, &url).await
                }
                None => pages::respond(writer, StatusCode::Ok).await,
            },
        }
    }

    /// Adapt the router to the server's callback boundary.
    pub fn into_handler(self) -> impl Handler {
        move |mut writer: ResponseWriter<TcpStream>, request: Request| {
            let router = self.clone();
            async move {
                router.route(&mut writer, &request).await?;
                writer.flush().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestParser;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn get(target: &str) -> Request {
        let raw = format!("GET {} HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", target);
        let mut parser = RequestParser::new();
        parser.feed(raw.as_bytes()).unwrap();
        parser.finish().unwrap()
    }

    fn router(assets_dir: PathBuf, upstream_url: String) -> DemoRouter {
        DemoRouter::new(RoutesConfig {
            assets_dir,
            upstream_url,
        })
    }

    async fn render(router: &DemoRouter, target: &str) -> Vec<u8> {
        let mut writer = ResponseWriter::new(Vec::new());
        router.route(&mut writer, &get(target)).await.unwrap();
        writer.into_inner()
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let dir = std::env::temp_dir().join(format!("tcp-http-{}-{}", tag, nanos));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Decode a chunked body, returning the payload and the raw trailer block.
    fn dechunk(mut rest: &[u8]) -> (Vec<u8>, String) {
        let mut body = Vec::new();
        loop {
            let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let size = usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap(), 16).unwrap();
            rest = &rest[line_end + 2..];
            if size == 0 {
                return (body, String::from_utf8(rest.to_vec()).unwrap());
            }
            body.extend_from_slice(&rest[..size]);
            assert_eq!(&rest[size..size + 2], b"\r\n");
            rest = &rest[size + 2..];
        }
    }

    /// One-shot upstream that answers every connection with `body`.
    async fn upstream(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn problem_routes_map_to_error_pages() {
        let router = router(PathBuf::from("./assets"), "http://127.0.0.1:9".into());

        let out = String::from_utf8(render(&router, "/yourproblem").await).unwrap();
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(out.ends_with(pages::page(StatusCode::BadRequest)));

        let out = String::from_utf8(render(&router, "/myproblem").await).unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        let out = String::from_utf8(render(&router, "/anything/else").await).unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Content-Type: text/html\r\n"));
    }

    #[tokio::test]
    async fn video_is_served_from_assets_dir() {
        let dir = scratch_dir("video");
        std::fs::write(dir.join(video::VIDEO_FILE), b"\x00\x00\x00\x18ftypmp42").unwrap();
        let router = router(dir.clone(), "http://127.0.0.1:9".into());

        let out = render(&router, "/video").await;
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: video/mp4\r\n"));
        assert!(text.contains("Content-Length: 12\r\n"));
        assert!(out.ends_with(b"\x00\x00\x00\x18ftypmp42"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_video_is_a_server_error() {
        let router = router(PathBuf::from("/nonexistent/assets"), "http://127.0.0.1:9".into());
        let out = String::from_utf8(render(&router, "/video").await).unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn proxy_relays_chunked_with_digest_trailers() {
        let payload = "the quick brown fox jumps over the lazy dog";
        let router = router(PathBuf::from("./assets"), upstream(payload).await);

        let out = render(&router, "/httpbin/stream/1").await;
        let split = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = String::from_utf8(out[..split + 2].to_vec()).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Transfer-Encoding: chunked\r\n"));
        assert!(head.contains("Trailer: X-Content-SHA256, X-Content-Length\r\n"));
        assert!(!head.contains("\r\nContent-Length:"));

        let (body, trailers) = dechunk(&out[split + 4..]);
        assert_eq!(body, payload.as_bytes());

        let digest = hex::encode(<sha2::Sha256 as sha2::Digest>::digest(payload.as_bytes()));
        assert_eq!(
            trailers,
            format!("X-Content-SHA256: {}\r\nX-Content-Length: {}\r\n\r\n", digest, payload.len())
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_server_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let router = router(PathBuf::from("./assets"), format!("http://{}", addr));
        let out = String::from_utf8(render(&router, "/httpbin/get").await).unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }
}
