//! Canned HTML pages.

use tokio::io::AsyncWrite;

use crate::http::{default_headers, ResponseError, ResponseWriter, StatusCode};

const BAD_REQUEST: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_SERVER_ERROR: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const OK: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

/// The page shown for a given status.
pub fn page(status: StatusCode) -> &'static str {
    match status {
        StatusCode::Ok => OK,
        StatusCode::BadRequest => BAD_REQUEST,
        StatusCode::InternalServerError => INTERNAL_SERVER_ERROR,
    }
}

/// Write a complete `text/html` response carrying the page for `status`.
pub async fn respond<S>(writer: &mut ResponseWriter<S>, status: StatusCode) -> Result<(), ResponseError>
where
    S: AsyncWrite + Unpin,
{
    let body = page(status);
    let mut headers = default_headers(body.len());
    headers.replace("Content-Type", "text/html");

    writer.write_status_line(status).await?;
    writer.write_headers(&headers).await?;
    writer.write_body(body.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_length_matches_page() {
        let mut writer = ResponseWriter::new(Vec::new());
        respond(&mut writer, StatusCode::InternalServerError).await.unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let body = page(StatusCode::InternalServerError);
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(out.contains("Content-Type: text/html\r\n"));
        assert!(out.ends_with(body));
    }
}
