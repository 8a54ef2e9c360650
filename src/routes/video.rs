//! `/video`: serves a static MP4 from the assets directory.

use std::path::Path;

use tokio::io::AsyncWrite;

use super::pages;
use crate::http::{default_headers, ResponseError, ResponseWriter, StatusCode};

pub const VIDEO_FILE: &str = "nature.mp4";

pub async fn serve<S>(writer: &mut ResponseWriter<S>, assets_dir: &Path) -> Result<(), ResponseError>
where
    S: AsyncWrite + Unpin,
{
    let path = assets_dir.join(VIDEO_FILE);
    let video = match tokio::fs::read(&path).await {
        Ok(video) => video,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read video");
            return pages::respond(writer, StatusCode::InternalServerError).await;
        }
    };

    let mut headers = default_headers(video.len());
    headers.replace("Content-Type", "video/mp4");

    writer.write_status_line(StatusCode::Ok).await?;
    writer.write_headers(&headers).await?;
    writer.write_body(&video).await?;
    Ok(())
}
