use crate::core::metadata::RawMediaInfo;
use crate::core::progress::ProgressSink;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// Post-processing the engine applies after the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Merge the selected streams into this container.
    Merge { container: String },
    /// Extract the audio track and transcode it.
    ExtractAudio { codec: String, quality: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Engine format-selection expression, e.g. `137+bestaudio/best`.
    pub format_selector: String,
    /// Final path of the artifact. Not a template: used literally.
    pub output_path: PathBuf,
    pub post_process: PostProcess,
}

/// Which external helpers are available next to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub ytdlp: bool,
    pub ffmpeg: bool,
    pub deno: bool,
    pub ytdlp_version: Option<String>,
    pub ready: bool,
}

/// The media-extraction engine that does the real network and codec work.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Metadata only, no media bytes transferred.
    async fn extract_info(&self, url: &str) -> Result<RawMediaInfo>;

    /// Transfers `url`, reporting each progress callback to `progress`.
    async fn download(&self, url: &str, options: &DownloadOptions, progress: &dyn ProgressSink) -> Result<()>;

    async fn component_status(&self) -> ComponentStatus;
}
