use crate::core::engine::{DownloadOptions, MediaEngine, PostProcess};
use crate::core::metadata::{MediaInfo, MediaKind};
use crate::core::output::LineSink;
use crate::core::progress::ProgressTranslator;
use crate::error::{BridgeError, Result};
use crate::utils::{absolute_path, allocate_unique_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Selector meaning "whatever the engine ranks highest" in video mode.
pub const BEST_VIDEO: &str = "best";
/// Selector meaning "whatever the engine ranks highest" in audio mode.
pub const BEST_AUDIO: &str = "bestaudio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub mode: MediaKind,
    /// A menu entry id passed back verbatim, or `best` / `bestaudio`.
    pub quality_selector: String,
    pub destination: PathBuf,
}

pub struct Downloader {
    engine: Arc<dyn MediaEngine>,
    pub merge_container: String,
    pub audio_quality: String,
}

impl Downloader {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            merge_container: "mp4".to_string(),
            audio_quality: "256K".to_string(),
        }
    }

    pub fn with_audio_quality(mut self, quality: impl Into<String>) -> Self {
        self.audio_quality = quality.into();
        self
    }

    pub fn with_merge_container(mut self, container: impl Into<String>) -> Self {
        self.merge_container = container.into();
        self
    }

    /// Runs one download end to end and returns the allocated file path.
    ///
    /// `out` receives the `FILENAME:` line before the transfer starts and then
    /// one `DATA:` line per progress callback. Nothing is cleaned up on failure.
    pub async fn download(&self, request: &DownloadRequest, out: &dyn LineSink) -> Result<PathBuf> {
        let directory = absolute_path(&request.destination)?;
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| BridgeError::file_system("failed to create", &directory, e))?;

        let info = MediaInfo::from_raw(self.engine.extract_info(&request.url).await?);
        info!("Resolved title: {}", info.title);

        let label = quality_label(&request.quality_selector);
        let output_path = allocate_unique_path(&directory, &info.title, &label, request.mode.target_extension())?;

        let file_name = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        out.emit(&format!("FILENAME:{}", file_name))
            .map_err(|e| BridgeError::Download(format!("failed to report file name: {}", e)))?;

        let options = self.options_for(request, output_path.clone());
        debug!("Format selector: {}", options.format_selector);
        info!("Downloading to: {}", output_path.display());

        let translator = ProgressTranslator::new(out);
        self.engine.download(&request.url, &options, &translator).await?;

        info!("Download finished: {}", output_path.display());
        Ok(output_path)
    }

    pub fn options_for(&self, request: &DownloadRequest, output_path: PathBuf) -> DownloadOptions {
        let (format_selector, post_process) = match request.mode {
            MediaKind::Video => (
                video_selector(&request.quality_selector),
                PostProcess::Merge {
                    container: self.merge_container.clone(),
                },
            ),
            MediaKind::Audio => (
                audio_selector(&request.quality_selector),
                PostProcess::ExtractAudio {
                    codec: "mp3".to_string(),
                    quality: self.audio_quality.clone(),
                },
            ),
        };

        DownloadOptions {
            format_selector,
            output_path,
            post_process,
        }
    }
}

/// Tag used in the file name for a selector.
pub fn quality_label(selector: &str) -> String {
    if selector == BEST_VIDEO {
        "Best".to_string()
    } else {
        selector.to_string()
    }
}

/// A video-only stream is paired with the best audio; `best` lets the engine pick both.
pub fn video_selector(selector: &str) -> String {
    if selector == BEST_VIDEO {
        "bestvideo+bestaudio/best".to_string()
    } else {
        format!("{}+bestaudio/best", selector)
    }
}

pub fn audio_selector(selector: &str) -> String {
    if selector == BEST_AUDIO {
        "bestaudio/best".to_string()
    } else {
        selector.to_string()
    }
}
