use crate::config::Config;
use crate::core::{
    Downloader, DownloadRequest, LineSink, MediaEngine, MediaInfo, MediaKind, StderrSink, StdoutSink,
};
use crate::extractors::YtDlpEngine;
use crate::utils::single_line;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "media-bridge")]
#[command(about = "Analyze and download media through yt-dlp for a host application")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", global = true, value_name = "PATH")]
    pub ytdlp: Option<PathBuf>,

    /// ffmpeg binary or directory handed to yt-dlp
    #[arg(long, global = true, value_name = "PATH")]
    pub ffmpeg_location: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print title, thumbnail and the available formats as one JSON line
    Analyze {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Download into a collision-free file, reporting progress lines
    Download {
        #[arg(value_name = "URL")]
        url: String,

        #[arg(value_enum, default_value = "video")]
        mode: Mode,

        /// Format id from `analyze`, or `best` / `bestaudio`
        #[arg(default_value = "best")]
        quality: String,

        #[arg(value_name = "SAVE_PATH", default_value = ".")]
        save_path: PathBuf,
    },
    /// Report which external components are available
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Video,
    Audio,
}

impl From<Mode> for MediaKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Video => MediaKind::Video,
            Mode::Audio => MediaKind::Audio,
        }
    }
}

impl Command {
    /// Prefix of the single diagnostic line the host expects on failure.
    pub fn error_prefix(&self) -> &'static str {
        match self {
            Command::Analyze { .. } => "Python Error",
            Command::Download { .. } => "Download Error",
            Command::Check => "Check Error",
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(ytdlp) = &self.ytdlp {
            config.ytdlp_path = ytdlp.clone();
        }
        if let Some(ffmpeg) = &self.ffmpeg_location {
            config.ffmpeg_location = Some(ffmpeg.clone());
        }
        Ok(config)
    }

    pub async fn run(&self, config: &Config) -> u8 {
        let engine: Arc<dyn MediaEngine> = Arc::new(YtDlpEngine::from_config(config));
        execute(&self.command, engine, config, &StdoutSink, &StderrSink).await
    }
}

/// Runs one command and returns the process exit code. Any failure becomes
/// exactly one line on `err`; `out` only carries protocol lines.
pub async fn execute(
    command: &Command,
    engine: Arc<dyn MediaEngine>,
    config: &Config,
    out: &dyn LineSink,
    err: &dyn LineSink,
) -> u8 {
    info!("Running {:?} with {}", command, engine.name());

    let result = match command {
        Command::Analyze { url } => analyze(engine.as_ref(), url, out).await,
        Command::Download {
            url,
            mode,
            quality,
            save_path,
        } => {
            let request = DownloadRequest {
                url: url.clone(),
                mode: (*mode).into(),
                quality_selector: quality.clone(),
                destination: save_path.clone(),
            };
            download(engine, config, &request, out).await
        }
        Command::Check => return check(engine.as_ref(), out).await,
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            report_failure(command, &e, err);
            EXIT_FAILURE
        }
    }
}

pub fn report_failure(command: &Command, error: &anyhow::Error, err: &dyn LineSink) {
    let line = format!("{}: {}", command.error_prefix(), single_line(&format!("{:#}", error)));
    if let Err(e) = err.emit(&line) {
        warn!("Failed to write diagnostic line: {}", e);
    }
}

async fn analyze(engine: &dyn MediaEngine, url: &str, out: &dyn LineSink) -> Result<()> {
    let info = MediaInfo::from_raw(engine.extract_info(url).await?);
    info!("{} menu entries for {}", info.formats.len(), info.title);

    let json = serde_json::to_string(&info)?;
    out.emit(&json).context("failed to write media info")?;
    Ok(())
}

async fn download(
    engine: Arc<dyn MediaEngine>,
    config: &Config,
    request: &DownloadRequest,
    out: &dyn LineSink,
) -> Result<()> {
    let downloader = Downloader::new(engine)
        .with_audio_quality(config.audio_quality.clone())
        .with_merge_container(config.merge_output_format.clone());

    downloader.download(request, out).await?;
    Ok(())
}

async fn check(engine: &dyn MediaEngine, out: &dyn LineSink) -> u8 {
    let status = engine.component_status().await;
    let line = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
    if let Err(e) = out.emit(&line) {
        warn!("Failed to write component status: {}", e);
    }

    if status.ready {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_defaults() {
        let cli = Cli::try_parse_from(["media-bridge", "download", "https://youtu.be/x"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Download {
                url: "https://youtu.be/x".to_string(),
                mode: Mode::Video,
                quality: "best".to_string(),
                save_path: PathBuf::from("."),
            }
        );
    }

    #[test]
    fn test_download_positional_overrides() {
        let cli = Cli::try_parse_from([
            "media-bridge",
            "download",
            "https://youtu.be/x",
            "audio",
            "bestaudio",
            "/tmp/music",
            "--yt-dlp",
            "/opt/yt-dlp",
        ])
        .unwrap();

        match cli.command {
            Command::Download { mode, quality, save_path, .. } => {
                assert_eq!(mode, Mode::Audio);
                assert_eq!(quality, "bestaudio");
                assert_eq!(save_path, PathBuf::from("/tmp/music"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.ytdlp, Some(PathBuf::from("/opt/yt-dlp")));
    }

    #[test]
    fn test_analyze_requires_url() {
        assert!(Cli::try_parse_from(["media-bridge", "analyze"]).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["media-bridge", "download", "u", "gif"]).is_err());
    }

    #[test]
    fn test_error_prefixes() {
        assert_eq!(Command::Analyze { url: String::new() }.error_prefix(), "Python Error");
        assert_eq!(Command::Check.error_prefix(), "Check Error");
    }
}
