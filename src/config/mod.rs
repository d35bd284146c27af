use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MEDIA_BRIDGE_CONFIG";
pub const YTDLP_ENV: &str = "MEDIA_BRIDGE_YTDLP";
pub const FFMPEG_ENV: &str = "MEDIA_BRIDGE_FFMPEG";
pub const CONFIG_FILE_NAME: &str = "media-bridge.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ytdlp_path: PathBuf,
    /// ffmpeg binary or its directory. Looked up beside us when unset.
    pub ffmpeg_location: Option<PathBuf>,
    pub audio_quality: String,
    pub merge_output_format: String,
    /// Ignore the user's own yt-dlp configuration files.
    pub no_config: bool,
    pub log_level: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            audio_quality: "256K".to_string(),
            merge_output_format: "mp4".to_string(),
            no_config: true,
            log_level: None,
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Reads `path`, else `$MEDIA_BRIDGE_CONFIG`, else `media-bridge.toml`
    /// beside the executable, else defaults; then applies env overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match exe_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if let Some(ytdlp) = std::env::var_os(YTDLP_ENV) {
            config.ytdlp_path = PathBuf::from(ytdlp);
        }
        if let Some(ffmpeg) = std::env::var_os(FFMPEG_ENV) {
            config.ffmpeg_location = Some(PathBuf::from(ffmpeg));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The configured ffmpeg, or a bundled `ffmpeg` in the working directory
    /// or beside the executable.
    pub fn resolve_ffmpeg_location(&self) -> Option<PathBuf> {
        if let Some(location) = &self.ffmpeg_location {
            return Some(location.clone());
        }

        let binary = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        let candidates = [std::env::current_dir().ok(), exe_dir()];
        candidates
            .into_iter()
            .flatten()
            .map(|dir| dir.join(binary))
            .find(|path| path.is_file())
    }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
