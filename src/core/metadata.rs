use serde::{Deserialize, Serialize};

/// Title reported when the engine gives none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Codec value the engine uses to say a stream carries no such track.
pub const NO_CODEC: &str = "none";

/// Metadata as returned by the extraction engine, before any cleanup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMediaInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One entry of the engine's format list. Every descriptor may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>, // average audio bitrate
    #[serde(default)]
    pub tbr: Option<f64>, // total bitrate
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl RawFormat {
    /// Carries a video track. A missing codec is not the `none` sentinel.
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some(NO_CODEC)
    }

    /// Audio-only stream.
    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.acodec.as_deref() != Some(NO_CODEC)
    }

    /// Video quality key: first non-empty of resolution, format note, height.
    pub fn video_quality_key(&self) -> Option<String> {
        non_empty(&self.resolution)
            .or_else(|| non_empty(&self.format_note))
            .map(str::to_string)
            .or_else(|| non_zero(self.height).map(format_number))
    }

    /// Audio quality key such as `128k`, from the average or total bitrate.
    pub fn audio_quality_key(&self) -> Option<String> {
        non_zero(self.abr)
            .or_else(|| non_zero(self.tbr))
            .map(|kbps| format!("{}k", kbps.trunc() as i64))
    }

    /// Best known size in bytes, 0 when unknown.
    pub fn effective_size(&self) -> u64 {
        non_zero(self.filesize)
            .or_else(|| non_zero(self.filesize_approx))
            .map(|bytes| bytes.max(0.0) as u64)
            .unwrap_or(0)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

// Heights arrive as JSON numbers; integral values print without a fraction.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Container the host ends up with after remux or transcode.
    pub fn target_extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }
}

/// A deduplicated choice offered to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub kind: MediaKind,
    #[serde(rename = "ext")]
    pub extension: String,
    #[serde(rename = "resolution")]
    pub quality_label: String,
    #[serde(rename = "filesize")]
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub formats: Vec<MenuEntry>,
}

impl MediaInfo {
    pub fn from_raw(raw: RawMediaInfo) -> Self {
        let formats = crate::core::menu::build_menu(&raw.formats);
        Self {
            title: raw.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            thumbnail_url: raw.thumbnail.unwrap_or_default(),
            formats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_format_deserializes_sparse_json() {
        let json = r#"{"format_id":"251","vcodec":"none","acodec":"opus","abr":129.5,"filesize":null}"#;
        let format: RawFormat = serde_json::from_str(json).unwrap();

        assert!(format.is_audio_only());
        assert_eq!(format.audio_quality_key().as_deref(), Some("129k"));
        assert_eq!(format.effective_size(), 0);
    }

    #[test]
    fn test_quality_key_falls_through_empty_values() {
        let format = RawFormat {
            vcodec: Some("avc1".into()),
            resolution: Some(String::new()),
            format_note: None,
            height: Some(720.0),
            ..Default::default()
        };
        assert_eq!(format.video_quality_key().as_deref(), Some("720"));

        let audio = RawFormat {
            vcodec: Some("none".into()),
            acodec: Some("mp4a".into()),
            abr: Some(0.0),
            tbr: Some(48.0),
            ..Default::default()
        };
        assert_eq!(audio.audio_quality_key().as_deref(), Some("48k"));
    }

    #[test]
    fn test_missing_video_codec_counts_as_video() {
        let format = RawFormat::default();
        assert!(format.has_video());
        assert!(!format.is_audio_only());
    }

    #[test]
    fn test_media_info_serializes_host_field_names() {
        let info = MediaInfo::from_raw(RawMediaInfo::default());
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["title"], "Unknown Title");
        assert_eq!(json["thumbnail"], "");
        assert!(json["formats"].as_array().unwrap().is_empty());
    }
}
