use crate::core::metadata::{MediaKind, MenuEntry, RawFormat};
use crate::utils::leading_number;
use std::collections::HashMap;

/// Turns the engine's raw format list into the menu offered to the host:
/// one entry per quality, video first, each half sorted by descending quality.
///
/// Entries that cannot be classified or keyed are skipped. Within a quality
/// the largest known file size wins; on equal sizes the first one seen stays.
pub fn build_menu(formats: &[RawFormat]) -> Vec<MenuEntry> {
    let mut videos = QualityGroups::new(MediaKind::Video);
    let mut audios = QualityGroups::new(MediaKind::Audio);

    for format in formats {
        // Without an id the host could not ask for this format back.
        if format.format_id.as_deref().map_or(true, str::is_empty) {
            continue;
        }
        if format.has_video() {
            if let Some(key) = format.video_quality_key() {
                videos.offer(key, format);
            }
        } else if format.is_audio_only() {
            if let Some(key) = format.audio_quality_key() {
                audios.offer(key, format);
            }
        }
    }

    let mut menu = videos.into_ranked();
    menu.extend(audios.into_ranked());
    menu
}

/// Keeps the largest candidate per quality key, in first-seen key order.
struct QualityGroups {
    kind: MediaKind,
    index: HashMap<String, usize>,
    entries: Vec<MenuEntry>,
}

impl QualityGroups {
    fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn offer(&mut self, key: String, format: &RawFormat) {
        let size = format.effective_size();
        match self.index.get(&key) {
            Some(&slot) => {
                if size > self.entries[slot].file_size {
                    self.entries[slot] = self.entry(key, format, size);
                }
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                let entry = self.entry(key, format, size);
                self.entries.push(entry);
            }
        }
    }

    fn entry(&self, key: String, format: &RawFormat, size: u64) -> MenuEntry {
        MenuEntry {
            id: format.format_id.clone().unwrap_or_default(),
            kind: self.kind,
            extension: self.kind.target_extension().to_string(),
            quality_label: key,
            file_size: size,
        }
    }

    fn into_ranked(mut self) -> Vec<MenuEntry> {
        // Stable sort: equal ranks keep first-seen order.
        self.entries
            .sort_by(|a, b| leading_number(&b.quality_label).cmp(&leading_number(&a.quality_label)));
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn video(id: &str, resolution: &str, size: u64) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            vcodec: Some("avc1.640028".to_string()),
            acodec: Some("none".to_string()),
            resolution: Some(resolution.to_string()),
            filesize: Some(size as f64),
            ..Default::default()
        }
    }

    fn audio(id: &str, abr: f64, size: u64) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            abr: Some(abr),
            filesize: Some(size as f64),
            ..Default::default()
        }
    }

    fn labels(menu: &[MenuEntry]) -> Vec<&str> {
        menu.iter().map(|e| e.quality_label.as_str()).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_menu() {
        assert!(build_menu(&[]).is_empty());
    }

    #[test]
    fn test_duplicates_keep_largest_file() {
        let menu = build_menu(&[
            video("136", "1280x720", 10_000),
            video("247", "1280x720", 25_000),
            video("398", "1280x720", 20_000),
        ]);

        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].id, "247");
        assert_eq!(menu[0].file_size, 25_000);
        assert_eq!(menu[0].extension, "mp4");
    }

    #[test]
    fn test_equal_sizes_keep_first_seen() {
        let menu = build_menu(&[audio("139", 48.0, 100), audio("599", 48.9, 100)]);

        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].id, "139");
        assert_eq!(menu[0].quality_label, "48k");
    }

    #[test]
    fn test_video_before_audio_each_descending() {
        let menu = build_menu(&[
            audio("140", 129.0, 3_000),
            video("134", "360p", 1_000),
            audio("251", 160.0, 4_000),
            video("137", "1080p", 9_000),
            video("136", "720p", 5_000),
        ]);

        assert_eq!(labels(&menu), vec!["1080p", "720p", "360p", "160k", "129k"]);
        assert_eq!(menu[3].kind, MediaKind::Audio);
        assert_eq!(menu[3].extension, "mp3");
    }

    #[test]
    fn test_ranking_ignores_input_order() {
        let mut formats = vec![
            video("a", "480p", 1),
            video("b", "1080p60", 1),
            video("c", "720p", 1),
            audio("d", 70.0, 1),
            audio("e", 128.0, 1),
        ];
        let forward = labels(&build_menu(&formats))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        formats.reverse();
        let backward = labels(&build_menu(&formats))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        assert_eq!(forward, backward);
        assert_eq!(forward[0], "1080p60");
    }

    #[test]
    fn test_keys_without_digits_sort_last() {
        let mut note = video("x", "", 1);
        note.resolution = None;
        note.format_note = Some("storyboard".to_string());

        let menu = build_menu(&[note, video("y", "144p", 1), video("z", "720p", 1)]);
        assert_eq!(labels(&menu), vec!["720p", "144p", "storyboard"]);
    }

    #[test]
    fn test_unkeyable_and_trackless_entries_are_dropped() {
        let silent = RawFormat {
            format_id: Some("sb0".into()),
            vcodec: Some("none".into()),
            acodec: Some("none".into()),
            resolution: Some("48x27".into()),
            abr: Some(10.0),
            ..Default::default()
        };
        let no_key_video = RawFormat {
            format_id: Some("v".into()),
            vcodec: Some("vp9".into()),
            ..Default::default()
        };
        let no_key_audio = RawFormat {
            format_id: Some("a".into()),
            vcodec: Some("none".into()),
            acodec: Some("aac".into()),
            ..Default::default()
        };

        let no_id = RawFormat {
            format_id: None,
            ..video("", "1280x720", 10)
        };
        let empty_id = audio("", 128.0, 10);

        assert!(build_menu(&[silent, no_key_video, no_key_audio, no_id, empty_id]).is_empty());
    }

    #[test]
    fn test_no_duplicate_kind_and_label() {
        let formats: Vec<RawFormat> = (0..40)
            .map(|i| match i % 4 {
                0 => video(&i.to_string(), "720p", i),
                1 => video(&i.to_string(), "1080p", i),
                2 => audio(&i.to_string(), 128.4, i),
                _ => audio(&i.to_string(), 64.0, i),
            })
            .collect();
        let menu = build_menu(&formats);

        let distinct: HashSet<_> = menu.iter().map(|e| (e.kind, e.quality_label.clone())).collect();
        assert_eq!(distinct.len(), menu.len());
        assert_eq!(menu.len(), 4);
    }

    #[test]
    fn test_height_used_when_no_text_descriptor() {
        let format = RawFormat {
            format_id: Some("18".into()),
            vcodec: Some("avc1".into()),
            acodec: Some("mp4a".into()),
            height: Some(360.0),
            filesize_approx: Some(2048.0),
            ..Default::default()
        };
        let menu = build_menu(&[format]);

        assert_eq!(menu[0].quality_label, "360");
        assert_eq!(menu[0].file_size, 2048);
    }
}
