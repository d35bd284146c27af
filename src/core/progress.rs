use crate::core::output::LineSink;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Line emitted once the engine reports a finished transfer.
pub const FINISHED_LINE: &str = "DATA:100.0|0KiB/s|00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Other,
}

impl ProgressStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "downloading" => Self::Downloading,
            "finished" => Self::Finished,
            _ => Self::Other,
        }
    }
}

/// One progress callback from the engine. The strings are the engine's own
/// human-readable renderings and may carry padding or terminal escapes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub percent: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

impl ProgressEvent {
    pub fn downloading(percent: &str, speed: &str, eta: &str) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            percent: Some(percent.to_string()),
            speed: Some(speed.to_string()),
            eta: Some(eta.to_string()),
        }
    }

    pub fn finished() -> Self {
        Self {
            status: ProgressStatus::Finished,
            percent: None,
            speed: None,
            eta: None,
        }
    }
}

/// Receives progress callbacks. The engine may call from any of its tasks.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Renders progress events as `DATA:<percent>|<speed>|<eta>` lines.
pub struct ProgressTranslator<S> {
    sink: S,
}

impl<S: LineSink> ProgressTranslator<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// The line for `event`, if the host should see one.
    pub fn render(event: &ProgressEvent) -> Option<String> {
        match event.status {
            ProgressStatus::Downloading => {
                let percent = clean_percent(event.percent.as_deref().unwrap_or("0%"));
                let speed = event.speed.as_deref().unwrap_or("N/A").trim();
                let eta = event.eta.as_deref().unwrap_or("00:00").trim();
                Some(format!("DATA:{}|{}|{}", percent, speed, eta))
            }
            ProgressStatus::Finished => Some(FINISHED_LINE.to_string()),
            ProgressStatus::Other => None,
        }
    }
}

impl<S: LineSink> ProgressSink for ProgressTranslator<S> {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(line) = Self::render(event) {
            if let Err(e) = self.sink.emit(&line) {
                warn!("Failed to write progress line: {}", e);
            }
        }
    }
}

fn ansi_escape() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI pattern"))
}

/// `" \x1b[0;94m 45.2%\x1b[0m"` -> `"45.2"`.
fn clean_percent(raw: &str) -> String {
    let without_escapes = ansi_escape().replace_all(raw, "");
    without_escapes
        .replace('%', "")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::output::MemorySink;

    #[test]
    fn test_downloading_line_is_trimmed() {
        let sink = MemorySink::new();
        let translator = ProgressTranslator::new(&sink);

        translator.on_progress(&ProgressEvent::downloading("45.2%", " 1.2MiB/s ", " 00:30 "));

        assert_eq!(sink.lines(), vec!["DATA:45.2|1.2MiB/s|00:30"]);
    }

    #[test]
    fn test_finished_always_reports_full() {
        let sink = MemorySink::new();
        let translator = ProgressTranslator::new(&sink);

        translator.on_progress(&ProgressEvent::downloading("12.0%", "1KiB/s", "09:00"));
        translator.on_progress(&ProgressEvent::finished());

        assert_eq!(sink.lines()[1], "DATA:100.0|0KiB/s|00:00");
    }

    #[test]
    fn test_other_status_is_silent() {
        let sink = MemorySink::new();
        let translator = ProgressTranslator::new(&sink);

        translator.on_progress(&ProgressEvent {
            status: ProgressStatus::parse("error"),
            percent: Some("50%".into()),
            speed: None,
            eta: None,
        });

        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_percent_strips_escapes_and_noise() {
        assert_eq!(clean_percent("\u{1b}[0;94m  7.3%\u{1b}[0m"), "7.3");
        assert_eq!(clean_percent(" 100%"), "100");
        assert_eq!(clean_percent("Unknown %"), "");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let event = ProgressEvent {
            status: ProgressStatus::Downloading,
            percent: None,
            speed: None,
            eta: None,
        };
        assert_eq!(
            ProgressTranslator::<MemorySink>::render(&event).as_deref(),
            Some("DATA:0|N/A|00:00")
        );
    }
}
