pub mod downloader;
pub mod engine;
pub mod menu;
pub mod metadata;
pub mod output;
pub mod progress;

pub use downloader::{DownloadRequest, Downloader};
pub use engine::{ComponentStatus, DownloadOptions, MediaEngine, PostProcess};
pub use menu::build_menu;
pub use metadata::{MediaInfo, MediaKind, MenuEntry, RawFormat, RawMediaInfo};
pub use output::{LineSink, MemorySink, StderrSink, StdoutSink};
pub use progress::{ProgressEvent, ProgressSink, ProgressStatus, ProgressTranslator};
