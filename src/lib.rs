pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extractors;
pub mod utils;

pub use self::core::{build_menu, Downloader, MediaEngine, MediaInfo, MenuEntry, RawFormat};
pub use error::BridgeError;
pub use extractors::YtDlpEngine;
