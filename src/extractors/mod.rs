pub mod ytdlp;

pub use ytdlp::YtDlpEngine;
