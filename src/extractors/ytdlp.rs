use crate::config::Config;
use crate::core::engine::{ComponentStatus, DownloadOptions, MediaEngine, PostProcess};
use crate::core::metadata::RawMediaInfo;
use crate::core::progress::{ProgressEvent, ProgressSink, ProgressStatus};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Prefix of the progress lines requested through `--progress-template`.
const PROGRESS_MARKER: &str = "MEDIA-BRIDGE-PROGRESS:";

/// Field value yt-dlp renders for a missing template key.
const MISSING_FIELD: &str = "NA";

/// Drives the `yt-dlp` executable as a subprocess.
pub struct YtDlpEngine {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    no_config: bool,
    extra_args: Vec<String>,
}

impl YtDlpEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg_location: None,
            no_config: true,
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            ffmpeg_location: config.resolve_ffmpeg_location(),
            no_config: config.no_config,
            extra_args: config.extra_args.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        // Keep titles intact on hosts whose console code page is not UTF-8.
        cmd.env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if self.no_config {
            cmd.arg("--no-config");
        }
        cmd.args(["--encoding", "utf-8", "--no-warnings", "--no-playlist"]);
        if let Some(ffmpeg) = &self.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }
        cmd.args(&self.extra_args);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> BridgeError {
        BridgeError::Engine {
            program: self.program.display().to_string(),
            source,
        }
    }

    pub fn download_args(options: &DownloadOptions) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s",
                PROGRESS_MARKER
            ),
            "-f".to_string(),
            options.format_selector.clone(),
            "-o".to_string(),
            escape_output_template(&options.output_path),
        ];

        match &options.post_process {
            PostProcess::Merge { container } => {
                args.push("--merge-output-format".to_string());
                args.push(container.clone());
            }
            PostProcess::ExtractAudio { codec, quality } => {
                args.push("--extract-audio".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push(quality.clone());
            }
        }

        args
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(&self, url: &str) -> Result<RawMediaInfo> {
        debug!("Extracting metadata for {}", url);
        let output = self
            .command()
            .args(["--quiet", "--skip-download", "--no-check-formats", "--dump-single-json", "--"])
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BridgeError::Extraction(failure_message(
                stderr.lines(),
                output.status.code(),
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(BridgeError::Extraction("yt-dlp returned no metadata".to_string()));
        }

        let info: RawMediaInfo = serde_json::from_str(stdout.trim())
            .map_err(|e| BridgeError::Extraction(format!("invalid metadata from yt-dlp: {}", e)))?;
        debug!("yt-dlp listed {} formats", info.formats.len());
        Ok(info)
    }

    async fn download(&self, url: &str, options: &DownloadOptions, progress: &dyn ProgressSink) -> Result<()> {
        let mut child = self
            .command()
            .args(Self::download_args(options))
            .arg("--")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // With --quiet, yt-dlp prints progress on stderr; watch both pipes.
        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let mut diagnostics = Vec::new();
        while let Some(line) = rx.recv().await {
            match parse_progress_line(&line) {
                Some(event) => progress.on_progress(&event),
                None => {
                    debug!("yt-dlp: {}", line);
                    diagnostics.push(line);
                }
            }
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(BridgeError::Download(failure_message(
                diagnostics.iter().map(String::as_str),
                status.code(),
            )));
        }
        Ok(())
    }

    async fn component_status(&self) -> ComponentStatus {
        let ytdlp_version = probe_version(&self.program, "--version").await;
        let ffmpeg = match &self.ffmpeg_location {
            Some(path) => path.exists(),
            None => probe_version(Path::new("ffmpeg"), "-version").await.is_some(),
        };
        let deno = probe_version(Path::new("deno"), "--version").await.is_some();
        let ytdlp = ytdlp_version.is_some();
        info!("Components: yt-dlp={} ffmpeg={} deno={}", ytdlp, ffmpeg, deno);

        ComponentStatus {
            ytdlp,
            ffmpeg,
            deno,
            ytdlp_version,
            ready: ytdlp && ffmpeg && deno,
        }
    }
}

/// Forwards each line of `reader`, decoding lossily so stray non-UTF-8
/// bytes never stop the pipe from being drained.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read yt-dlp output: {}", e);
                    break;
                }
            }
        }
    });
}

/// First output line of `<program> <arg>`, when the program runs successfully.
async fn probe_version(program: &Path, arg: &str) -> Option<String> {
    let output = Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(|line| line.trim().to_string())
}

/// Parses a line produced by the progress template; other lines yield `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let start = line.find(PROGRESS_MARKER)?;
    let mut fields = line[start + PROGRESS_MARKER.len()..].splitn(4, '|');

    let status = ProgressStatus::parse(fields.next()?);
    let mut field = || {
        fields
            .next()
            .map(str::trim)
            .filter(|value| *value != MISSING_FIELD)
            .map(str::to_string)
    };

    Some(ProgressEvent {
        status,
        percent: field(),
        speed: field(),
        eta: field(),
    })
}

/// `%` starts a template field for yt-dlp, so literal ones are doubled.
fn escape_output_template(path: &Path) -> String {
    path.to_string_lossy().replace('%', "%%")
}

/// Picks the most useful line out of yt-dlp's diagnostics.
fn failure_message<'a>(lines: impl Iterator<Item = &'a str>, code: Option<i32>) -> String {
    let lines: Vec<&str> = lines.map(str::trim).filter(|l| !l.is_empty()).collect();

    let chosen = lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last());

    match chosen {
        Some(line) => line.trim_start_matches("ERROR:").trim().to_string(),
        None => match code {
            Some(code) => format!("yt-dlp exited with status {}", code),
            None => "yt-dlp was terminated by a signal".to_string(),
        },
    }
}
