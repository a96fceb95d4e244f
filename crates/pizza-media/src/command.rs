//! FFmpeg command builder for raw frame pipes.
//!
//! Decoding reads `rgb24` frames from FFmpeg's stdout and encoding feeds
//! them through stdin, so both ends of a command may be either a file or
//! the `-` pipe target.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Pipe target understood by FFmpeg as stdin/stdout.
pub const PIPE: &str = "-";

/// Trailing bytes of FFmpeg stderr kept for error reports.
pub const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Input or output endpoint of an FFmpeg command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    File(PathBuf),
    Pipe,
}

impl Endpoint {
    fn as_arg(&self) -> String {
        match self {
            Endpoint::File(path) => path.to_string_lossy().to_string(),
            Endpoint::Pipe => PIPE.to_string(),
        }
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: Endpoint,
    output: Endpoint,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Decode a file into a pipe.
    pub fn decode_from(input: impl AsRef<Path>) -> Self {
        Self::new(Endpoint::File(input.as_ref().to_path_buf()), Endpoint::Pipe)
    }

    /// Encode a pipe into a file.
    pub fn encode_to(output: impl AsRef<Path>) -> Self {
        Self::new(Endpoint::Pipe, Endpoint::File(output.as_ref().to_path_buf()))
    }

    pub fn new(input: Endpoint, output: Endpoint) -> Self {
        Self {
            input,
            output,
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Describe raw `rgb24` frames of the given geometry on the input side.
    pub fn raw_rgb_input(self, width: u32, height: u32, fps: f64) -> Self {
        self.input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgb24")
            .input_arg("-s")
            .input_arg(format!("{}x{}", width, height))
            .input_arg("-r")
            .input_arg(format!("{:.3}", fps))
    }

    /// Emit raw `rgb24` frames on the output side.
    pub fn raw_rgb_output(self) -> Self {
        self.output_arg("-f")
            .output_arg("rawvideo")
            .output_arg("-pix_fmt")
            .output_arg("rgb24")
    }

    /// Keep the stored frame orientation so decoded frames match the probed size.
    pub fn no_autorotate(self) -> Self {
        self.input_arg("-noautorotate")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.as_arg());

        args.extend(self.output_args.clone());
        args.push(self.output.as_arg());

        args
    }

    /// Spawn FFmpeg with pipes wired according to the endpoints.
    ///
    /// Stderr is read on a background task for the whole life of the
    /// process, so a chatty decoder never stalls on a full pipe.
    pub fn spawn(&self) -> MediaResult<FfmpegProcess> {
        check_ffmpeg()?;

        let args = self.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let stdin = match self.input {
            Endpoint::Pipe => Stdio::piped(),
            Endpoint::File(_) => Stdio::null(),
        };
        let stdout = match self.output {
            Endpoint::Pipe => Stdio::piped(),
            Endpoint::File(_) => Stdio::null(),
        };

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stderr", None, None)
        })?;
        let stderr = tokio::spawn(read_tail(stderr, STDERR_TAIL_BYTES));

        Ok(FfmpegProcess { child, stderr })
    }
}

/// A running FFmpeg child with its stderr being drained.
///
/// Dropping it kills the process.
pub struct FfmpegProcess {
    child: Child,
    stderr: JoinHandle<Vec<u8>>,
}

impl FfmpegProcess {
    /// Take the frame output pipe.
    pub fn take_stdout(&mut self) -> MediaResult<ChildStdout> {
        self.child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })
    }

    /// Take the frame input pipe.
    pub fn take_stdin(&mut self) -> MediaResult<ChildStdin> {
        self.child.stdin.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdin", None, None)
        })
    }

    /// Wait for exit and turn a non-zero status into an error carrying the
    /// tail of stderr.
    pub async fn wait(self, context: &str) -> MediaResult<()> {
        let Self { mut child, stderr } = self;
        let status = child.wait().await?;
        let tail = stderr.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&tail).trim().to_string();
        Err(MediaError::ffmpeg_failed(
            format!("{} exited with non-zero status", context),
            (!stderr.is_empty()).then_some(stderr),
            status.code(),
        ))
    }
}

/// Read `reader` to EOF, keeping only the last `limit` bytes.
async fn read_tail<R>(mut reader: R, limit: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut tail = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
        }
    }

    tail
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
