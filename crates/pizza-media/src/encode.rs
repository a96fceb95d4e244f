//! Annotated video output.

use image::RgbImage;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegProcess};
use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Codec used when none is configured (MPEG-4 Part 2, the `mp4v` fourcc).
pub const DEFAULT_VIDEO_CODEC: &str = "mpeg4";

/// Writes `rgb24` frames to an FFmpeg encoder at a fixed size and rate.
pub struct FrameWriter {
    process: FfmpegProcess,
    stdin: ChildStdin,
    output: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FrameWriter {
    /// Start an encoder producing `output` with the source geometry.
    pub fn create(output: impl AsRef<Path>, info: &VideoInfo, codec: &str) -> MediaResult<Self> {
        let output = output.as_ref().to_path_buf();
        let mut process = FfmpegCommand::encode_to(&output)
            .raw_rgb_input(info.width, info.height, info.fps)
            .video_codec(codec)
            .pixel_format("yuv420p")
            .no_audio()
            .spawn()?;
        let stdin = process.take_stdin()?;

        Ok(Self {
            process,
            stdin,
            output,
            width: info.width,
            height: info.height,
            frames_written: 0,
        })
    }

    /// Append one frame; its size must match the stream geometry.
    pub async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::internal(format!(
                "Frame size {}x{} does not match output {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        self.stdin.write_all(frame.as_raw()).await?;
        self.frames_written += 1;
        Ok(())
    }

    /// Close the input pipe and wait for the encoder to flush the file.
    pub async fn finish(mut self) -> MediaResult<PathBuf> {
        self.stdin.shutdown().await?;
        drop(self.stdin);
        self.process.wait("FFmpeg encoder").await?;
        debug!(
            frames = self.frames_written,
            output = %self.output.display(),
            "Video encode finished"
        );
        Ok(self.output)
    }
}
