//! Upload decoding: still images in memory, videos as a raw frame stream.

use image::RgbImage;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::ChildStdout;
use tracing::{debug, warn};

use crate::command::{FfmpegCommand, FfmpegProcess};
use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Decode an uploaded still image into RGB pixels.
///
/// The format is sniffed from the bytes, not trusted from the file name.
pub fn decode_image(bytes: &[u8]) -> MediaResult<RgbImage> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Sequential reader of decoded `rgb24` frames.
///
/// FFmpeg writes frames back to back on stdout; each read pulls exactly one
/// frame of `width * height * 3` bytes until the stream is exhausted.
pub struct FrameReader {
    process: FfmpegProcess,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
}

impl FrameReader {
    /// Start decoding `path` with the geometry reported by the probe.
    pub fn open(path: impl AsRef<Path>, info: &VideoInfo) -> MediaResult<Self> {
        let mut process = FfmpegCommand::decode_from(path.as_ref())
            .no_autorotate()
            .raw_rgb_output()
            .spawn()?;
        let stdout = process.take_stdout()?;

        Ok(Self {
            process,
            stdout,
            width: info.width,
            height: info.height,
            frame_len: info.rgb_frame_len(),
            frames_read: 0,
        })
    }

    /// Read the next frame, or `None` once the stream ends.
    ///
    /// A trailing partial frame is discarded.
    pub async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let frame_len = self.frame_len;
        let mut buffer = vec![0u8; frame_len];
        let filled = read_full(&mut self.stdout, &mut buffer).await?;

        if filled == 0 {
            return Ok(None);
        }
        if filled < frame_len {
            warn!(
                filled,
                expected = frame_len,
                frames_read = self.frames_read,
                "Discarding truncated trailing frame"
            );
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| MediaError::internal("Failed to create frame buffer"))
    }

    /// Wait for the decoder to exit and surface any FFmpeg failure.
    pub async fn finish(self) -> MediaResult<u64> {
        let frames = self.frames_read;
        drop(self.stdout);
        self.process.wait("FFmpeg decoder").await?;
        debug!(frames, "Video decode finished");
        Ok(frames)
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
