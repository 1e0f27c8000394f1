//! ffmpeg-backed frame source
//!
//! Spawns an ffmpeg child process decoding a V4L2 device or media file to
//! rawvideo rgb24 on stdout and pulls one frame per read.

use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info};

use crate::frame::VideoFrame;
use crate::{CaptureError, FrameSource, SourceConfig};

/// Frame source reading rgb24 rawvideo from an ffmpeg child process.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
    sequence: u32,
    closed: bool,
}

impl FfmpegSource {
    /// Spawn ffmpeg for the configured device or file.
    pub fn open(config: &SourceConfig) -> Result<Self, CaptureError> {
        if config.width == 0 || config.height == 0 {
            return Err(CaptureError::Format(format!(
                "invalid capture geometry {}x{}",
                config.width, config.height
            )));
        }

        let input = device_uri(&config.device);
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner").arg("-loglevel").arg("error");

        if input.starts_with("/dev/video") {
            cmd.arg("-f")
                .arg("video4linux2")
                .arg("-framerate")
                .arg(config.fps.to_string());
        }

        cmd.arg("-i")
            .arg(&input)
            .arg("-vf")
            .arg(format!("scale={}:{}", config.width, config.height))
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| CaptureError::Open(format!("failed to spawn ffmpeg: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Open("ffmpeg stdout not captured".to_string()))?;

        info!(
            input = %input,
            width = config.width,
            height = config.height,
            fps = config.fps,
            "opened ffmpeg frame source"
        );

        Ok(Self {
            child,
            stdout,
            width: config.width,
            height: config.height,
            frame_len: (config.width * config.height * 3) as usize,
            sequence: 0,
            closed: false,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        if self.closed {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => {
                let frame = VideoFrame::new(buf, self.width, self.height, self.sequence);
                self.sequence = self.sequence.wrapping_add(1);
                Ok(Some(frame))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!(frames = self.sequence, "ffmpeg stream ended");
                Ok(None)
            }
            Err(e) => Err(CaptureError::Stream(e.to_string())),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
        debug!(frames = self.sequence, "ffmpeg frame source closed");
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Normalize a bare device index ("0") into its `/dev/videoN` path; other
/// inputs pass through untouched.
fn device_uri(device: &str) -> String {
    if let Ok(index) = device.parse::<u32>() {
        return format!("/dev/video{index}");
    }
    device.to_string()
}
