//! FFmpeg command builder and process helpers.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Pipe endpoint understood by FFmpeg (`-i -` / trailing `-`).
pub const PIPE: &str = "-";

/// Upper bound on captured stderr, enough for FFmpeg's error summary.
const MAX_STDERR_BYTES: usize = 16 * 1024;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path or `-` for stdin
    input: String,
    /// Output file path or `-` for stdout
    output: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
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

    /// Declare a raw RGB24 input of the given geometry (for stdin input).
    pub fn raw_rgb_input(self, width: u32, height: u32, fps: f64) -> Self {
        self.input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgb24")
            .input_arg("-s")
            .input_arg(format!("{}x{}", width, height))
            .input_arg("-r")
            .input_arg(format_rate(fps))
    }

    /// Emit raw RGB24 frames (for stdout output).
    pub fn raw_rgb_output(self) -> Self {
        self.output_arg("-f")
            .output_arg("rawvideo")
            .output_arg("-pix_fmt")
            .output_arg("rgb24")
    }

    /// Keep every decoded frame, never duplicating or dropping to match a rate.
    pub fn passthrough_timing(self) -> Self {
        self.output_arg("-fps_mode").output_arg("passthrough")
    }

    /// Drop audio streams.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        // stdin carries frame data when reading from a pipe
        if self.input != PIPE {
            args.push("-nostdin".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.clone());

        args.push(self.output.clone());

        args
    }

    /// Create a process command with stdout/stderr piped.
    ///
    /// Stdin is piped only when the input is `-`. The child is killed when
    /// its handle is dropped, so an aborted run never leaves FFmpeg behind.
    pub fn to_command(&self) -> MediaResult<Command> {
        let ffmpeg = check_ffmpeg()?;
        let args = self.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut cmd = new_command(ffmpeg);
        cmd.args(&args)
            .stdin(if self.input == PIPE {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

/// Process command for a helper binary, started in its own process group.
///
/// A terminal Ctrl-C then reaches only this process, which shuts its
/// children down through the normal close path.
pub fn new_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Format a frame rate for FFmpeg without losing precision.
pub fn format_rate(fps: f64) -> String {
    fps.to_string()
}

/// Drain a child's stderr in the background, keeping at most the tail.
pub fn collect_stderr<R>(stderr: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = stderr;
        let mut captured = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    captured.extend_from_slice(&chunk[..n]);
                    if captured.len() > MAX_STDERR_BYTES {
                        let excess = captured.len() - MAX_STDERR_BYTES;
                        captured.drain(..excess);
                    }
                }
            }
        }
        String::from_utf8_lossy(&captured).trim().to_string()
    })
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_command() {
        let cmd = FfmpegCommand::new("input.mp4", PIPE)
            .raw_rgb_output()
            .passthrough_timing();

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-nostdin".to_string()));
        assert!(args.contains(&"rawvideo".to_string()));
        assert!(args.contains(&"rgb24".to_string()));
        assert_eq!(args.last().unwrap(), "-");

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "input.mp4");
    }

    #[test]
    fn test_encode_command() {
        let cmd = FfmpegCommand::new(PIPE, "out.mp4")
            .raw_rgb_input(640, 481, 29.97)
            .no_audio()
            .video_codec("mpeg4")
            .pixel_format("yuv420p");

        let args = cmd.build_args();
        assert!(!args.contains(&"-nostdin".to_string()));
        assert!(args.contains(&"640x481".to_string()));
        assert!(args.contains(&"29.97".to_string()));

        // Input geometry must precede -i, codec must follow it
        let i = args.iter().position(|a| a == "-i").unwrap();
        let size = args.iter().position(|a| a == "640x481").unwrap();
        let codec = args.iter().position(|a| a == "mpeg4").unwrap();
        assert!(size < i && i < codec);
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_helpers_run_in_own_process_group() {
        let child = new_command("sleep")
            .arg("5")
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();

        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).unwrap();
        // Fields after the command name: state, ppid, pgrp
        let pgrp: u32 = stat
            .rsplit(')')
            .next()
            .unwrap()
            .split_whitespace()
            .nth(2)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(pgrp, pid);
    }
}
