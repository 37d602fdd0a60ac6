//! Face landmarker boundary.
//!
//! The landmark and blendshape model runs outside this process. The pipeline
//! talks to it through [`FaceLandmarker`]; [`SidecarLandmarker`] drives a
//! child process over a line-oriented protocol on stdin/stdout:
//!
//! ```text
//! -> {"timestamp_ms":0,"width":640,"height":480,"format":"rgb24","bytes":921600}\n
//! -> <921600 raw RGB bytes>
//! <- {"status":"ok","faces":[{"landmarks":[[x,y,z],...],"blendshapes":{...},"transform":[...]}]}\n
//! ```

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
#[cfg(unix)]
use std::os::unix::process::CommandExt;

use mpface_media::FrameRecord;
use mpface_models::{DetectionResult, FaceResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DetectorError;

/// Frame pixel layout sent to the sidecar.
const FRAME_FORMAT: &str = "rgb24";

/// Per-frame face landmark, blendshape and head-pose detection.
///
/// Calls block until the result is available. Implementations running a
/// video-mode model may keep tracking state between calls, so timestamps
/// must never decrease.
pub trait FaceLandmarker: Send {
    fn detect(
        &mut self,
        frame: &FrameRecord,
        timestamp_ms: u64,
    ) -> Result<DetectionResult, DetectorError>;
}

#[derive(Debug, Serialize)]
struct FrameHeader<'a> {
    timestamp_ms: u64,
    width: u32,
    height: u32,
    format: &'a str,
    bytes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum SidecarResponse {
    Ok {
        #[serde(default)]
        faces: Vec<FaceResult>,
    },
    Error {
        error: String,
    },
}

/// Send one frame and read the matching response.
fn exchange<W, R>(
    writer: &mut W,
    reader: &mut R,
    frame: &FrameRecord,
    timestamp_ms: u64,
) -> Result<DetectionResult, DetectorError>
where
    W: Write,
    R: BufRead,
{
    let pixels = frame.pixels.as_raw();
    let header = FrameHeader {
        timestamp_ms,
        width: frame.width(),
        height: frame.height(),
        format: FRAME_FORMAT,
        bytes: pixels.len(),
    };
    let header = serde_json::to_string(&header)
        .map_err(|e| DetectorError::protocol(format!("Failed to encode frame header: {}", e)))?;

    writeln!(writer, "{}", header)?;
    writer.write_all(pixels)?;
    writer.flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(DetectorError::Exited);
    }

    let response: SidecarResponse = serde_json::from_str(line.trim_end())
        .map_err(|e| DetectorError::protocol(format!("Invalid response: {}", e)))?;

    match response {
        SidecarResponse::Ok { faces } => Ok(DetectionResult::new(faces)),
        SidecarResponse::Error { error } => Err(DetectorError::Reported(error)),
    }
}

/// Landmarker running as a child process.
pub struct SidecarLandmarker {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    last_timestamp_ms: Option<u64>,
}

impl SidecarLandmarker {
    /// Spawn the sidecar. `command[0]` is the program, the rest its arguments.
    pub fn spawn(command: &[String]) -> Result<Self, DetectorError> {
        let (program, args) = command.split_first().ok_or(DetectorError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        // Own process group so a terminal Ctrl-C reaches only the driver
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| DetectorError::Spawn {
                command: command.join(" "),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DetectorError::protocol("Detector stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectorError::protocol("Detector stdout not captured"))?;

        info!(command = %command.join(" "), pid = child.id(), "Started landmarker sidecar");

        Ok(Self {
            process: child,
            stdin,
            stdout: BufReader::new(stdout),
            last_timestamp_ms: None,
        })
    }

    /// OS process id of the sidecar.
    pub fn id(&self) -> u32 {
        self.process.id()
    }
}

impl FaceLandmarker for SidecarLandmarker {
    fn detect(
        &mut self,
        frame: &FrameRecord,
        timestamp_ms: u64,
    ) -> Result<DetectionResult, DetectorError> {
        check_timestamp(&mut self.last_timestamp_ms, timestamp_ms)?;

        let result = exchange(&mut self.stdin, &mut self.stdout, frame, timestamp_ms)?;
        debug!(
            frame = frame.index,
            timestamp_ms,
            faces = result.faces.len(),
            "Landmarker response"
        );
        Ok(result)
    }
}

impl Drop for SidecarLandmarker {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            warn!(error = %e, "Failed to stop landmarker sidecar");
        }
        let _ = self.process.wait();
    }
}

/// Reject timestamps lower than the previous one.
pub(crate) fn check_timestamp(last: &mut Option<u64>, timestamp_ms: u64) -> Result<(), DetectorError> {
    if let Some(previous_ms) = *last {
        if timestamp_ms < previous_ms {
            return Err(DetectorError::TimestampRegression {
                timestamp_ms,
                previous_ms,
            });
        }
    }
    *last = Some(timestamp_ms);
    Ok(())
}
