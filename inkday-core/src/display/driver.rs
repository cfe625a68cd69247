//! Driver subprocess sink.
//!
//! Physical panels are driven by external binaries named
//! `inkday-driver-<name>` found on `PATH`. One driver process lives for one
//! device session: it is started by the first command, answers one JSON
//! response line per request line, and is closed after `sleep`. Drivers can be
//! written in any language.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;

use crate::display::DisplaySink;
use crate::display::protocol::{Clear, DriverCommand, Init, Render, Request, Response, Sleep};
use crate::error::{InkdayError, InkdayResult};
use crate::render::Frame;

/// A full e-paper refresh takes several seconds; this bounds a stuck driver.
const DRIVER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Driver {
    name: String,
    frame_path: PathBuf,
    session: Option<Session>,
}

impl Driver {
    /// Driver `name` showing frames persisted at `frame_path`.
    pub fn new(name: &str, frame_path: &Path) -> Self {
        Driver {
            name: name.to_string(),
            frame_path: frame_path.to_path_buf(),
            session: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binary_name(&self) -> String {
        format!("inkday-driver-{}", self.name)
    }

    fn binary_path(&self) -> InkdayResult<PathBuf> {
        which::which(self.binary_name())
            .map_err(|_| InkdayError::DriverNotInstalled(self.binary_name()))
    }

    pub fn is_installed(&self) -> bool {
        self.binary_path().is_ok()
    }

    /// Send a typed command to the running driver, starting it if needed.
    ///
    /// A failed or timed out command ends the session; the next command starts
    /// a fresh driver process.
    pub async fn call<C: DriverCommand>(&mut self, cmd: C) -> InkdayResult<C::Response> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                tracing::debug!(driver = %self.name, "starting display driver");
                Session::spawn(&self.binary_path()?, &[])?
            }
        };
        let session = self.session.insert(session);

        tracing::debug!(driver = %self.name, command = ?C::command(), "calling display driver");
        let result = match timeout(DRIVER_TIMEOUT, session.request(cmd)).await {
            Ok(result) => result,
            Err(_) => Err(InkdayError::DriverTimeout(DRIVER_TIMEOUT.as_secs())),
        };

        if result.is_err() {
            self.session = None;
        }
        result
    }

    async fn end_session(&mut self) -> InkdayResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        timeout(DRIVER_TIMEOUT, session.close())
            .await
            .map_err(|_| InkdayError::DriverTimeout(DRIVER_TIMEOUT.as_secs()))?
    }
}

/// One running driver process.
#[derive(Debug)]
struct Session {
    child: Child,
    stdin: ChildStdin,
    responses: Lines<BufReader<ChildStdout>>,
}

impl Session {
    fn spawn(program: &Path, args: &[&str]) -> InkdayResult<Self> {
        let mut child = TokioCommand::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                InkdayError::Driver(format!("Failed to spawn {}: {}", program.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InkdayError::Driver("Driver stdin was not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InkdayError::Driver("Driver stdout was not captured".into()))?;

        Ok(Session {
            child,
            stdin,
            responses: BufReader::new(stdout).lines(),
        })
    }

    async fn request<C: DriverCommand>(&mut self, cmd: C) -> InkdayResult<C::Response> {
        let line = encode_request(cmd)?;
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        decode_response(self.responses.next_line().await?)
    }

    /// Close stdin and wait for the driver to exit.
    async fn close(self) -> InkdayResult<()> {
        let Session { mut child, stdin, .. } = self;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            return Err(InkdayError::Driver(format!(
                "Driver exited with status: {}",
                status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }
}

/// One request line, newline included.
fn encode_request<C: DriverCommand>(cmd: C) -> InkdayResult<String> {
    let params =
        serde_json::to_value(cmd).map_err(|e| InkdayError::Serialization(e.to_string()))?;
    let request = Request {
        command: C::command(),
        params,
    };
    let json =
        serde_json::to_string(&request).map_err(|e| InkdayError::Serialization(e.to_string()))?;
    Ok(format!("{json}\n"))
}

/// `None` means the driver closed stdout before answering.
fn decode_response<R: serde::de::DeserializeOwned>(line: Option<String>) -> InkdayResult<R> {
    let line = line
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| InkdayError::Driver("Driver returned no response".into()))?;

    let response: Response<R> = serde_json::from_str(&line)
        .map_err(|e| InkdayError::Driver(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(InkdayError::Driver(error)),
    }
}

impl DisplaySink for Driver {
    async fn init(&mut self) -> InkdayResult<()> {
        self.call(Init {}).await
    }

    async fn clear(&mut self) -> InkdayResult<()> {
        self.call(Clear {}).await
    }

    /// Persist the frame, then hand its path to the driver.
    async fn render(&mut self, frame: &Frame) -> InkdayResult<()> {
        frame.save(&self.frame_path)?;
        let path = std::path::absolute(&self.frame_path)?;
        self.call(Render {
            path: path.to_string_lossy().into_owned(),
            width: frame.width(),
            height: frame.height(),
        })
        .await
    }

    /// Put the panel to sleep and end the driver process.
    async fn sleep(&mut self) -> InkdayResult<()> {
        let slept = self.call(Sleep {}).await;
        let closed = self.end_session().await;
        slept.and(closed)
    }
}
