//! Adapter around the `exiftool` executable
//!
//! Includes:
//! - The `MetadataTool` seam the pipeline talks to
//! - `ExifTool`, which keeps one stay-open exiftool process and bounds
//!   every request with a timeout
//! - Argument construction and output parsing

pub mod args;
pub mod parse;

pub use args::TagValue;
pub use parse::WriteResult;

use crate::common::errors::ExifError;
use crate::config::NodeConfig;
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    sync::Mutex,
    time::timeout,
};

/// The five operations the pipeline needs from a metadata tool.
///
/// Every call may suspend until the external process finishes. Implementations
/// do not retry.
pub trait MetadataTool: Send + Sync {
    /// `raw = false` returns the standardized representation, `raw = true`
    /// the tool's output untouched. Both come from the same invocation.
    fn read_metadata(
        &self,
        path: &Path,
        raw: bool,
    ) -> impl Future<Output = Result<Value, ExifError>> + Send;

    fn write_tag(
        &self,
        path: &Path,
        tag: &str,
        value: &TagValue,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send;

    fn delete_all_tags(
        &self,
        path: &Path,
        retain: Option<&[String]>,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send;

    fn rewrite_all_tags(
        &self,
        path: &Path,
        destination: &Path,
    ) -> impl Future<Output = Result<(), ExifError>> + Send;

    /// Read-only custom argument list. Lists with an assignment token are
    /// rejected with `UnsupportedOperation`.
    fn custom_command(
        &self,
        path: &Path,
        args: &[String],
    ) -> impl Future<Output = Result<Option<Value>, ExifError>> + Send;
}

struct ToolOutput {
    stdout: String,
    stderr: String,
}

/// Drives one long-lived `exiftool -stay_open True -@ -` process.
///
/// Requests are serialized through a mutex and framed by `{readyN}` markers
/// on stdout and stderr. A request that fails at the process level or runs
/// past the timeout drops the child (killing it), and the next request
/// starts a fresh one.
#[derive(Debug)]
pub struct ExifTool {
    program: PathBuf,
    timeout: Duration,
    session: Mutex<Option<Session>>,
    sequence: AtomicU64,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            session: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(&config.exiftool_path, config.tool_timeout())
    }

    /// Health check: the installed exiftool version.
    pub async fn version(&self) -> Result<String, ExifError> {
        let output = self.execute(vec!["-ver".into()]).await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Ask the running process to exit and wait for it. No-op when nothing
    /// is running.
    pub async fn shutdown(&self) -> Result<(), ExifError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        match timeout(self.timeout, session.close()).await {
            Ok(result) => result,
            Err(_) => Err(ExifError::tool(format!(
                "{:?} did not exit within {:?}",
                self.program, self.timeout
            ))),
        }
    }

    async fn execute(&self, args: Vec<OsString>) -> Result<ToolOutput, ExifError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.session.lock().await;
        if slot.is_none() {
            *slot = Some(Session::spawn(&self.program)?);
        }
        let session = slot
            .as_mut()
            .ok_or_else(|| ExifError::tool("exiftool session unavailable"))?;

        debug!("Request {} to {:?}: {:?}", id, self.program, args);
        let result = timeout(self.timeout, session.request(&args, id)).await;
        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                *slot = None;
                return Err(err);
            }
            Err(_) => {
                warn!("Killing {:?} after request {} timed out", self.program, id);
                *slot = None;
                return Err(ExifError::tool(format!(
                    "{:?} did not finish within {:?}",
                    self.program, self.timeout
                )));
            }
        };

        match parse::reported_error(&output.stderr) {
            Some(message) => Err(ExifError::tool(message)),
            None => Ok(output),
        }
    }

    #[cfg(test)]
    async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

#[derive(Debug)]
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
}

impl Session {
    fn spawn(program: &Path) -> Result<Self, ExifError> {
        let mut child = Command::new(program)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ExifError::tool(format!("failed to spawn {:?}: {}", program, err)))?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            return Err(ExifError::tool(format!("{:?} has no stdio pipes", program)));
        };

        info!("Started {:?} in stay-open mode", program);
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
        })
    }

    async fn request(&mut self, argv: &[OsString], id: u64) -> Result<ToolOutput, ExifError> {
        let marker = format!("{{ready{}}}", id);

        let mut payload = Vec::new();
        for arg in argv {
            payload.extend(args::arg_line(arg));
        }
        // -echo4 prints the marker to stderr once the command has finished
        payload.extend(format!("-echo4\n{}\n-execute{}\n", marker, id).into_bytes());

        // A process that already died shows up as EOF below, with its stderr
        if let Err(err) = self.send(&payload).await {
            debug!("Could not send request {}: {}", id, err);
        }

        let (stdout, stderr) = tokio::join!(
            read_until_marker(&mut self.stdout, &marker),
            read_until_marker(&mut self.stderr, &marker)
        );
        let read_error = |err: io::Error| ExifError::tool(format!("failed to read output: {}", err));
        let (stdout, stdout_done) = stdout.map_err(read_error)?;
        let (stderr, stderr_done) = stderr.map_err(read_error)?;

        if !(stdout_done && stderr_done) {
            let status = self.child.try_wait().ok().flatten();
            let message = parse::error_message(&stderr).unwrap_or_else(|| match status {
                Some(status) => format!("exited with {}", status),
                None => "closed its output unexpectedly".to_string(),
            });
            return Err(ExifError::tool(message));
        }

        Ok(ToolOutput { stdout, stderr })
    }

    async fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.stdin.write_all(payload).await?;
        self.stdin.flush().await
    }

    async fn close(mut self) -> Result<(), ExifError> {
        let stop = self.send(b"-stay_open\nFalse\n").await;
        if let Err(err) = stop {
            debug!("exiftool stdin already closed: {}", err);
        }
        drop(self.stdin);
        let status = self
            .child
            .wait()
            .await
            .map_err(|err| ExifError::tool(format!("failed to wait for exit: {}", err)))?;
        info!("exiftool exited with {}", status);
        Ok(())
    }
}

/// Collect lines until one ends with `marker`. The flag is false when the
/// stream hit EOF first.
async fn read_until_marker<R>(reader: &mut R, marker: &str) -> io::Result<(String, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let mut output = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok((output, false));
        }
        let text = String::from_utf8_lossy(&line);
        if let Some(rest) = text.trim_end().strip_suffix(marker) {
            output.push_str(rest);
            return Ok((output, true));
        }
        output.push_str(&text);
    }
}

impl MetadataTool for ExifTool {
    fn read_metadata(
        &self,
        path: &Path,
        raw: bool,
    ) -> impl Future<Output = Result<Value, ExifError>> + Send {
        async move {
            let output = self.execute(args::read_args(path)).await?;
            let tags = parse::parse_json_output(&output.stdout)?.unwrap_or_else(|| json!({}));
            if raw {
                Ok(tags)
            } else {
                Ok(parse::normalize_tags(tags))
            }
        }
    }

    fn write_tag(
        &self,
        path: &Path,
        tag: &str,
        value: &TagValue,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send {
        async move {
            let output = self.execute(args::write_tag_args(path, tag, value)).await?;
            Ok(parse::parse_write_summary(&output.stdout, &output.stderr))
        }
    }

    fn delete_all_tags(
        &self,
        path: &Path,
        retain: Option<&[String]>,
    ) -> impl Future<Output = Result<WriteResult, ExifError>> + Send {
        async move {
            let output = self.execute(args::delete_args(path, retain)).await?;
            Ok(parse::parse_write_summary(&output.stdout, &output.stderr))
        }
    }

    fn rewrite_all_tags(
        &self,
        path: &Path,
        destination: &Path,
    ) -> impl Future<Output = Result<(), ExifError>> + Send {
        async move {
            self.execute(args::rewrite_args(path, destination)).await?;
            Ok(())
        }
    }

    fn custom_command(
        &self,
        path: &Path,
        tokens: &[String],
    ) -> impl Future<Output = Result<Option<Value>, ExifError>> + Send {
        async move {
            if args::is_write_command(tokens) {
                return Err(ExifError::UnsupportedOperation(
                    "write-style custom commands are not supported; use the write operation instead"
                        .to_string(),
                ));
            }
            let output = self.execute(args::custom_args(path, tokens)).await?;
            match parse::parse_json_output(&output.stdout) {
                Ok(value) => Ok(value),
                // Options such as `-ver` print plain text even with `-json`
                Err(_) => Ok(Some(json!({ "output": output.stdout.trim() }))),
            }
        }
    }
}
