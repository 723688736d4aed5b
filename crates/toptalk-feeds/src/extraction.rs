//! ExtractionAdapter: delegates line extraction to external commands.
//!
//! Each call spawns one process with its stdout piped and hands back a
//! [`RecordStream`] that owns the child for as long as the caller reads it.
//! Three failures stay distinct:
//!
//! - the process cannot be spawned → [`Error::ExtractionUnavailable`] from `run_*`;
//! - no first line within the timeout → [`Error::ExtractionStalled`] from
//!   [`RecordStream::next_record`], after which the stream is finished;
//! - a line does not parse → [`Error::MalformedRecord`]; the stream continues.
//!
//! Output is split on raw `\n` bytes and decoded lossily, so a line carrying
//! bytes that are not UTF-8 is still delivered with `U+FFFD` in their place.
//!
//! [`RecordStream::close`] closes the pipe and reaps the child. A stream
//! dropped without `close` (early `?`, `break`, panic) still kills its child
//! through `kill_on_drop`, so no exit path leaks a process.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStdout, Command};
use toptalk_core::parser::{parse_detail_line, parse_top_talker_line};
use toptalk_core::{DetailRecord, Error, LogLocation, Result, TopTalkerRecord, WindowId};

/// How long a stage may stay silent before its target counts as empty.
pub const DEFAULT_FIRST_LINE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `close` waits for a child to exit before killing it.
pub const DEFAULT_RELEASE_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// CommandSpec
// ---------------------------------------------------------------------------

/// Program and fixed leading arguments of an extraction command. Per-call
/// arguments (log path, address) are appended after these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build from a split command line, e.g. `["bash", "ip.sh"]`.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut parts = argv.into_iter();
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command(&self, extra: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }

    fn display_with(&self, extra: &[String]) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .chain(extra)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with(&[]))
    }
}

// ---------------------------------------------------------------------------
// ExtractionAdapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExtractionAdapter {
    top_talkers: CommandSpec,
    detail_search: CommandSpec,
    first_line_timeout: Duration,
    release_grace: Duration,
}

impl ExtractionAdapter {
    pub fn new(top_talkers: CommandSpec, detail_search: CommandSpec) -> Self {
        Self {
            top_talkers,
            detail_search,
            first_line_timeout: DEFAULT_FIRST_LINE_TIMEOUT,
            release_grace: DEFAULT_RELEASE_GRACE,
        }
    }

    pub fn with_first_line_timeout(mut self, timeout: Duration) -> Self {
        self.first_line_timeout = timeout;
        self
    }

    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Stage 1: `<top_talkers> <request log>` → up to `top_n` ranked addresses.
    pub fn run_top_talkers(
        &self,
        location: &LogLocation,
        window: &WindowId,
        top_n: usize,
    ) -> Result<RecordStream<TopTalkerRecord>> {
        let extra = vec![location.path().display().to_string()];
        tracing::debug!(window = %window, log = %location, "spawning top-talker extraction");
        self.spawn(&self.top_talkers, extra, top_n, parse_top_talker_line)
    }

    /// Stage 2: `<detail_search> <access log> <address>` → up to `limit` detail lines.
    pub fn run_detail_search(
        &self,
        location: &LogLocation,
        address: &str,
        limit: usize,
    ) -> Result<RecordStream<DetailRecord>> {
        let extra = vec![location.path().display().to_string(), address.to_string()];
        tracing::debug!(address, log = %location, "spawning detail search");
        self.spawn(&self.detail_search, extra, limit, parse_detail_line)
    }

    fn spawn<T>(
        &self,
        spec: &CommandSpec,
        extra: Vec<String>,
        limit: usize,
        parse: fn(&str) -> Result<T>,
    ) -> Result<RecordStream<T>> {
        let command_line = spec.display_with(&extra);
        let mut child = spec
            .command(&extra)
            .spawn()
            .map_err(|source| Error::ExtractionUnavailable {
                command: command_line.clone(),
                source,
            })?;
        let stdout = child.stdout.take().ok_or_else(|| Error::ExtractionUnavailable {
            command: command_line.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        Ok(RecordStream {
            command: command_line,
            child,
            lines: Some(BufReader::new(stdout).split(b'\n')),
            parse,
            remaining: limit,
            first_line_timeout: self.first_line_timeout,
            release_grace: self.release_grace,
            started: false,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordStream
// ---------------------------------------------------------------------------

/// Lazily parsed output of one extraction process. Finite and not restartable.
pub struct RecordStream<T> {
    command: String,
    child: Child,
    lines: Option<Split<BufReader<ChildStdout>>>,
    parse: fn(&str) -> Result<T>,
    /// Lines still allowed to be read; malformed lines count too.
    remaining: usize,
    first_line_timeout: Duration,
    release_grace: Duration,
    started: bool,
}

impl<T> RecordStream<T> {
    /// Read and parse the next line.
    ///
    /// `Ok(None)` once the process ends its output or the line budget is
    /// spent. `Err(MalformedRecord)` skips one line; any other error ends the
    /// stream and later calls return `Ok(None)`.
    pub async fn next_record(&mut self) -> Result<Option<T>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        let read = if self.started {
            lines.next_segment().await
        } else {
            match tokio::time::timeout(self.first_line_timeout, lines.next_segment()).await {
                Ok(read) => read,
                Err(_) => {
                    self.finish();
                    return Err(Error::ExtractionStalled {
                        command: self.command.clone(),
                        waited: self.first_line_timeout,
                    });
                }
            }
        };
        self.started = true;

        let line = match read {
            Ok(Some(bytes)) => decode_line(bytes),
            Ok(None) => {
                self.finish();
                return Ok(None);
            }
            Err(err) => {
                self.finish();
                return Err(err.into());
            }
        };
        self.remaining -= 1;
        (self.parse)(&line).map(Some)
    }

    fn finish(&mut self) {
        self.remaining = 0;
        self.lines = None;
    }

    /// Close the pipe and wait for the process, killing it after the grace
    /// period. Returns the exit status when one was collected.
    pub async fn close(mut self) -> Option<ExitStatus> {
        self.lines = None;
        match tokio::time::timeout(self.release_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(command = %self.command, %status, "extraction released");
                Some(status)
            }
            Ok(Err(err)) => {
                tracing::warn!(command = %self.command, error = %err, "waiting on extraction failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    command = %self.command,
                    grace = ?self.release_grace,
                    "extraction did not exit after its pipe closed; killing"
                );
                if let Err(err) = self.child.kill().await {
                    tracing::warn!(command = %self.command, error = %err, "kill failed");
                }
                None
            }
        }
    }
}

/// Decode one `\n`-split segment, dropping a trailing `\r`.
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
