//! Streaming child process supervision.
//!
//! Runs an external command with stdout and stderr piped, delivers every
//! output line to the caller as it arrives, and polls the cancellation
//! token between deliveries. Tools that redraw progress bars in place
//! terminate lines with `\r`, so the splitter treats both `\r` and `\n`
//! as line boundaries.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use super::types::{ExitResult, ProcessError, ProcessResult};
use crate::cancel::CancelToken;

/// Poll interval for the cancellation flag while waiting on output.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// A fully assembled external command, ready to run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a spec for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// The program this spec will run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument list.
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// One-line rendering for logs and console echoes.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Locate the executable without spawning it.
    ///
    /// Bare names are looked up on PATH; explicit paths must exist.
    fn locate(&self) -> ProcessResult<PathBuf> {
        let name = self.program.to_string_lossy().to_string();
        if self.program.components().count() > 1 {
            if self.program.exists() {
                return Ok(self.program.clone());
            }
            return Err(ProcessError::tool_not_found(name));
        }
        which::which(&self.program).map_err(|_| ProcessError::tool_not_found(name))
    }
}

/// Run a command, streaming combined output line-by-line.
///
/// Each line written by the child to stdout or stderr is passed to
/// `on_line` as it arrives. The cancellation token is polled between
/// deliveries; on cancellation the child is killed (not abandoned) and
/// the returned [`ExitResult`] has `cancelled = true`.
///
/// A non-zero exit code is reported through the `ExitResult`, not as an
/// error. Only a missing executable or an I/O failure while supervising
/// the child produce `Err`.
pub fn run_streaming(
    spec: &CommandSpec,
    on_line: &mut dyn FnMut(&str),
    cancel: &CancelToken,
) -> ProcessResult<ExitResult> {
    let program = spec.locate()?;

    tracing::debug!("Running: {}", spec.display_line());

    let mut cmd = Command::new(&program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(ref dir) = spec.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.envs {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::io(format!("spawning {}", program.display()), e))?;

    let (tx, rx) = crossbeam_channel::unbounded::<String>();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_pump = stdout.map(|pipe| {
        let tx = tx.clone();
        std::thread::spawn(move || pump_lines(pipe, &tx))
    });
    let err_pump = stderr.map(|pipe| {
        let tx = tx.clone();
        std::thread::spawn(move || pump_lines(pipe, &tx))
    });
    drop(tx);

    // Deliver lines until both pipes close, polling cancellation in the gaps.
    let was_cancelled = loop {
        if cancel.is_cancelled() {
            break true;
        }
        match rx.recv_timeout(CANCEL_POLL) {
            Ok(line) => on_line(&line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break false,
        }
    };

    if was_cancelled {
        tracing::info!("Cancelling child process: {}", program.display());
        let _ = child.kill();
    }

    let status = child
        .wait()
        .map_err(|e| ProcessError::io(format!("waiting for {}", program.display()), e))?;

    if let Some(handle) = out_pump {
        let _ = handle.join();
    }
    if let Some(handle) = err_pump {
        let _ = handle.join();
    }

    // Flush lines that arrived between the last delivery and process exit.
    if !was_cancelled {
        for line in rx.try_iter() {
            on_line(&line);
        }
    }

    Ok(ExitResult {
        code: status.code().unwrap_or(-1),
        cancelled: was_cancelled,
    })
}

/// Read a pipe to EOF, emitting a line at every `\r` or `\n` boundary.
///
/// Empty segments (e.g. from `\r\n` sequences) are dropped. A trailing
/// unterminated segment is flushed at EOF.
fn pump_lines<R: Read>(mut reader: R, tx: &Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut acc: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !acc.is_empty() {
                    if tx.send(String::from_utf8_lossy(&acc).into_owned()).is_err() {
                        return;
                    }
                    acc.clear();
                }
            } else {
                acc.push(byte);
            }
        }
    }

    if !acc.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&acc).into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn split_all(input: &[u8]) -> Vec<String> {
        let (tx, rx) = crossbeam_channel::unbounded();
        pump_lines(Cursor::new(input.to_vec()), &tx);
        drop(tx);
        rx.iter().collect()
    }

    #[test]
    fn splits_on_newline_and_carriage_return() {
        let lines = split_all(b"alpha\nbeta\rgamma\r\ndelta");
        assert_eq!(lines, vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn drops_empty_segments() {
        let lines = split_all(b"\r\n\r\none\n\n");
        assert_eq!(lines, vec!["one"]);
    }

    #[test]
    fn flushes_unterminated_tail() {
        let lines = split_all(b"no newline at end");
        assert_eq!(lines, vec!["no newline at end"]);
    }

    #[test]
    fn missing_tool_fails_before_spawn() {
        let spec = CommandSpec::new("definitely_not_a_real_tool_12345");
        let mut seen = Vec::new();
        let result = run_streaming(&spec, &mut |l| seen.push(l.to_string()), &CancelToken::new());
        assert!(matches!(result, Err(ProcessError::ToolNotFound { .. })));
        assert!(seen.is_empty());
    }

    #[test]
    fn missing_explicit_path_fails_before_spawn() {
        let spec = CommandSpec::new("/nonexistent/bin/tool");
        let result = run_streaming(&spec, &mut |_| {}, &CancelToken::new());
        assert!(matches!(result, Err(ProcessError::ToolNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn streams_lines_and_reports_exit_code() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo one; echo two 1>&2; exit 3");

        let mut lines = Vec::new();
        let result = run_streaming(&spec, &mut |l| lines.push(l.to_string()), &CancelToken::new())
            .expect("sh should be available");

        assert_eq!(result.code, 3);
        assert!(!result.cancelled);
        assert!(result.failed());
        assert!(lines.contains(&"one".to_string()));
        assert!(lines.contains(&"two".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_terminates_child() {
        let spec = CommandSpec::new("sh").arg("-c").arg("sleep 30");
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = run_streaming(&spec, &mut |_| {}, &cancel).expect("sh should be available");
        assert!(result.cancelled);
        assert!(!result.failed());
    }

    #[cfg(unix)]
    #[test]
    fn working_directory_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh").arg("-c").arg("pwd").cwd(dir.path());

        let mut lines = Vec::new();
        let result =
            run_streaming(&spec, &mut |l| lines.push(l.to_string()), &CancelToken::new()).unwrap();

        assert!(result.success());
        let reported = lines.first().map(PathBuf::from).unwrap();
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
