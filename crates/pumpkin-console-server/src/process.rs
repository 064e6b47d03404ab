//! Child-process backend
//!
//! Runs a Pumpkin server executable with the config directory as its working
//! directory. Every stdout and stderr line goes to the registered log sink and
//! commands are written to its stdin. Stopping sends the server's own stop
//! command so worlds are saved.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;

use pumpkin_console_core::prelude::*;

use crate::backend::{LogCallback, ServerBackend};

/// Command the server understands as a graceful shutdown
pub const DEFAULT_STOP_COMMAND: &str = "stop";

/// Shell convention: command found but not executable
const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Shell convention: command not found
const EXIT_NOT_FOUND: i32 = 127;

/// A Pumpkin server running as a child process
pub struct ProcessServer {
    program: PathBuf,
    args: Vec<String>,
    stop_command: String,
    callback: Arc<RwLock<Option<LogCallback>>>,
    /// Present only while a child is accepting commands
    stdin: Mutex<Option<ChildStdin>>,
    /// Set for the whole duration of `run_from_config_dir`
    in_run: AtomicBool,
}

impl std::fmt::Debug for ProcessServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessServer")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stop_command", &self.stop_command)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ProcessServer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stop_command: DEFAULT_STOP_COMMAND.to_string(),
            callback: Arc::new(RwLock::new(None)),
            stdin: Mutex::new(None),
            in_run: AtomicBool::new(false),
        }
    }

    /// Use a different graceful stop command
    pub fn with_stop_command(mut self, command: impl Into<String>) -> Self {
        self.stop_command = command.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether a child is up and accepting commands
    pub fn is_running(&self) -> bool {
        self.stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver a console-side line through the registered sink
    fn emit(&self, line: &str) {
        emit_line(&self.callback, line);
    }

    /// Write one command line to the child's stdin.
    fn write_line(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().unwrap_or_else(PoisonError::into_inner);
        let pipe = stdin.as_mut().ok_or(Error::ServerNotRunning)?;
        pipe.write_all(line.as_bytes())?;
        pipe.write_all(b"\n")?;
        pipe.flush()?;
        Ok(())
    }

    fn spawn(&self, config_dir: &Path) -> std::io::Result<Child> {
        info!(
            "Spawning server: {} {}",
            self.program.display(),
            self.args.join(" ")
        );
        Command::new(&self.program)
            .args(&self.args)
            .current_dir(config_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }
}

/// Forward a line to the sink, if one is registered.
fn emit_line(callback: &RwLock<Option<LogCallback>>, line: &str) {
    let callback = callback
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(callback) = callback {
        callback(line);
    }
}

/// Read lines from a child pipe until EOF, forwarding each to the sink
fn spawn_reader<R>(
    name: &'static str,
    pipe: R,
    callback: Arc<RwLock<Option<LogCallback>>>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("server-{name}"))
        .spawn(move || {
            let mut reader = BufReader::new(pipe);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        // Invalid UTF-8 is replaced, never allowed to end the stream
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\r', '\n']);
                        trace!("{}: {}", name, line);
                        emit_line(&callback, line);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("{} reader stopped: {}", name, e);
                        break;
                    }
                }
            }
            debug!("{} reader finished", name);
        })
}

/// Map a child's exit status to the console's exit code.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

impl ServerBackend for ProcessServer {
    fn register_logger(&self, callback: LogCallback) {
        let mut slot = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(callback);
    }

    fn run_from_config_dir(&self, config_dir: &Path) -> i32 {
        if self.in_run.swap(true, Ordering::AcqRel) {
            warn!("Server process is already running");
            self.emit("[WARN] Server is already running");
            return EXIT_CANNOT_EXECUTE;
        }

        let mut child = match self.spawn(config_dir) {
            Ok(child) => child,
            Err(e) => {
                self.in_run.store(false, Ordering::Release);
                let err = Error::process_spawn(e.to_string());
                error!("{}", err);
                self.emit(&format!("[ERROR] {err}"));
                return if e.kind() == std::io::ErrorKind::NotFound {
                    EXIT_NOT_FOUND
                } else {
                    EXIT_CANNOT_EXECUTE
                };
            }
        };

        info!("Server process started with PID: {}", child.id());

        *self.stdin.lock().unwrap_or_else(PoisonError::into_inner) = child.stdin.take();

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            match spawn_reader("stdout", stdout, Arc::clone(&self.callback)) {
                Ok(handle) => readers.push(handle),
                Err(e) => error!("Failed to start stdout reader: {}", e),
            }
        }
        if let Some(stderr) = child.stderr.take() {
            match spawn_reader("stderr", stderr, Arc::clone(&self.callback)) {
                Ok(handle) => readers.push(handle),
                Err(e) => error!("Failed to start stderr reader: {}", e),
            }
        }

        let code = match child.wait() {
            Ok(status) => {
                info!("Server process exited with status: {:?}", status);
                exit_code(status)
            }
            Err(e) => {
                error!("Error waiting for server process: {}", e);
                -1
            }
        };

        // Drain any output still buffered in the pipes before reporting
        for reader in readers {
            let _ = reader.join();
        }

        self.stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.in_run.store(false, Ordering::Release);
        code
    }

    fn request_stop(&self) {
        if !self.is_running() {
            debug!("Stop requested but no server process is running");
            return;
        }
        info!("Sending stop command: {}", self.stop_command);
        if let Err(e) = self.write_line(&self.stop_command) {
            warn!("Failed to send stop command: {}", e);
        }
    }

    fn inject_command(&self, command: &str) {
        debug!("Sending to server: {}", command);
        if let Err(e) = self.write_line(command) {
            warn!("Failed to send command: {}", e);
        }
    }

    fn players_json(&self) -> Option<String> {
        None
    }

    fn metrics_json(&self) -> Option<String> {
        None
    }

    fn completions_json(&self, _input: &str) -> Option<String> {
        None
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn capture(server: &ProcessServer) -> Arc<Mutex<Vec<String>>> {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        server.register_logger(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        }));
        lines
    }

    fn sh(script: &str) -> ProcessServer {
        ProcessServer::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    fn wait_until(what: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !what() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_output_lines_reach_callback() {
        let server = sh("echo '[INFO] hello'; echo '[WARN] oops' 1>&2");
        let lines = capture(&server);
        let dir = tempfile::tempdir().unwrap();

        let code = server.run_from_config_dir(dir.path());

        assert_eq!(code, 0);
        let mut lines = lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(lines, vec!["[INFO] hello", "[WARN] oops"]);
        assert!(!server.is_running());
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_output() {
        let server = sh(r"printf '[INFO] before\n\377bad\r\n[INFO] after'");
        let lines = capture(&server);
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(server.run_from_config_dir(dir.path()), 0);
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["[INFO] before", "\u{FFFD}bad", "[INFO] after"]
        );
    }

    #[test]
    fn test_exit_code_is_reported() {
        let server = sh("exit 3");
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(server.run_from_config_dir(dir.path()), 3);
    }

    #[test]
    fn test_runs_in_config_dir() {
        let server = sh("pwd");
        let lines = capture(&server);
        let dir = tempfile::tempdir().unwrap();

        server.run_from_config_dir(dir.path());

        let reported = PathBuf::from(lines.lock().unwrap()[0].clone());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_executable() {
        let server = ProcessServer::new("/nonexistent/pumpkin-server", vec![]);
        let lines = capture(&server);
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(server.run_from_config_dir(dir.path()), EXIT_NOT_FOUND);
        assert!(lines.lock().unwrap()[0].starts_with("[ERROR]"));
        assert!(!server.is_running());
    }

    #[test]
    fn test_commands_and_stop_go_to_stdin() {
        let script = r#"while read line; do echo "got $line"; [ "$line" = "stop" ] && exit 0; done"#;
        let server = Arc::new(sh(script));
        let lines = capture(&server);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let runner = {
            let server = Arc::clone(&server);
            thread::spawn(move || server.run_from_config_dir(&path))
        };

        wait_until(|| server.is_running());
        server.inject_command("list");
        wait_until(|| lines.lock().unwrap().len() == 1);
        server.request_stop();

        assert_eq!(runner.join().unwrap(), 0);
        assert_eq!(*lines.lock().unwrap(), vec!["got list", "got stop"]);
    }

    #[test]
    fn test_command_without_run_is_dropped() {
        let server = sh("true");
        server.inject_command("list");
        server.request_stop();
        assert!(!server.is_running());
    }

    #[test]
    fn test_queries_are_unavailable() {
        let server = sh("true");
        assert_eq!(server.players_json(), None);
        assert_eq!(server.metrics_json(), None);
        assert_eq!(server.completions_json("gam"), None);
    }
}
