//! Headless mode runner - main event loop without a UI
//!
//! Starts the server, forwards stdin lines to it as console commands and
//! prints every newly visible entry after each message the engine processes.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use pumpkin_console_app::config::{self, Settings};
use pumpkin_console_app::{apply_completion, Engine, Message};
use pumpkin_console_core::prelude::*;
use pumpkin_console_core::LogLevel;
use pumpkin_console_server::{describe_exit_code, NativeLibrary, ProcessServer, ServerBackend};

use super::{HeadlessEvent, OutputFormat};

/// Prefix for console directives typed on stdin (everything else goes to the server)
const DIRECTIVE_PREFIX: char = ':';

/// How to reach the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTarget {
    Library(PathBuf),
    Command { program: PathBuf, args: Vec<String> },
}

/// Options resolved from the command line
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    /// Directory holding `console.toml` and, unless overridden, the server data
    pub config_dir: PathBuf,
    pub target: Option<ServerTarget>,
    /// Replaces the configured level set when non-empty
    pub levels: Vec<LogLevel>,
    pub search: Option<String>,
    pub format: OutputFormat,
}

/// A line read from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinInput {
    Command(String),
    Quit,
    Players,
    Metrics,
    Complete(String),
    Replay,
}

impl StdinInput {
    /// Classify a stdin line; `None` for blank lines
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Some(directive) = trimmed.strip_prefix(DIRECTIVE_PREFIX) else {
            return Some(Self::Command(trimmed.to_string()));
        };

        let (name, rest) = directive
            .split_once(' ')
            .map(|(name, rest)| (name, rest.trim_start()))
            .unwrap_or((directive, ""));
        match name {
            "q" | "quit" => Some(Self::Quit),
            "players" => Some(Self::Players),
            "metrics" => Some(Self::Metrics),
            "complete" => Some(Self::Complete(rest.to_string())),
            "replay" => Some(Self::Replay),
            // Unknown directives go to the server verbatim
            _ => Some(Self::Command(trimmed.to_string())),
        }
    }
}

/// Run in headless mode; returns the server's exit code
pub async fn run_headless(options: HeadlessOptions) -> Result<i32> {
    info!("═══════════════════════════════════════════════════════");
    info!("Pumpkin Console starting in HEADLESS mode");
    info!("Config dir: {}", options.config_dir.display());
    info!("═══════════════════════════════════════════════════════");

    if let Err(e) = config::init_config_file(&options.config_dir) {
        warn!("Failed to write default console.toml: {}", e);
    }
    let mut settings = config::load_settings(&options.config_dir);
    if !options.levels.is_empty() {
        settings.console.enabled_levels = options.levels.clone();
    }

    let format = options.format;
    let backend = match open_backend(options.target.as_ref(), &settings) {
        Ok(backend) => backend,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), true).emit(format);
            return Err(e);
        }
    };

    let server_dir = settings
        .server
        .config_dir
        .clone()
        .unwrap_or_else(|| options.config_dir.clone());
    let mut engine = Engine::new(settings, backend, server_dir.clone());

    if let Some(search) = &options.search {
        engine.process_message(Message::SetSearch(search.clone()));
    }

    let (stdin_tx, stdin_rx) = mpsc::channel::<StdinInput>(64);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx);
    });

    let mut printer = LogPrinter::new(format);

    engine.process_message(Message::StartServer);
    if engine.session.is_running() {
        HeadlessEvent::server_started(&server_dir).emit(format);
    } else {
        HeadlessEvent::error("server failed to start", true).emit(format);
    }

    let exit_code = headless_event_loop(&mut engine, stdin_rx, &mut printer).await;

    engine.shutdown().await;
    printer.flush_new(&engine);

    info!("Pumpkin Console headless mode exiting");
    Ok(exit_code)
}

/// Pick the backend: command-line target first, then `[server]` settings
fn open_backend(
    target: Option<&ServerTarget>,
    settings: &Settings,
) -> Result<Arc<dyn ServerBackend>> {
    let target = match target {
        Some(target) => target.clone(),
        None => match (&settings.server.library_path, &settings.server.command) {
            (Some(path), _) => ServerTarget::Library(path.clone()),
            (None, Some(program)) => ServerTarget::Command {
                program: program.clone(),
                args: settings.server.args.clone(),
            },
            (None, None) => {
                return Err(Error::config(
                    "no server configured: pass --library or --server-cmd, or set [server] in console.toml",
                ))
            }
        },
    };

    match target {
        ServerTarget::Library(path) => {
            info!("Loading server library {}", path.display());
            Ok(Arc::new(NativeLibrary::load(&path)?))
        }
        ServerTarget::Command { program, args } => {
            info!("Using server executable {}", program.display());
            Ok(Arc::new(
                ProcessServer::new(program, args)
                    .with_stop_command(settings.server.stop_command.clone()),
            ))
        }
    }
}

/// Main headless event loop
async fn headless_event_loop(
    engine: &mut Engine,
    mut stdin_rx: mpsc::Receiver<StdinInput>,
    printer: &mut LogPrinter,
) -> i32 {
    enum Input {
        Engine(Option<Message>),
        Stdin(Option<StdinInput>),
    }

    let mut exit_code = 0;
    let mut stdin_open = true;
    let healthy_threshold = engine.settings.metrics.tps_healthy_threshold;

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        let input = tokio::select! {
            msg = engine.msg_rx.recv() => Input::Engine(msg),
            line = stdin_rx.recv(), if stdin_open => Input::Stdin(line),
        };

        match input {
            Input::Engine(Some(msg)) => {
                let stopped = match &msg {
                    Message::ServerStopped { code } => Some(*code),
                    _ => None,
                };
                let metrics_refresh = matches!(msg, Message::RefreshMetrics);
                let metrics_before = engine.metrics;

                engine.process_message(msg);
                printer.flush_new(engine);

                if metrics_refresh && engine.metrics != metrics_before {
                    if let Some(metrics) = &engine.metrics {
                        // Periodic snapshots only go to machine consumers
                        if printer.format == OutputFormat::Ndjson {
                            HeadlessEvent::metrics(metrics, healthy_threshold)
                                .emit(printer.format);
                        }
                    }
                }

                if let Some(code) = stopped {
                    HeadlessEvent::server_stopped(code, describe_exit_code(code))
                        .emit(printer.format);
                    exit_code = code;
                    break;
                }
            }
            Input::Engine(None) => {
                info!("Message channel closed");
                break;
            }
            Input::Stdin(Some(input)) => {
                handle_stdin(engine, input, printer, healthy_threshold);
                printer.flush_new(engine);
            }
            Input::Stdin(None) => {
                info!("Stdin closed");
                stdin_open = false;
            }
        }
    }

    exit_code
}

fn handle_stdin(
    engine: &mut Engine,
    input: StdinInput,
    printer: &mut LogPrinter,
    healthy_threshold: f32,
) {
    match input {
        StdinInput::Command(command) => engine.process_message(Message::SendCommand(command)),
        StdinInput::Quit => engine.process_message(Message::Quit),
        StdinInput::Replay if engine.settings.console.history_replay => {
            engine.process_message(Message::ReplayHistory);
            printer.reset();
        }
        StdinInput::Replay => {
            HeadlessEvent::error("history replay is disabled in console.toml", false)
                .emit(printer.format);
        }
        StdinInput::Players => {
            HeadlessEvent::players(engine.session.players()).emit(printer.format);
        }
        StdinInput::Metrics => match engine.session.metrics() {
            Some(metrics) => {
                HeadlessEvent::metrics(&metrics, healthy_threshold).emit(printer.format)
            }
            None => HeadlessEvent::error("no metrics available", false).emit(printer.format),
        },
        StdinInput::Complete(text) => {
            let suggestions = engine.session.completions(&text);
            if printer.format == OutputFormat::Plain {
                for suggestion in &suggestions {
                    println!("   {}", apply_completion(&text, &suggestion.text));
                }
            }
            HeadlessEvent::completions(&text, suggestions).emit(printer.format);
        }
    }
}

/// Prints entries that became visible since the last flush.
///
/// Tracks a cursor into the visible projection rather than listening to the
/// event broadcast, so a large burst cannot make it skip entries.
struct LogPrinter {
    format: OutputFormat,
    last_emitted: usize,
}

impl LogPrinter {
    fn new(format: OutputFormat) -> Self {
        Self {
            format,
            last_emitted: 0,
        }
    }

    fn flush_new(&mut self, engine: &Engine) {
        let visible = engine.console.visible();

        // The projection only shrinks on clear or replay; start over then
        if self.last_emitted > visible.len() {
            self.last_emitted = 0;
        }

        for entry in &visible[self.last_emitted..] {
            HeadlessEvent::log(entry).emit(self.format);
        }
        self.last_emitted = visible.len();
    }

    /// Print the whole projection again on the next flush
    fn reset(&mut self) {
        self.last_emitted = 0;
    }
}

/// Read stdin lines and forward them to the runner (blocking version)
fn spawn_stdin_reader_blocking(tx: mpsc::Sender<StdinInput>) {
    use std::io::BufRead;

    let mut reader = std::io::stdin().lock();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let Some(input) = StdinInput::parse(&line) else {
                    continue;
                };
                let quit = input == StdinInput::Quit;
                if tx.blocking_send(input).is_err() || quit {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
