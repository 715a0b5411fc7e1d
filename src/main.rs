// rawsh: read a line, split it into words, run it, repeat.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use rawsh::config::DEFAULT_PROMPT;
use rawsh::dispatch::{Dispatcher, Status};
use rawsh::terminals::{RawMode, StdioTerminal};
use rawsh::{tokenize, LineEditor};

#[derive(FromArgs)]
/// Interactive shell with line editing, history and PATH completion.
struct Options {
    /// text printed before each line
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,

    /// append debug logs to this file; RUST_LOG selects what is logged
    #[argh(option)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let options: Options = argh::from_env();

    match run(&options) {
        Ok(code) => ExitCode::from((code & 0xff) as u8),
        Err(e) => {
            eprintln!("rawsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to a file because stdout and stderr belong to the terminal being edited.
fn init_logging(path: &Path) -> Result<WorkerGuard> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rawsh=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {}", e))?;

    Ok(guard)
}

fn run(options: &Options) -> Result<i32> {
    let _log_guard = options.log_file.as_deref().map(init_logging).transpose()?;

    let mut raw = RawMode::enable().context("line editing needs stdin to be a terminal")?;
    info!("session started");

    let dispatcher = Dispatcher::new();
    let mut editor = LineEditor::new().with_builtins(dispatcher.builtins());
    let mut terminal = StdioTerminal::new();
    let mut code = 0;

    while let Some(line) = editor.read_line(&mut terminal, &options.prompt)? {
        let argv = match tokenize(&line) {
            Ok(argv) => argv,
            Err(e) => {
                eprintln!("rawsh: {}", e);
                continue;
            }
        };

        if argv.is_empty() {
            continue;
        }

        if let Status::Exit(exit_code) = dispatcher.dispatch(argv, editor.history_mut()) {
            code = exit_code;
            break;
        }
    }

    raw.disable()?;
    info!(code, "session ended");
    Ok(code)
}
