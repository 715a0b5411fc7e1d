//! Running a tokenized command line.
//!
//! The [`Dispatcher`] takes an [`ArgVector`], peels off an output redirection if there
//! is one, then runs either a builtin or an external program found on `PATH`. It
//! reports back a [`Status`] that tells the read loop whether to keep going.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::completion::{find_executable, is_executable};
use crate::config::BUILTINS;
use crate::tokenizer::ArgVector;
use crate::History;

/// Outcome of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The command ran and succeeded.
    Success,
    /// The command failed or could not be run. The shell keeps going.
    Failure,
    /// The shell should stop, exiting with the given code.
    Exit(i32),
}

impl Status {
    pub fn is_exit(self) -> bool {
        matches!(self, Status::Exit(_))
    }
}

/// Which output stream a redirection replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// An output redirection such as `> out.txt` or `2>> errors.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub stream: Stream,
    pub path: PathBuf,
    pub append: bool,
}

impl Redirect {
    /// Opens the target file, creating it with mode 0644 if needed.
    pub fn open(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).mode(0o644);
        if self.append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        options.open(&self.path)
    }
}

/// A redirection operator with no file name after it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error: file name expected after '{0}'")]
pub struct MissingTarget(pub &'static str);

fn redirect_operator(word: &str) -> Option<(Stream, bool, &'static str)> {
    match word {
        ">" | "1>" => Some((Stream::Stdout, false, ">")),
        "2>" => Some((Stream::Stderr, false, ">")),
        ">>" | "1>>" => Some((Stream::Stdout, true, ">>")),
        "2>>" => Some((Stream::Stderr, true, ">>")),
        _ => None,
    }
}

/// Splits `words` at the first redirection operator.
///
/// Everything from the operator on is removed from the command; the word right after
/// the operator names the target file and later words are ignored.
pub fn split_redirect(mut words: Vec<String>) -> Result<(Vec<String>, Option<Redirect>), MissingTarget> {
    let found = words
        .iter()
        .enumerate()
        .find_map(|(idx, word)| redirect_operator(word).map(|operator| (idx, operator)));
    let Some((idx, (stream, append, op))) = found else {
        return Ok((words, None));
    };

    let path = words.get(idx + 1).ok_or(MissingTarget(op))?;
    let redirect = Redirect {
        stream,
        path: PathBuf::from(path),
        append,
    };
    words.truncate(idx);
    Ok((words, Some(redirect)))
}

/// Runs builtins and external commands.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    builtins: Vec<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            builtins: BUILTINS.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Names handled in-process, for the editor's eager completion.
    pub fn builtins(&self) -> &[String] {
        &self.builtins
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|builtin| builtin == name)
    }

    /// Runs one command line, writing to the process stdout/stderr unless redirected.
    pub fn dispatch(&self, argv: ArgVector, history: &mut History) -> Status {
        let (words, redirect) = match split_redirect(argv.into_vec()) {
            Ok(split) => split,
            Err(e) => {
                eprintln!("{}", e);
                return Status::Failure;
            }
        };

        if words.is_empty() {
            return Status::Success;
        }

        let target = match &redirect {
            Some(redirect) => match redirect.open() {
                Ok(file) => Some((redirect.stream, file)),
                Err(e) => {
                    warn!(path = %redirect.path.display(), error = %e, "cannot open redirection target");
                    eprintln!("rawsh: {}: {}", redirect.path.display(), e);
                    return Status::Failure;
                }
            },
            None => None,
        };

        debug!(command = %words[0], redirect = ?redirect, "dispatch");

        let result = if self.is_builtin(&words[0]) {
            let mut stdout = io::stdout();
            let mut stderr = io::stderr();
            match target {
                None => self.run_builtin(&words, history, &mut stdout, &mut stderr),
                Some((Stream::Stdout, mut file)) => self.run_builtin(&words, history, &mut file, &mut stderr),
                Some((Stream::Stderr, mut file)) => self.run_builtin(&words, history, &mut stdout, &mut file),
            }
        } else {
            self.run_external(&words, target)
        };

        result.unwrap_or_else(|e| {
            eprintln!("rawsh: {}: {}", words[0], e);
            Status::Failure
        })
    }

    /// Runs the builtin named by `words[0]` against the given output streams.
    pub fn run_builtin(
        &self,
        words: &[String],
        history: &mut History,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<Status> {
        let args = &words[1..];
        match words[0].as_str() {
            "echo" => {
                writeln!(out, "{}", args.join(" "))?;
                Ok(Status::Success)
            }
            "exit" => match args.first() {
                None => Ok(Status::Exit(0)),
                Some(code) => match code.parse::<i32>() {
                    Ok(code) => Ok(Status::Exit(code)),
                    Err(_) => {
                        writeln!(err, "exit: {}: numeric argument required", code)?;
                        Ok(Status::Exit(2))
                    }
                },
            },
            "type" => self.type_builtin(args, out, err),
            "pwd" => {
                writeln!(out, "{}", env::current_dir()?.display())?;
                Ok(Status::Success)
            }
            "cd" => cd_builtin(args, err),
            "history" => history_builtin(args, history, out, err),
            other => {
                writeln!(err, "{}: not a builtin", other)?;
                Ok(Status::Failure)
            }
        }
    }

    fn type_builtin(&self, args: &[String], out: &mut dyn Write, err: &mut dyn Write) -> io::Result<Status> {
        if args.is_empty() {
            writeln!(err, "type: not enough arguments")?;
            return Ok(Status::Failure);
        }

        let mut status = Status::Success;
        for name in args {
            if self.is_builtin(name) {
                writeln!(out, "{} is a shell builtin", name)?;
            } else if let Some(path) = find_executable(name) {
                writeln!(out, "{} is {}", name, path.display())?;
            } else {
                writeln!(err, "{}: not found", name)?;
                status = Status::Failure;
            }
        }
        Ok(status)
    }

    fn run_external(&self, words: &[String], target: Option<(Stream, File)>) -> io::Result<Status> {
        let name = &words[0];
        let Some(path) = resolve_command(name) else {
            match target {
                Some((Stream::Stderr, mut file)) => writeln!(file, "{}: command not found", name)?,
                _ => eprintln!("{}: command not found", name),
            }
            return Ok(Status::Failure);
        };

        let mut command = Command::new(&path);
        command.arg0(name).args(&words[1..]);
        match target {
            Some((Stream::Stdout, file)) => {
                command.stdout(file);
            }
            Some((Stream::Stderr, file)) => {
                command.stderr(file);
            }
            None => {}
        }

        let status = command.status()?;
        debug!(path = %path.display(), ?status, "child exited");

        Ok(if status.success() {
            Status::Success
        } else {
            Status::Failure
        })
    }
}

/// A name containing `/` is used as a path; anything else is looked up on `PATH`.
fn resolve_command(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }
    find_executable(name)
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

fn cd_builtin(args: &[String], err: &mut dyn Write) -> io::Result<Status> {
    let target = match args.first().map(String::as_str) {
        None | Some("~") => home_dir(),
        Some(dir) => match dir.strip_prefix("~/") {
            Some(rest) => home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(dir)),
        },
    };

    let shown = args.first().map(String::as_str).unwrap_or("~");
    let Some(target) = target else {
        writeln!(err, "cd: HOME not set")?;
        return Ok(Status::Failure);
    };

    if env::set_current_dir(Path::new(&target)).is_err() {
        writeln!(err, "cd: {}: No such file or directory", shown)?;
        return Ok(Status::Failure);
    }
    Ok(Status::Success)
}

fn history_builtin(
    args: &[String],
    history: &mut History,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<Status> {
    let skip = match args.first().map(String::as_str) {
        None => 0,
        Some("-c") => {
            history.clear();
            return Ok(Status::Success);
        }
        Some(count) => match count.parse::<usize>() {
            Ok(count) => history.len().saturating_sub(count),
            Err(_) => {
                writeln!(err, "history: {}: numeric argument required", count)?;
                return Ok(Status::Failure);
            }
        },
    };

    for (idx, entry) in history.iter().enumerate().skip(skip) {
        writeln!(out, "{:>5}  {}", idx + 1, entry)?;
    }
    Ok(Status::Success)
}
