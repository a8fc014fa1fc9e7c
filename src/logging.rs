use std::fmt::Debug;
use std::sync::RwLock;

use colored::{ColoredString, Colorize};
use serde::Serialize;
use thiserror::Error;

static LOG: RwLock<Output> = RwLock::new(Output::new(false, Verbosity::Normal));

pub fn init(stdout_json: bool, verbosity: Verbosity) {
    let mut log = match LOG.write() {
        Ok(log) => log,
        Err(poisoned) => poisoned.into_inner(),
    };
    *log = Output::new(stdout_json, verbosity);
}

fn output() -> Output {
    match LOG.read() {
        Ok(log) => log.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn get_verbosity() -> Verbosity {
    output().verbosity
}

fn output_as_json() -> bool {
    output().stdout_json
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        let out = format!("WARN:\t{}", format_args!($($arg)*));
        $crate::logging::warn_str(&out)
    }};
}
pub(crate) use warning;

pub fn warn_str(str: &str) {
    if Verbosity::Quiet != get_verbosity() {
        eprintln!("{}", str.yellow().dimmed())
    }
}

macro_rules! info {
    ($($arg:tt)*) => {{
        let out = format!("INFO:\t{}", format_args!($($arg)*));
        $crate::logging::info_str(&out)
    }};
}
pub(crate) use info;

pub fn info_str(str: &str) {
    match get_verbosity() {
        Verbosity::Info | Verbosity::Debug | Verbosity::Trace => {
            eprintln!("{}", str.dimmed())
        }
        _ => {}
    }
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        let out = format!("DEBUG:\t{}", format_args!($($arg)*));
        $crate::logging::debug_str(&out)
    }};
}
pub(crate) use debug;

pub fn debug_str(str: &str) {
    match get_verbosity() {
        Verbosity::Debug | Verbosity::Trace => {
            eprintln!("{}", str.dimmed())
        }
        _ => {}
    }
}

macro_rules! trace {
    ($($arg:tt)*) => {{
        let out = format!("TRACE:\t{}", format_args!($($arg)*));
        $crate::logging::trace_str(&out)
    }};
}
pub(crate) use trace;

pub fn trace_str(str: &str) {
    if get_verbosity() == Verbosity::Trace {
        eprintln!("{}", str.dimmed())
    }
}

#[derive(Debug, Error)]
pub enum StdoutError {
    #[error("Couldn't serialize stdout: {source}")]
    JSONConversionException { source: serde_json::Error },
}

pub fn stdoutln<T: Stdout>(out: T) -> Result<(), StdoutError> {
    if output_as_json() {
        let out_str = serde_json::to_string(&out)
            .map_err(|source| StdoutError::JSONConversionException { source })?;
        println!("{}", out_str);
    } else {
        println!("{}", out.standard(get_verbosity()));
    }
    Ok(())
}

pub fn println_stderr(msg: &str) {
    eprintln!("{}", msg);
}

pub fn err(err: anyhow::Error) {
    match get_verbosity() {
        Verbosity::Quiet | Verbosity::Normal => {
            eprintln!("{}", err);
        }
        Verbosity::Info | Verbosity::Debug | Verbosity::Trace => {
            eprintln!("{:?}", err);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Verbosity {
    Normal,
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn new(verbosity: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbosity {
            0 => Verbosity::Normal,
            1 => Verbosity::Info,
            2 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    /// Progress bars only make sense when nothing else is written to stderr.
    pub fn shows_progress(&self) -> bool {
        *self == Verbosity::Normal && !output_as_json()
    }
}

#[derive(Clone)]
struct Output {
    verbosity: Verbosity,
    stdout_json: bool,
}

impl Output {
    const fn new(stdout_json: bool, verbosity: Verbosity) -> Self {
        Output {
            stdout_json,
            verbosity,
        }
    }
}

pub trait Message {
    fn standard(&self, verbosity: Verbosity) -> ColoredString;
}

pub trait Stdout: Serialize + Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::new(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::new(1, false), Verbosity::Info);
        assert_eq!(Verbosity::new(2, false), Verbosity::Debug);
        assert_eq!(Verbosity::new(3, false), Verbosity::Trace);
        assert_eq!(Verbosity::new(12, false), Verbosity::Trace);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(Verbosity::new(3, true), Verbosity::Quiet);
    }
}
