//! Host command surface.
//!
//! Game servers expose the profiler through their own command systems
//! (`/profiler start --interval 10 ...`). This module does the
//! platform-independent half: it parses subcommand tokens into a typed
//! action and offers tab-completion candidates for partial input. All
//! semantics stay with [`SamplerBuilder`] — the host adapter just applies
//! the returned action to its sampler handle.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::sampler::{SamplerBuilder, ThreadDumper, ThreadGrouper};

const SUBCOMMANDS: &[&str] = &["start", "stop", "status"];
const START_FLAGS: &[&str] = &[
    "--interval",
    "--timeout",
    "--grouper",
    "--thread",
    "--force-fallback",
];
const GROUPER_VALUES: &[&str] = &["by-name", "by-pool", "as-one"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("expected a subcommand: start, stop or status")]
    MissingSubcommand,

    #[error("unknown subcommand '{0}'")]
    UnknownSubcommand(String),

    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    #[error("flag '{0}' expects a value")]
    MissingValue(&'static str),

    #[error("invalid value '{value}' for '{flag}': {reason}")]
    InvalidValue {
        flag: &'static str,
        value: String,
        reason: String,
    },
}

/// A parsed profiler command, ready for the host adapter to act on.
#[derive(Debug)]
pub enum ProfilerCommand {
    Start(StartOptions),
    Stop,
    Status,
}

/// Options gathered from a `start` invocation.
#[derive(Debug, Default)]
pub struct StartOptions {
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub grouper: Option<ThreadGrouper>,
    /// Thread name selector: exact name, `prefix*` wildcard, or `*`.
    pub thread: Option<String>,
    pub force_fallback: bool,
}

impl StartOptions {
    /// Apply these options on top of builder defaults.
    pub fn into_builder(self) -> SamplerBuilder {
        let mut builder = SamplerBuilder::new();
        if let Some(interval) = self.interval {
            builder = builder.sampling_interval(interval);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.complete_after(timeout);
        }
        if let Some(grouper) = self.grouper {
            builder = builder.thread_grouper(grouper);
        }
        builder = builder.thread_dumper(self.dumper());
        builder.force_fallback_backend(self.force_fallback)
    }

    fn dumper(&self) -> ThreadDumper {
        match self.thread.as_deref() {
            None | Some("*") => ThreadDumper::All,
            Some(pattern) => match pattern.strip_suffix('*') {
                Some(prefix) => {
                    let prefix = prefix.to_string();
                    ThreadDumper::filtered(move |name| name.starts_with(&prefix))
                }
                None => {
                    let exact = pattern.to_string();
                    ThreadDumper::filtered(move |name| name == exact)
                }
            },
        }
    }
}

/// Parse subcommand + argument tokens.
pub fn parse(args: &[&str]) -> Result<ProfilerCommand, CommandError> {
    let (&subcommand, rest) = args.split_first().ok_or(CommandError::MissingSubcommand)?;
    match subcommand {
        "stop" => Ok(ProfilerCommand::Stop),
        "status" => Ok(ProfilerCommand::Status),
        "start" => parse_start(rest).map(ProfilerCommand::Start),
        other => Err(CommandError::UnknownSubcommand(other.to_string())),
    }
}

fn parse_start(args: &[&str]) -> Result<StartOptions, CommandError> {
    let mut options = StartOptions::default();
    let mut tokens = args.iter();
    while let Some(&flag) = tokens.next() {
        match flag {
            "--interval" => {
                let millis: u64 = parse_value("--interval", tokens.next().copied())?;
                options.interval = Some(Duration::from_millis(millis));
            }
            "--timeout" => {
                let seconds: u64 = parse_value("--timeout", tokens.next().copied())?;
                options.timeout = Some(Duration::from_secs(seconds));
            }
            "--grouper" => {
                options.grouper = Some(parse_value("--grouper", tokens.next().copied())?);
            }
            "--thread" => {
                let value = tokens.next().ok_or(CommandError::MissingValue("--thread"))?;
                options.thread = Some((*value).to_string());
            }
            "--force-fallback" => options.force_fallback = true,
            other => return Err(CommandError::UnknownFlag(other.to_string())),
        }
    }
    Ok(options)
}

fn parse_value<T>(flag: &'static str, value: Option<&str>) -> Result<T, CommandError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.ok_or(CommandError::MissingValue(flag))?;
    value.parse().map_err(|err: T::Err| CommandError::InvalidValue {
        flag,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Tab-completion candidates for partial input.
///
/// The last token is treated as the one being completed; candidates are
/// filtered by its prefix. An empty slice completes the subcommand list.
pub fn tab_complete(args: &[&str]) -> Vec<String> {
    let (partial, before) = match args.split_last() {
        None => return candidates(SUBCOMMANDS, ""),
        Some((last, before)) => (*last, before),
    };

    if before.is_empty() {
        return candidates(SUBCOMMANDS, partial);
    }
    if before[0] != "start" {
        return Vec::new();
    }

    // Completing the value of the previous flag?
    match before.last() {
        Some(&"--grouper") => candidates(GROUPER_VALUES, partial),
        Some(&"--interval" | &"--timeout" | &"--thread") => Vec::new(),
        _ => START_FLAGS
            .iter()
            .filter(|flag| !before.contains(*flag))
            .filter(|flag| flag.starts_with(partial))
            .map(|flag| (*flag).to_string())
            .collect(),
    }
}

fn candidates(all: &[&str], prefix: &str) -> Vec<String> {
    all.iter()
        .filter(|c| c.starts_with(prefix))
        .map(|c| (*c).to_string())
        .collect()
}
