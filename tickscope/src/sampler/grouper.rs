//! Thread grouping policy.
//!
//! Decides which accumulation bucket a captured thread lands in. Pool
//! grouping exists because a server's worker pools ("Worker-1" through
//! "Worker-16") are interchangeable: profiling them as sixteen separate
//! trees hides the aggregate cost of the pool.

use std::str::FromStr;

use crate::domain::ThreadInfo;

/// Bucket key for sessions collapsed to a single group.
const AS_ONE_KEY: &str = "All Threads";

/// Policy mapping a captured thread to its accumulation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadGrouper {
    /// One bucket per physical thread, keyed by its exact name.
    ByName,
    /// Threads of one pool collapse into one bucket: a trailing
    /// `[-# ]+<digits>` suffix is stripped, so `Worker-3` and `Worker-7`
    /// both land in `Worker`. Names without such a suffix pass through.
    #[default]
    ByPool,
    /// The whole session collapses into one synthetic bucket.
    AsOne,
}

impl ThreadGrouper {
    pub fn group_key(&self, thread: &ThreadInfo) -> String {
        match self {
            ThreadGrouper::ByName => thread.name.clone(),
            ThreadGrouper::ByPool => pool_name(&thread.name).to_string(),
            ThreadGrouper::AsOne => AS_ONE_KEY.to_string(),
        }
    }
}

impl FromStr for ThreadGrouper {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by-name" => Ok(ThreadGrouper::ByName),
            "by-pool" => Ok(ThreadGrouper::ByPool),
            "as-one" => Ok(ThreadGrouper::AsOne),
            other => Err(format!("unknown thread grouper '{other}'")),
        }
    }
}

/// Strip a trailing `[-# ]+<digits>` suffix from a pool-member name.
///
/// Returns the name unchanged when it doesn't match the pattern: there must
/// be trailing digits, at least one separator before them, and a non-empty
/// base left over.
fn pool_name(name: &str) -> &str {
    let no_digits = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if no_digits.len() == name.len() {
        return name;
    }
    let base = no_digits.trim_end_matches(['-', '#', ' ']);
    if base.len() == no_digits.len() || base.is_empty() {
        return name;
    }
    base
}
