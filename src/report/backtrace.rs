//! Backtrace log resolution.
//!
//! The capture front end writes one plain-text backtrace log per execution
//! id and phase. A call site is marked by a `>>` prefix followed by a
//! 14-hex-digit instruction pointer; the lines after it form the call stack,
//! terminated by the next `>>` marker, a line without a `:` separator, or
//! the frame bound. The whole file is indexed once instead of being
//! rescanned per lookup.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::config::MAX_BACKTRACE_FRAMES;

/// Which side of the simulated crash a lookup refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    PreFailure,
    PostFailure,
}

impl Phase {
    fn file_name(&self, exec_id: u32) -> String {
        match self {
            Phase::PreFailure => format!("backtrace_pre.{exec_id}"),
            Phase::PostFailure => format!("backtrace_post.{exec_id}"),
        }
    }
}

/// Call-stack lines following one `>>` marker, frame 0 first.
pub type CallStack = Vec<String>;

/// Lazily indexed view of the two backtrace logs of one execution.
#[derive(Debug)]
pub struct BacktraceResolver {
    dir: PathBuf,
    exec_id: u32,
    pre: Option<FxHashMap<u64, CallStack>>,
    post: Option<FxHashMap<u64, CallStack>>,
}

impl BacktraceResolver {
    pub fn open(dir: impl AsRef<Path>, exec_id: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            exec_id,
            pre: None,
            post: None,
        }
    }

    /// Call stack recorded for `ip`, if the phase log holds one. A missing
    /// log file or marker only suppresses contextual output.
    pub fn resolve(&mut self, ip: u64, phase: Phase) -> Option<&CallStack> {
        let path = self.dir.join(phase.file_name(self.exec_id));
        let slot = match phase {
            Phase::PreFailure => &mut self.pre,
            Phase::PostFailure => &mut self.post,
        };
        slot.get_or_insert_with(|| index_log(&path)).get(&ip)
    }
}

/// Parse one backtrace log into an ip -> stack index. Unreadable files
/// index as empty.
fn index_log(path: &Path) -> FxHashMap<u64, CallStack> {
    let mut index = FxHashMap::default();
    let Ok(text) = fs::read_to_string(path) else {
        return index;
    };

    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(ip) = parse_marker(line) else { continue };
        let mut stack = Vec::new();
        while stack.len() < MAX_BACKTRACE_FRAMES {
            match lines.peek() {
                Some(next) if !next.starts_with(">>") && next.contains(':') => {
                    stack.push(lines.next().unwrap().to_string());
                }
                _ => break,
            }
        }
        // Last marker wins, matching the reverse scan of the log.
        index.insert(ip, stack);
    }
    index
}

/// `>> ` followed by a 14-hex-digit instruction pointer.
fn parse_marker(line: &str) -> Option<u64> {
    let rest = line.strip_prefix(">> ")?;
    let digits = rest.get(..14)?;
    u64::from_str_radix(digits, 16).ok()
}
