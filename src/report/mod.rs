//! Bug reports and the diagnostic channel.
//!
//! Detected subject-program bugs are never `Err` values: the engine appends
//! them to an in-memory log and, when echo is on, renders them to stderr
//! with their category tag. Replay always continues past a report.

pub mod backtrace;

use std::fmt;

use serde::Serialize;

pub use backtrace::{BacktraceResolver, CallStack, Phase};

/// Category of a detected bug.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BugKind {
    /// Flush of a non-PM address or of an already-pending line.
    UnnecessaryFlush,
    /// TX_ADD of a range already staged in this transaction.
    UnnecessaryTxAdd,
    /// TX_ADD after the range was already written: the undo image is lost.
    TxAddAfterWrite,
    /// Post-failure read of data whose durability was never established.
    InconsistentRead,
    /// Commit variable advanced without a newer confirmation of its data.
    StaleCommit,
    /// Drain that transitioned no bytes.
    UnnecessaryDrain,
}

impl BugKind {
    pub fn category(&self) -> &'static str {
        match self {
            BugKind::TxAddAfterWrite | BugKind::InconsistentRead | BugKind::StaleCommit => {
                "Consistency Bug"
            }
            BugKind::UnnecessaryTxAdd => "Performance Bug",
            BugKind::UnnecessaryFlush | BugKind::UnnecessaryDrain => "Warning",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            BugKind::UnnecessaryFlush => "Unnecessary Flush",
            BugKind::UnnecessaryTxAdd => "Unnecessary TX_ADD",
            BugKind::TxAddAfterWrite => "TX_ADD after modification",
            BugKind::InconsistentRead => "Inconsistent read",
            BugKind::StaleCommit => "Stale commit variable update",
            BugKind::UnnecessaryDrain => "Unnecessary PM drain",
        }
    }

    fn color(&self) -> &'static str {
        match self.category() {
            "Consistency Bug" => "\x1b[0;31m",
            _ => "\x1b[1;33m",
        }
    }
}

/// One detected bug, attributed to an address range and instruction pointer.
#[derive(Clone, Debug, Serialize)]
pub struct BugReport {
    pub kind: BugKind,
    pub addr: u64,
    pub size: u64,
    /// IP of the operation that triggered the report (the reading IP for
    /// inconsistent reads).
    pub ip: u64,
    pub tid: u32,
    /// IP of the offending earlier write, for inconsistent reads.
    pub write_ip: Option<u64>,
    /// Pre-failure call stack for `write_ip` (or `ip`), when the log has one.
    pub pre_stack: Option<CallStack>,
    /// Post-failure call stack for `ip`; only inconsistent reads carry one.
    pub post_stack: Option<CallStack>,
}

impl BugReport {
    pub fn new(kind: BugKind, addr: u64, size: u64, ip: u64, tid: u32) -> Self {
        Self {
            kind,
            addr,
            size,
            ip,
            tid,
            write_ip: None,
            pre_stack: None,
            post_stack: None,
        }
    }
}

impl fmt::Display for BugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}:\x1b[0m {}",
            self.kind.color(),
            self.kind.category(),
            self.kind.summary()
        )?;
        write!(f, "Addr: {:#x} Size: {:#x} IP: {:#x}", self.addr, self.size, self.ip)?;
        if let Some(write_ip) = self.write_ip {
            write!(f, "\nWrite IP: {write_ip:#x}")?;
        }
        for (label, stack) in [("pre", &self.pre_stack), ("post", &self.post_stack)] {
            if let Some(stack) = stack {
                for (i, frame) in stack.iter().enumerate() {
                    write!(f, "\n[{label}#{i}]\t{frame}")?;
                }
            }
        }
        Ok(())
    }
}

/// Collecting sink for bug reports, with optional stderr echo and
/// best-effort backtrace attribution.
#[derive(Debug, Default)]
pub struct Reporter {
    reports: Vec<BugReport>,
    echo: bool,
    resolver: Option<BacktraceResolver>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render each report to stderr as it is emitted.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn set_resolver(&mut self, resolver: BacktraceResolver) {
        self.resolver = Some(resolver);
    }

    /// Attach backtraces, log the report, optionally echo it.
    pub fn emit(&mut self, mut report: BugReport) {
        if let Some(resolver) = self.resolver.as_mut() {
            let pre_ip = report.write_ip.unwrap_or(report.ip);
            report.pre_stack = resolver.resolve(pre_ip, Phase::PreFailure).cloned();
            if report.kind == BugKind::InconsistentRead {
                report.post_stack = resolver.resolve(report.ip, Phase::PostFailure).cloned();
            }
        }
        if self.echo {
            eprintln!("{report}");
        }
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[BugReport] {
        &self.reports
    }

    pub fn count(&self, kind: BugKind) -> usize {
        self.reports.iter().filter(|r| r.kind == kind).count()
    }
}
