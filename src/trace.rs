//! Trace records as the replay input language.
//!
//! A record is one intercepted PM operation of the subject program. The
//! capture front end serializes all threads into a single total order; the
//! engine consumes that order as-is and never reorders.

use serde::{Deserialize, Serialize};

/// Operation kind of a trace record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PmOp {
    /// Register a PM range (allocation / mapping).
    Alloc,
    /// Unregister a PM range.
    Dealloc,
    /// Store to PM. Uses `dst_addr`.
    Write,
    /// Load from PM. Uses `src_addr`.
    Read,
    /// Cache-line writeback (clwb/clflush). Uses `dst_addr`.
    Flush,
    /// Store fence / drain. Global, not range-scoped.
    Drain,
    /// Stage a range for undo/redo protection inside a transaction.
    TxAdd,
    /// Enter a (possibly nested) transaction.
    TxBegin,
    /// Leave a transaction; the outermost end commits.
    TxEnd,
    /// Store to the designated commit variable. Uses `dst_addr`.
    CommitWrite,
}

/// One replay step, as delivered by the capture front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub op: PmOp,
    /// Logical thread id of the subject program.
    pub tid: u32,
    /// Instruction pointer of the intercepted operation.
    pub ip: u64,
    /// Source address (loads).
    pub src_addr: u64,
    /// Destination address (stores, flushes, allocations).
    pub dst_addr: u64,
    pub size: u64,
    /// Return value of the intercepted call, where one exists.
    pub ret: bool,
}

impl PmOp {
    pub fn name(&self) -> &'static str {
        match self {
            PmOp::Alloc => "ALLOC",
            PmOp::Dealloc => "DEALLOC",
            PmOp::Write => "WRITE",
            PmOp::Read => "READ",
            PmOp::Flush => "FLUSH",
            PmOp::Drain => "DRAIN",
            PmOp::TxAdd => "TX_ADD",
            PmOp::TxBegin => "TX_BEGIN",
            PmOp::TxEnd => "TX_END",
            PmOp::CommitWrite => "COMMIT_WRITE",
        }
    }
}
