//! The shadow-state engine.
//!
//! One entry point per trace-record kind, fed one record at a time by the
//! replay driver. Processing is fully synchronous; per-thread state is
//! keyed by thread id but all mutation happens on the replay thread.

pub mod commit;
pub mod tx;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::interval::IntervalMap;
use crate::report::{BacktraceResolver, BugKind, BugReport, Reporter};
use crate::state::{Addr, AddressRange, PersistenceState, Timestamp};
use crate::trace::{PmOp, TraceRecord};

pub use commit::CommitTracker;
pub use tx::ThreadCtx;

/// Running counters over one replay, printed by the driver summary.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ReplayStats {
    pub records: u64,
    pub writes: u64,
    pub flushes: u64,
    pub drains: u64,
    /// Drains that transitioned no bytes. Always tallied; emitted as
    /// reports only when configured.
    pub unnecessary_drains: u64,
    pub reports: u64,
}

/// Shadow model of the subject program's persistent memory.
///
/// Owns every sub-model: the range-state machine, the timestamp and
/// write-attribution maps, per-thread transaction contexts, the
/// commit-variable tracker and the report sink. One instance lives for the
/// duration of one trace replay.
pub struct ShadowEngine {
    config: EngineConfig,
    /// Persistence state per registered PM byte.
    states: IntervalMap<PersistenceState>,
    /// Logical time of the most recent modification per byte.
    modify_times: IntervalMap<Timestamp>,
    /// IP of the most recent write per byte, for attribution.
    write_ips: IntervalMap<Addr>,
    global_time: Timestamp,
    threads: FxHashMap<u32, ThreadCtx>,
    commit: CommitTracker,
    /// Previously reported (addr, size) keys; suppresses duplicate
    /// inconsistent-read reports.
    reported: FxHashSet<(Addr, u64)>,
    reporter: Reporter,
    stats: ReplayStats,
}

impl ShadowEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            states: IntervalMap::new(),
            modify_times: IntervalMap::new(),
            write_ips: IntervalMap::new(),
            global_time: 0,
            threads: FxHashMap::default(),
            commit: CommitTracker::default(),
            reported: FxHashSet::default(),
            reporter: Reporter::new(),
            stats: ReplayStats::default(),
        }
    }

    // --- Driver wiring ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn set_report_echo(&mut self, echo: bool) {
        self.reporter.set_echo(echo);
    }

    pub fn set_backtrace_resolver(&mut self, resolver: BacktraceResolver) {
        self.reporter.set_resolver(resolver);
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn global_time(&self) -> Timestamp {
        self.global_time
    }

    /// Advance the logical clock. Never called implicitly; ordering policy
    /// belongs to the driver.
    pub fn advance_time(&mut self) {
        self.global_time += 1;
    }

    /// Dispatch one trace record to its entry point.
    pub fn apply(&mut self, rec: &TraceRecord) -> Result<()> {
        self.stats.records += 1;
        match rec.op {
            PmOp::Alloc => self.allocate(AddressRange::new(rec.dst_addr, rec.size)?),
            PmOp::Dealloc => self.deallocate(AddressRange::new(rec.dst_addr, rec.size)?),
            PmOp::Write => self.write(rec.tid, rec.ip, AddressRange::new(rec.dst_addr, rec.size)?),
            PmOp::Read => self.read(rec.tid, rec.ip, AddressRange::new(rec.src_addr, rec.size)?),
            PmOp::Flush => self.flush(rec.tid, rec.ip, AddressRange::new(rec.dst_addr, rec.size)?),
            PmOp::Drain => {
                self.drain(rec.tid, rec.ip);
                Ok(())
            }
            PmOp::TxAdd => self.tx_add(rec.tid, rec.ip, AddressRange::new(rec.dst_addr, rec.size)?),
            PmOp::TxBegin => self.tx_begin(rec.tid),
            PmOp::TxEnd => self.tx_end(rec.tid),
            PmOp::CommitWrite => {
                self.commit_write(rec.tid, rec.ip, AddressRange::new(rec.dst_addr, rec.size)?)
            }
        }
    }

    // --- Range-state machine ---

    /// Register a PM range; every byte starts `Clean`.
    pub fn allocate(&mut self, range: AddressRange) -> Result<()> {
        if self.states.overlaps(range) {
            return Err(EngineError::DoubleAllocate { addr: range.start, size: range.size });
        }
        self.states.insert(range, PersistenceState::Clean);
        Ok(())
    }

    /// Unregister a fully allocated range and drop all state recorded for it.
    pub fn deallocate(&mut self, range: AddressRange) -> Result<()> {
        if !self.states.covers(range) {
            return Err(EngineError::DeallocateUnallocated { addr: range.start, size: range.size });
        }
        self.states.remove(range);
        self.modify_times.remove(range);
        self.write_ips.remove(range);
        Ok(())
    }

    /// Store to PM: mark `Modified`, record the logical time and the writing
    /// IP. Inside a transaction, a write to a range not yet TX_ADDed joins
    /// the thread's non-added-write set.
    pub fn write(&mut self, tid: u32, ip: u64, range: AddressRange) -> Result<()> {
        if !self.is_pm_range(range) {
            return Err(EngineError::ModifyNonPm { addr: range.start, size: range.size });
        }
        self.stats.writes += 1;
        self.states.insert(range, PersistenceState::Modified);
        self.modify_times.insert(range, self.global_time);
        self.write_ips.insert(range, ip);

        let now = self.global_time;
        let is_commit_var = self.commit.is_commit_var(range);
        let ctx = self.ctx(tid)?;
        if ctx.in_tx()
            && !ctx.detection_disabled
            && !ctx.in_internal()
            && !ctx.added.contains_overlap(range)
        {
            ctx.non_added_writes.insert(range);
        }
        if is_commit_var {
            self.commit.note_update(now);
        }
        Ok(())
    }

    /// Cache-line writeback. Flushes of memory with no recorded PM state and
    /// of already-pending lines are reported as unnecessary; the covered
    /// bytes become `WritebackPending` regardless.
    pub fn flush(&mut self, tid: u32, ip: u64, range: AddressRange) -> Result<()> {
        self.stats.flushes += 1;
        if !self.states.covers(range) {
            self.emit(BugReport::new(
                BugKind::UnnecessaryFlush,
                range.start,
                range.size,
                ip,
                tid,
            ));
        } else {
            for (sub, state) in self.states.lookup(range) {
                if state == PersistenceState::WritebackPending {
                    self.emit(BugReport::new(
                        BugKind::UnnecessaryFlush,
                        sub.start,
                        sub.size,
                        ip,
                        tid,
                    ));
                }
            }
        }
        self.states.insert(range, PersistenceState::WritebackPending);
        Ok(())
    }

    /// Fence: every `WritebackPending` byte becomes `WrittenBack`. A drain
    /// moving nothing is tallied as unnecessary.
    pub fn drain(&mut self, tid: u32, ip: u64) {
        self.stats.drains += 1;
        let moved = self
            .states
            .replace_all(PersistenceState::WritebackPending, PersistenceState::WrittenBack);
        if moved == 0 {
            self.stats.unnecessary_drains += 1;
            if self.config.report_unnecessary_drain {
                self.emit(BugReport::new(BugKind::UnnecessaryDrain, 0, 0, ip, tid));
            }
        }
    }

    /// Non-transactional durability confirmation: the caller has
    /// independently established write-back completion.
    pub fn confirm_consistent(&mut self, range: AddressRange) -> Result<()> {
        if !self.is_pm_range(range) {
            return Err(EngineError::NonPmNeverConsistent { addr: range.start, size: range.size });
        }
        self.states.insert(range, PersistenceState::Consistent);
        Ok(())
    }

    /// True iff every mapped byte in `range` is `Consistent` or `Clean`.
    /// Querying a range with no recorded state at all is engine misuse.
    pub fn is_consistent(&self, range: AddressRange) -> Result<bool> {
        self.check_queryable(range)?;
        Ok(self
            .states
            .lookup(range)
            .iter()
            .all(|(_, state)| state.counts_consistent()))
    }

    /// True iff every byte in `range` is exactly `WrittenBack`.
    pub fn is_writtenback(&self, range: AddressRange) -> Result<bool> {
        self.check_queryable(range)?;
        Ok(self.states.covers(range)
            && self
                .states
                .lookup(range)
                .iter()
                .all(|(_, state)| *state == PersistenceState::WrittenBack))
    }

    /// True iff `range` lies inside the configured PM arena window.
    pub fn is_pm_range(&self, range: AddressRange) -> bool {
        self.config.in_pm_window(range.start, range.size)
    }

    fn check_queryable(&self, range: AddressRange) -> Result<()> {
        if !self.is_pm_range(range) {
            return Err(EngineError::CheckNonPm { addr: range.start, size: range.size });
        }
        if !self.states.overlaps(range) {
            return Err(EngineError::QueryUnallocated { addr: range.start, size: range.size });
        }
        Ok(())
    }

    // --- Transaction protocol ---

    pub fn tx_begin(&mut self, tid: u32) -> Result<()> {
        self.ctx(tid)?.tx_level += 1;
        Ok(())
    }

    /// Leave a transaction. The outermost end commits: every staged range
    /// becomes `Consistent` directly (the transactional mechanism is assumed
    /// to guarantee durability) and both staged sets are cleared.
    pub fn tx_end(&mut self, tid: u32) -> Result<()> {
        let ctx = self.ctx(tid)?;
        if ctx.tx_level == 0 {
            return Err(EngineError::TxEndWithoutBegin { tid });
        }
        ctx.tx_level -= 1;
        if ctx.tx_level == 0 {
            let staged: Vec<AddressRange> = ctx.added.iter().collect();
            ctx.clear_staged();
            for range in staged {
                self.states.insert(range, PersistenceState::Consistent);
            }
        }
        Ok(())
    }

    /// Stage `range` for undo/redo protection.
    ///
    /// A TX_ADD after the range was already written inside this transaction
    /// is a consistency bug (the pre-image is lost); a TX_ADD of an
    /// already-staged range is a performance bug, suppressed inside internal
    /// library code.
    pub fn tx_add(&mut self, tid: u32, ip: u64, range: AddressRange) -> Result<()> {
        let ctx = self.ctx(tid)?;
        let detect = !ctx.detection_disabled;
        let internal = ctx.in_internal();
        let after_write = ctx.non_added_writes.contains_overlap(range);
        let already_added = ctx.added.contains_overlap(range);
        ctx.added.insert(range);

        if detect && after_write {
            self.emit(BugReport::new(BugKind::TxAddAfterWrite, range.start, range.size, ip, tid));
        }
        if detect && !internal && already_added {
            self.emit(BugReport::new(BugKind::UnnecessaryTxAdd, range.start, range.size, ip, tid));
        }
        Ok(())
    }

    pub fn is_in_tx(&self, tid: u32) -> bool {
        self.threads.get(&tid).is_some_and(ThreadCtx::in_tx)
    }

    pub fn is_added(&self, tid: u32, range: AddressRange) -> bool {
        self.threads
            .get(&tid)
            .is_some_and(|ctx| ctx.added.contains_overlap(range))
    }

    pub fn is_non_added_write(&self, tid: u32, range: AddressRange) -> bool {
        self.threads
            .get(&tid)
            .is_some_and(|ctx| ctx.non_added_writes.contains_overlap(range))
    }

    // --- Internal-function suppression and detection switches ---

    pub fn enter_internal(&mut self, tid: u32) -> Result<()> {
        self.ctx(tid)?.internal_level += 1;
        Ok(())
    }

    pub fn exit_internal(&mut self, tid: u32) -> Result<()> {
        let ctx = self.ctx(tid)?;
        if ctx.internal_level == 0 {
            return Err(EngineError::InternalExitWithoutEnter { tid });
        }
        ctx.internal_level -= 1;
        Ok(())
    }

    pub fn reset_internal(&mut self, tid: u32) -> Result<()> {
        self.ctx(tid)?.internal_level = 0;
        Ok(())
    }

    pub fn in_internal(&self, tid: u32) -> bool {
        self.threads.get(&tid).is_some_and(ThreadCtx::in_internal)
    }

    pub fn disable_detection(&mut self, tid: u32) -> Result<()> {
        self.ctx(tid)?.detection_disabled = true;
        Ok(())
    }

    pub fn enable_detection(&mut self, tid: u32) -> Result<()> {
        self.ctx(tid)?.detection_disabled = false;
        Ok(())
    }

    pub fn is_detection_disabled(&self, tid: u32) -> bool {
        self.threads.get(&tid).is_some_and(|ctx| ctx.detection_disabled)
    }

    // --- Commit variable ---

    pub fn register_commit_var(&mut self, range: AddressRange) {
        self.commit.register(range);
    }

    pub fn is_commit_var(&self, range: AddressRange) -> bool {
        self.commit.is_commit_var(range)
    }

    /// Record the current logical time as the commit variable's update time.
    pub fn note_commit_update(&mut self) {
        self.commit.note_update(self.global_time);
    }

    /// Store to the commit variable: registers the range, applies write
    /// semantics, then refreshes the commit timestamp.
    pub fn commit_write(&mut self, tid: u32, ip: u64, range: AddressRange) -> Result<()> {
        self.commit.register(range);
        self.write(tid, ip, range)?;
        self.commit.note_update(self.global_time);
        Ok(())
    }

    /// True iff the commit flag is stale relative to `range`: never updated,
    /// or updated strictly after the newest recorded modification of the
    /// range. Per-range check; callers compose multiple data ranges.
    pub fn is_stale_commit(&self, range: AddressRange) -> bool {
        let max_modify = self
            .modify_times
            .lookup(range)
            .iter()
            .map(|(_, time)| *time)
            .max();
        self.commit.is_stale(max_modify)
    }

    /// Emit a `StaleCommit` report for `range` if the commit flag is stale.
    /// Emission policy belongs to the driver; the query itself never reports.
    pub fn check_stale_commit(&mut self, tid: u32, ip: u64, range: AddressRange) -> bool {
        let stale = self.is_stale_commit(range);
        if stale {
            self.emit(BugReport::new(BugKind::StaleCommit, range.start, range.size, ip, tid));
        }
        stale
    }

    // --- Read-consistency check ---

    /// Post-failure read: a value observed on recovery whose durability was
    /// never established pre-crash is an inconsistent read, attributed to
    /// the most recent writer of the range.
    pub fn read(&mut self, tid: u32, ip: u64, range: AddressRange) -> Result<()> {
        if !self.is_pm_range(range) {
            return Ok(());
        }
        let ctx = self.ctx(tid)?;
        if ctx.detection_disabled || ctx.in_internal() {
            return Ok(());
        }
        let key = (range.start, range.size);
        if self.reported.contains(&key) {
            return Ok(());
        }
        // Durable data is fine to observe on recovery; so is memory with no
        // shadow state left (e.g. deallocated before the crash point).
        let consistent = self
            .states
            .lookup(range)
            .iter()
            .all(|(_, state)| state.counts_consistent());
        if consistent {
            return Ok(());
        }
        if let Some((_, write_ip)) = self.write_ips.lookup(range).first().copied() {
            let mut report =
                BugReport::new(BugKind::InconsistentRead, range.start, range.size, ip, tid);
            report.write_ip = Some(write_ip);
            self.emit(report);
            self.reported.insert(key);
        }
        Ok(())
    }

    // --- Internals ---

    pub(crate) fn states(&self) -> &IntervalMap<PersistenceState> {
        &self.states
    }

    pub(crate) fn modify_times(&self) -> &IntervalMap<Timestamp> {
        &self.modify_times
    }

    pub(crate) fn write_ips(&self) -> &IntervalMap<Addr> {
        &self.write_ips
    }

    pub(crate) fn commit_tracker(&self) -> &CommitTracker {
        &self.commit
    }

    fn emit(&mut self, report: BugReport) {
        self.stats.reports += 1;
        self.reporter.emit(report);
    }

    fn ctx(&mut self, tid: u32) -> Result<&mut ThreadCtx> {
        if tid >= self.config.max_threads {
            return Err(EngineError::ThreadIdOutOfRange { tid, max: self.config.max_threads });
        }
        Ok(self.threads.entry(tid).or_default())
    }
}

impl Default for ShadowEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Feed records through the engine in order with the default time policy:
/// the logical clock advances after every drain and commit-variable write.
pub fn replay<I>(engine: &mut ShadowEngine, records: I) -> Result<()>
where
    I: IntoIterator<Item = TraceRecord>,
{
    for rec in records {
        engine.apply(&rec)?;
        if matches!(rec.op, PmOp::Drain | PmOp::CommitWrite) {
            engine.advance_time();
        }
    }
    Ok(())
}
