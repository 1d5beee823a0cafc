//! Engine configuration.

/// Default base of the PM arena window. Operations outside the window are
/// flagged, never silently ignored.
pub const DEFAULT_PM_BASE: u64 = 0x1000_0000_0000;

/// Default size of the PM arena window (1 TiB).
pub const DEFAULT_PM_SIZE: u64 = 0x100_0000_0000;

/// Upper bound on logical thread ids the engine will accept.
pub const DEFAULT_MAX_THREADS: u32 = 1024;

/// Maximum number of call-stack lines printed per backtrace match.
pub const MAX_BACKTRACE_FRAMES: usize = 16;

/// Construction-time knobs for [`crate::ShadowEngine`].
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Start of the PM arena window.
    pub pm_base: u64,
    /// Size of the PM arena window in bytes.
    pub pm_size: u64,
    /// Thread ids at or above this bound are a fatal invariant violation.
    pub max_threads: u32,
    /// Emit a report for drains that move no bytes. Detection always runs
    /// and is tallied in the replay stats; emission is off by default to
    /// keep double-fence noise out of reports.
    pub report_unnecessary_drain: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pm_base: DEFAULT_PM_BASE,
            pm_size: DEFAULT_PM_SIZE,
            max_threads: DEFAULT_MAX_THREADS,
            report_unnecessary_drain: false,
        }
    }
}

impl EngineConfig {
    /// True iff `[start, start+size)` lies entirely inside the PM window.
    /// Both bounds are CLI-settable, so the window end saturates instead of
    /// trusting `base + size` not to wrap.
    pub fn in_pm_window(&self, start: u64, size: u64) -> bool {
        start >= self.pm_base
            && start.saturating_add(size) <= self.pm_base.saturating_add(self.pm_size)
    }
}
