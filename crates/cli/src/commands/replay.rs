use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use pmguard::config::EngineConfig;
use pmguard::digest::state_digest;
use pmguard::engine::ShadowEngine;
use pmguard::report::{BacktraceResolver, BugReport};
use pmguard::state::AddressRange;
use pmguard::trace::PmOp;
use pmguard_trace::TraceReader;

use super::parse_range;
use super::parse_u64;

pub struct ReplayOpts {
    pub trace: PathBuf,
    pub backtrace_dir: Option<PathBuf>,
    pub commit_vars: Vec<String>,
    pub report_unnecessary_drains: bool,
    pub pm_base: Option<String>,
    pub pm_size: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    records: u64,
    writes: u64,
    flushes: u64,
    drains: u64,
    unnecessary_drains: u64,
    digest: String,
    reports: &'a [BugReport],
}

pub fn run(opts: ReplayOpts) -> Result<()> {
    let reader = TraceReader::open(&opts.trace)
        .with_context(|| format!("failed to open trace {}", opts.trace.display()))?;
    let exec_id = reader.exec_id();
    info!(exec_id, trace = %opts.trace.display(), "replaying trace");

    let mut config = EngineConfig::default();
    if let Some(base) = &opts.pm_base {
        config.pm_base = parse_u64(base)?;
    }
    if let Some(size) = &opts.pm_size {
        config.pm_size = parse_u64(size)?;
    }
    config.report_unnecessary_drain = opts.report_unnecessary_drains;

    let mut engine = ShadowEngine::new(config);
    engine.set_report_echo(!opts.json);
    if let Some(dir) = &opts.backtrace_dir {
        engine.set_backtrace_resolver(BacktraceResolver::open(dir, exec_id));
    }
    for spec in &opts.commit_vars {
        let (start, size) = parse_range(spec)?;
        engine.register_commit_var(AddressRange::new(start, size)?);
    }

    // The engine's contract is only defined for well-formed traces: the
    // first fatal invariant violation terminates the run, naming the
    // violated invariant.
    for (seq, record) in reader.enumerate() {
        let record = record.with_context(|| format!("trace record {seq} unreadable"))?;
        debug!(seq, op = record.op.name(), "record");
        engine
            .apply(&record)
            .with_context(|| format!("fatal at record {seq} ({})", record.op.name()))?;
        // Driver time policy: each ordering point gets its own logical tick.
        if matches!(record.op, PmOp::Drain | PmOp::CommitWrite) {
            engine.advance_time();
        }
    }

    let stats = engine.stats();
    let digest = state_digest(&engine)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();

    if opts.json {
        let summary = Summary {
            records: stats.records,
            writes: stats.writes,
            flushes: stats.flushes,
            drains: stats.drains,
            unnecessary_drains: stats.unnecessary_drains,
            digest,
            reports: engine.reporter().reports(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Replayed {} records: {} writes, {} flushes, {} drains ({} unnecessary)",
            stats.records, stats.writes, stats.flushes, stats.drains, stats.unnecessary_drains
        );
        println!("Bug reports: {}", stats.reports);
        println!("State digest: {digest}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmguard::trace::TraceRecord;
    use pmguard_trace::TraceWriter;

    #[test]
    fn test_replay_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.trace");
        let base = pmguard::config::DEFAULT_PM_BASE;

        let mut writer = TraceWriter::create(&path, 3).unwrap();
        let mut rec = TraceRecord {
            op: PmOp::Alloc,
            tid: 0,
            ip: 0x400100,
            src_addr: 0,
            dst_addr: base + 0x1000,
            size: 64,
            ret: true,
        };
        writer.append(&rec).unwrap();
        rec.op = PmOp::Write;
        rec.size = 8;
        writer.append(&rec).unwrap();
        rec.op = PmOp::Flush;
        rec.size = 64;
        writer.append(&rec).unwrap();
        rec.op = PmOp::Drain;
        writer.append(&rec).unwrap();
        drop(writer);

        let opts = ReplayOpts {
            trace: path,
            backtrace_dir: None,
            commit_vars: vec![],
            report_unnecessary_drains: false,
            pm_base: None,
            pm_size: None,
            json: true,
        };
        run(opts).unwrap();
    }
}
