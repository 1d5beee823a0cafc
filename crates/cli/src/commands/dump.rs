use std::path::Path;

use anyhow::{Context, Result};

use pmguard_trace::TraceReader;

pub fn run(trace: &Path) -> Result<()> {
    let reader =
        TraceReader::open(trace).with_context(|| format!("failed to open trace {}", trace.display()))?;
    println!("trace version {} exec_id {}", reader.header().version, reader.exec_id());

    for (seq, record) in reader.enumerate() {
        let rec = record.with_context(|| format!("trace record {seq} unreadable"))?;
        println!(
            "[{seq}] {:<12} tid={} ip={:#x} src={:#x} dst={:#x} size={:#x} ret={}",
            rec.op.name(),
            rec.tid,
            rec.ip,
            rec.src_addr,
            rec.dst_addr,
            rec.size,
            rec.ret
        );
    }
    Ok(())
}
