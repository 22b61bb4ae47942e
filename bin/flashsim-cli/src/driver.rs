//! Feeds host requests through the translation layer and tallies results

use crate::workload::{Op, Request};
use anyhow::{Context, Result};
use flashsim_common::{Event, StatsSnapshot};
use flashsim_ftl::TranslationLayer;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Outcome of a simulation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub requests: u64,
    pub reads: u64,
    pub writes: u64,
    pub trims: u64,
    /// Reads of pages with no current mapping
    pub unmapped_reads: u64,
    /// Requests whose final flash operation reported failure
    pub failures: u64,
    /// Sum of per-request latencies
    pub busy_time: f64,
    /// Completion time of the last request
    pub end_time: f64,
    pub write_amplification: f64,
    pub stats: StatsSnapshot,
}

/// Deterministic page contents for the `seq`-th write
fn payload(lpn: u64, seq: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&lpn.to_le_bytes());
    data.extend_from_slice(&seq.to_le_bytes());
    data
}

/// Run every request to completion, one after another
///
/// Requests without an explicit start time are submitted as soon as the
/// previous one completes.
pub fn execute<L: TranslationLayer>(
    ftl: &mut L,
    requests: impl IntoIterator<Item = Request>,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut clock = 0.0_f64;

    for (index, request) in requests.into_iter().enumerate() {
        let start = request.start_time.unwrap_or(clock);
        let (event, status) = match request.op {
            Op::Read => {
                summary.reads += 1;
                let mut event = Event::read(request.lpn, start);
                let status = ftl.read(&mut event);
                if event.address().is_none() {
                    summary.unmapped_reads += 1;
                }
                (event, status)
            }
            Op::Write => {
                summary.writes += 1;
                let data = payload(request.lpn, summary.writes);
                let mut event = Event::write(request.lpn, data, start);
                let status = ftl.write(&mut event);
                (event, status)
            }
            Op::Trim => {
                summary.trims += 1;
                let mut event = Event::trim(request.lpn, start);
                let status = ftl.trim(&mut event);
                (event, status)
            }
        };
        let status = status.with_context(|| {
            format!("request {} ({:?} {}) failed", index, request.op, request.lpn)
        })?;

        if !status.is_success() {
            warn!("{:?} of page {} reported failure", request.op, request.lpn);
            summary.failures += 1;
        }
        summary.requests += 1;
        summary.busy_time += event.time_taken();
        clock = clock.max(event.end_time());

        if !event.sub_ops().is_empty() {
            debug!(
                "{:?} {} triggered {} internal operations",
                request.op,
                request.lpn,
                event.sub_ops().len()
            );
        }
    }

    summary.end_time = clock;
    summary.stats = ftl.stats();
    summary.write_amplification = summary.stats.write_amplification(summary.writes);
    Ok(summary)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "Requests:            {}", self.requests)?;
        writeln!(
            f,
            "  reads / writes / trims: {} / {} / {}",
            self.reads, self.writes, self.trims
        )?;
        writeln!(f, "  unmapped reads:      {}", self.unmapped_reads)?;
        writeln!(f, "  failures:            {}", self.failures)?;
        writeln!(
            f,
            "Simulated time:      {:.1} us (busy {:.1} us)",
            self.end_time, self.busy_time
        )?;
        writeln!(f, "Write amplification: {:.3}", self.write_amplification)?;
        writeln!(f)?;
        writeln!(
            f,
            "FTL reads / writes / trims:   {} / {} / {}",
            s.ftl_reads, s.ftl_writes, s.ftl_trims
        )?;
        writeln!(f, "Memory reads:                 {}", s.memory_reads)?;
        writeln!(f, "Map reads / writes:           {} / {}", s.map_reads, s.map_writes)?;
        writeln!(
            f,
            "Merges (switch / full):       {} / {}",
            s.log_merge_switch, s.log_merge_full
        )?;
        writeln!(f, "Log evictions:                {}", s.log_evictions)?;
        writeln!(
            f,
            "Flash reads / writes / erases: {} / {} / {}",
            s.flash_reads, s.flash_writes, s.flash_erases
        )?;
        writeln!(f, "Eager reclaims:               {}", s.eager_reclaims)?;
        write!(f, "Blocks promoted:              {}", s.blocks_promoted)
    }
}
