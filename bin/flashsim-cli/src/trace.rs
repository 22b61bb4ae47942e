//! Request trace files
//!
//! One request per line: `<op> <logical_page> [start_time]`, where `op` is
//! `R`, `W` or `T` in either case. Blank lines and `#` comments are skipped.

use crate::workload::{Op, Request};
use anyhow::{Context, Result, anyhow, bail};
use std::io::BufRead;
use std::path::Path;

/// Read a trace file from disk
pub fn load_trace(path: &Path) -> Result<Vec<Request>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open trace {}", path.display()))?;
    parse_trace(std::io::BufReader::new(file))
        .with_context(|| format!("invalid trace {}", path.display()))
}

/// Parse trace text from any buffered reader
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<Request>> {
    let mut requests = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(request) = parse_line(&line).with_context(|| format!("line {}", index + 1))? {
            requests.push(request);
        }
    }
    Ok(requests)
}

fn parse_line(line: &str) -> Result<Option<Request>> {
    let content = line.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut fields = content.split_whitespace();
    let op = match fields.next() {
        Some(op) if op.eq_ignore_ascii_case("r") => Op::Read,
        Some(op) if op.eq_ignore_ascii_case("w") => Op::Write,
        Some(op) if op.eq_ignore_ascii_case("t") => Op::Trim,
        Some(op) => bail!("unknown operation '{op}'"),
        None => return Ok(None),
    };
    let lpn = fields
        .next()
        .ok_or_else(|| anyhow!("missing logical page"))?
        .parse::<u64>()
        .context("bad logical page")?;
    let start_time = fields
        .next()
        .map(|t| t.parse::<f64>().context("bad start time"))
        .transpose()?;
    if let Some(time) = start_time {
        if !time.is_finite() || time < 0.0 {
            bail!("start time {time} must be a non-negative number");
        }
    }
    if let Some(extra) = fields.next() {
        bail!("unexpected field '{extra}'");
    }

    Ok(Some(Request {
        op,
        lpn,
        start_time,
    }))
}
