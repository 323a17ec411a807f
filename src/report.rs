//! Report aggregation and sinks.
//!
//! [`aggregate`] reduces trial records and a verdict into a
//! [`BenchmarkReport`] without doing any I/O. Presentation lives in the
//! [`ReportSink`] implementations.

use std::io::{self, Write};

use crate::harness::BenchConfig;
use crate::schema::{AllocationStats, BenchmarkReport, DurationStats};
use crate::stability::StabilityVerdict;
use crate::trial::{TrialRecord, TrialRun};

pub fn aggregate(
    name: &str,
    config: &BenchConfig,
    run: TrialRun,
    verdict: StabilityVerdict,
    allocation_tracked: bool,
) -> BenchmarkReport {
    let TrialRun { records, failure } = run;
    let counter_anomalies = records.iter().filter(|r| r.counter_anomaly).count();
    let checkpoints_truncated = records.iter().filter(|r| r.checkpoints_truncated).count();

    BenchmarkReport {
        name: name.to_string(),
        warmup_count: config.warmup_count,
        trial_count: config.trial_count,
        trials_completed: records.len(),
        duration: duration_stats(&records),
        allocation: allocation_stats(&records),
        allocation_tracked,
        counter_anomalies,
        checkpoints_truncated,
        verdict,
        incomplete: failure.is_some(),
        failure,
        records,
    }
}

pub fn duration_stats(records: &[TrialRecord]) -> DurationStats {
    let mut values: Vec<u64> = records.iter().map(|r| r.duration_ns).collect();
    if values.is_empty() {
        return DurationStats::default();
    }
    values.sort_unstable();
    DurationStats {
        min_ns: values[0],
        median_ns: median(&values),
        mean_ns: mean(&values),
        max_ns: values[values.len() - 1],
    }
}

pub fn allocation_stats(records: &[TrialRecord]) -> AllocationStats {
    let mut values: Vec<u64> = records.iter().map(|r| r.bytes_allocated).collect();
    if values.is_empty() {
        return AllocationStats::default();
    }
    values.sort_unstable();
    AllocationStats {
        min_bytes: values[0],
        median_bytes: median(&values),
        mean_bytes: mean(&values),
        total_bytes: values.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
    }
}

/// Median of an ascending slice; mean of the two middle values for even
/// lengths. Returns 0 for an empty slice.
pub fn median(sorted: &[u64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: u128 = values.iter().map(|v| *v as u128).sum();
    sum as f64 / values.len() as f64
}

/// Human-readable duration: `850ns`, `12.40us`, `1.91ms`, `2.05s`.
pub fn format_duration(ns: f64) -> String {
    if ns < 1_000.0 {
        format!("{ns:.0}ns")
    } else if ns < 1_000_000.0 {
        format!("{:.2}us", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.2}ms", ns / 1_000_000.0)
    } else {
        format!("{:.2}s", ns / 1_000_000_000.0)
    }
}

/// Human-readable byte count: `64B`, `12.5B`, `3.00KiB`, `1.50MiB`.
pub fn format_bytes(bytes: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    if bytes < KIB {
        if bytes.fract() == 0.0 {
            format!("{bytes:.0}B")
        } else {
            format!("{bytes:.1}B")
        }
    } else if bytes < MIB {
        format!("{:.2}KiB", bytes / KIB)
    } else if bytes < GIB {
        format!("{:.2}MiB", bytes / MIB)
    } else {
        format!("{:.2}GiB", bytes / GIB)
    }
}

/// Reference text rendering: one `name: value` line per statistic.
pub fn render_text<W: Write>(report: &BenchmarkReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "benchmark: {}", report.name)?;
    writeln!(out, "warmup: {}", report.warmup_count)?;
    writeln!(out, "trials: {}/{}", report.trials_completed, report.trial_count)?;

    let d = &report.duration;
    writeln!(out, "duration.min: {}", format_duration(d.min_ns as f64))?;
    writeln!(out, "duration.median: {}", format_duration(d.median_ns))?;
    writeln!(out, "duration.mean: {}", format_duration(d.mean_ns))?;
    writeln!(out, "duration.max: {}", format_duration(d.max_ns as f64))?;

    if report.allocation_tracked {
        let a = &report.allocation;
        writeln!(out, "allocation.min: {}", format_bytes(a.min_bytes as f64))?;
        writeln!(out, "allocation.median: {}", format_bytes(a.median_bytes))?;
        writeln!(out, "allocation.mean: {}", format_bytes(a.mean_bytes))?;
        writeln!(out, "allocation.total: {}", format_bytes(a.total_bytes as f64))?;
    } else {
        writeln!(out, "allocation: untracked")?;
    }
    if report.counter_anomalies > 0 {
        writeln!(out, "allocation.counter_anomalies: {}", report.counter_anomalies)?;
    }

    writeln!(out, "stability: {}", report.verdict)?;
    if report.checkpoints_truncated > 0 {
        writeln!(out, "checkpoints.truncated: {}", report.checkpoints_truncated)?;
    }
    if let Some(failure) = &report.failure {
        writeln!(out, "incomplete: true ({failure})")?;
    }
    Ok(())
}

/// Destination for finished reports.
pub trait ReportSink {
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()>;
}

/// Discards reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn emit(&mut self, _report: &BenchmarkReport) -> io::Result<()> {
        Ok(())
    }
}

/// Writes [`render_text`] output, separating consecutive reports by a blank line.
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
    emitted: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, emitted: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()> {
        if self.emitted > 0 {
            writeln!(self.out)?;
        }
        render_text(report, &mut self.out)?;
        self.out.flush()?;
        self.emitted += 1;
        Ok(())
    }
}

/// Writes each report as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, report).map_err(io::Error::other)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl ReportSink for Vec<BenchmarkReport> {
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()> {
        self.push(report.clone());
        Ok(())
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> ReportSink for FnSink<F>
where
    F: FnMut(&BenchmarkReport) -> io::Result<()>,
{
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()> {
        (self.0)(report)
    }
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn emit(&mut self, report: &BenchmarkReport) -> io::Result<()> {
        (**self).emit(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallFailure, TrialFailure};
    use crate::fingerprint::{FingerprintList, TypeFingerprint};

    fn record(index: usize, duration_ns: u64, bytes: u64) -> TrialRecord {
        TrialRecord {
            trial_index: index,
            duration_ns,
            bytes_allocated: bytes,
            counter_anomaly: false,
            result_fingerprint: TypeFingerprint::F64,
            argument_fingerprints: FingerprintList::new(),
            checkpoints: Vec::new(),
            checkpoints_truncated: false,
        }
    }

    const MS: u64 = 1_000_000;

    #[test]
    fn median_of_even_count_is_mean_of_middle_pair() {
        let records: Vec<_> = [4, 1, 3, 2]
            .iter()
            .enumerate()
            .map(|(i, ms)| record(i + 1, ms * MS, 0))
            .collect();
        let stats = duration_stats(&records);
        assert_eq!(stats.median_ns, 2.5 * MS as f64);
        assert_eq!(stats.min_ns, MS);
        assert_eq!(stats.max_ns, 4 * MS);
        assert_eq!(stats.mean_ns, 2.5 * MS as f64);
    }

    #[test]
    fn median_of_odd_count_is_middle_value() {
        let records: Vec<_> = [3, 1, 2]
            .iter()
            .enumerate()
            .map(|(i, ms)| record(i + 1, ms * MS, 0))
            .collect();
        assert_eq!(duration_stats(&records).median_ns, 2.0 * MS as f64);
    }

    #[test]
    fn total_allocation_is_an_exact_sum() {
        let records = vec![record(1, 1, 10), record(2, 1, 11), record(3, 1, 12)];
        let stats = allocation_stats(&records);
        assert_eq!(stats.total_bytes, 33);
        assert_eq!(stats.min_bytes, 10);
        assert_eq!(stats.median_bytes, 11.0);
        assert_eq!(stats.mean_bytes, 11.0);
    }

    #[test]
    fn empty_records_give_zero_stats() {
        assert_eq!(duration_stats(&[]), DurationStats::default());
        assert_eq!(allocation_stats(&[]), AllocationStats::default());
    }

    #[test]
    fn aggregate_marks_failed_runs_incomplete() {
        let run = TrialRun {
            records: vec![record(1, 5, 8), record(2, 7, 8)],
            failure: Some(TrialFailure {
                trial_index: 3,
                cause: CallFailure::Panic("boom".into()),
            }),
        };
        let config = BenchConfig::default().with_warmup(2).with_trials(5);
        let report = aggregate("t", &config, run, StabilityVerdict::Stable, true);

        assert!(report.incomplete);
        assert_eq!(report.trials_completed, 2);
        assert_eq!(report.trial_count, 5);
        assert_eq!(report.warmup_count, 2);
        assert_eq!(report.allocation.total_bytes, 16);
        assert_eq!(report.duration.mean_ns, 6.0);
    }

    #[test]
    fn formats_units() {
        assert_eq!(format_duration(850.0), "850ns");
        assert_eq!(format_duration(1_910_000.0), "1.91ms");
        assert_eq!(format_duration(12_400.0), "12.40us");
        assert_eq!(format_bytes(64.0), "64B");
        assert_eq!(format_bytes(12.5), "12.5B");
        assert_eq!(format_bytes(3072.0), "3.00KiB");
    }

    #[test]
    fn text_sink_renders_reference_lines() {
        let run = TrialRun {
            records: vec![record(1, 1_910_000, 64)],
            failure: None,
        };
        let config = BenchConfig::default().with_warmup(0).with_trials(1);
        let report = aggregate("demo", &config, run, StabilityVerdict::Stable, true);

        let mut sink = TextSink::new(Vec::new());
        sink.emit(&report).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        assert!(text.contains("duration.median: 1.91ms\n"));
        assert!(text.contains("allocation.total: 64B\n"));
        assert!(text.contains("stability: stable\n"));
        assert!(!text.contains("incomplete"));
    }

    #[test]
    fn untracked_allocation_is_called_out() {
        let run = TrialRun {
            records: vec![record(1, 10, 0)],
            failure: None,
        };
        let report = aggregate("demo", &BenchConfig::default(), run, StabilityVerdict::Stable, false);
        let mut out = Vec::new();
        render_text(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("allocation: untracked\n"));
        assert!(!text.contains("allocation.total"));
    }

    #[test]
    fn collecting_and_closure_sinks() {
        let run = TrialRun {
            records: vec![record(1, 10, 0)],
            failure: None,
        };
        let report = aggregate("demo", &BenchConfig::default(), run, StabilityVerdict::Stable, true);

        let mut collected: Vec<BenchmarkReport> = Vec::new();
        collected.emit(&report).unwrap();
        assert_eq!(collected.len(), 1);

        let mut names = Vec::new();
        let mut sink = FnSink(|r: &BenchmarkReport| {
            names.push(r.name.clone());
            Ok(())
        });
        sink.emit(&report).unwrap();
        drop(sink);
        assert_eq!(names, vec!["demo".to_string()]);
    }

    #[test]
    fn json_sink_emits_verdict_and_stats() {
        let run = TrialRun {
            records: vec![record(1, 10, 4), record(2, 30, 4)],
            failure: None,
        };
        let report = aggregate("json", &BenchConfig::default(), run, StabilityVerdict::Stable, true);
        let mut sink = JsonSink::new(Vec::new());
        sink.emit(&report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();

        assert_eq!(value["name"], "json");
        assert_eq!(value["verdict"]["status"], "stable");
        assert_eq!(value["duration"]["median_ns"], 20.0);
        assert_eq!(value["allocation"]["total_bytes"], 8);
        assert_eq!(value["records"][0]["result_fingerprint"], "f64");
    }
}
