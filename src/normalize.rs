use serde::Serialize;
use tracing::debug;

use crate::{errors::FixtureError, trace::TraceEvent};

/// A recognized trace event together with the 1-based line it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub line: usize,
    pub event: TraceEvent,
}

/// Turns raw trace lines into the sequence the verifier replays.
///
/// Noise lines are dropped, every recognized line is parsed, and the result
/// is ordered by output timestamp. The sort is stable: events sharing a
/// timestamp keep the order in which the engine printed them.
pub fn normalize<I, S>(lines: I, submitter_ids: bool) -> Result<Vec<TraceRecord>, FixtureError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (idx, raw) in lines.into_iter().enumerate() {
        match TraceEvent::parse_line(idx + 1, raw.as_ref(), submitter_ids)? {
            Some(event) => records.push(TraceRecord {
                line: idx + 1,
                event,
            }),
            None => dropped += 1,
        }
    }
    records.sort_by_key(|r| r.event.output_time());
    debug!(events = records.len(), dropped, "normalized trace");
    Ok(records)
}

/// Canonical text of a normalized trace, one event per line.
pub fn render(records: &[TraceRecord]) -> Vec<String> {
    records.iter().map(|r| r.event.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(records: &[TraceRecord]) -> Vec<u64> {
        records.iter().map(|r| r.event.output_time()).collect()
    }

    #[test]
    fn sorts_by_output_time_and_drops_noise() {
        let raw = [
            "# header",
            "E 1 2 1 100 10 0 3",
            "",
            "B 1 APPL 100 10 0 1",
            "--- thread 2 ---",
            "S 2 APPL 100 10 0 2",
        ];
        let out = normalize(raw, false).unwrap();
        assert_eq!(times(&out), vec![1, 2, 3]);
        assert_eq!(out[0].line, 4);
        assert_eq!(out[2].line, 2);
    }

    #[test]
    fn equal_timestamps_keep_printed_order() {
        let raw = [
            "X 5 R 0 7",
            "B 1 APPL 100 10 0 7",
            "S 2 APPL 101 10 0 3",
            "B 3 APPL 99 10 0 7",
        ];
        let out = normalize(raw, false).unwrap();
        let lines: Vec<usize> = out.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 1, 2, 4]);
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let raw = [
            "E 1 2 1 100 4 0 9",
            "S 2 APPL 100 4 0 2",
            "B 1 APPL 100 10 0 2",
            "X 1 A 0 11",
            "B 3 TSLA 7 1 0 1",
        ];
        let once = normalize(raw, false).unwrap();
        let twice = normalize(render(&once), false).unwrap();
        let a: Vec<_> = once.iter().map(|r| &r.event).collect();
        let b: Vec<_> = twice.iter().map(|r| &r.event).collect();
        assert_eq!(a, b);
        assert_eq!(render(&once), render(&twice));
    }

    #[test]
    fn malformed_line_aborts_normalization() {
        let raw = ["B 1 APPL 100 10 0 1", "E 1 2 x 100 10 0 3"];
        let err = normalize(raw, false).unwrap_err();
        assert!(matches!(err, FixtureError::BadField { line: 2, .. }));
    }
}
