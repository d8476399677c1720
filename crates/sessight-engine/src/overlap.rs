//! Sessions that ran at the same time.

use chrono::NaiveDateTime;
use serde::Serialize;
use sessight_types::SessionSpan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapSession {
    pub session_id: String,
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapPeriod {
    pub first: OverlapSession,
    pub second: OverlapSession,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: f64,
}

impl OverlapSession {
    fn of(span: &SessionSpan) -> Self {
        Self {
            session_id: span.session_id.clone(),
            project: span.project_path.clone(),
        }
    }
}

/// Every pair of sessions whose spans intersect for at least
/// `min_overlap_minutes`.
///
/// Single-event sessions have no extent and are ignored. The comparison is
/// pairwise, O(n²) in the number of sessions. Results are sorted by duration
/// descending, then start time and session ids.
pub fn detect_overlaps(spans: &[SessionSpan], min_overlap_minutes: i64) -> Vec<OverlapPeriod> {
    let mut active: Vec<&SessionSpan> = spans.iter().filter(|s| s.event_count > 1).collect();
    active.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    let mut periods = Vec::new();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if end <= start {
                continue;
            }
            let overlap = end - start;
            if overlap.num_seconds() < min_overlap_minutes * 60 {
                continue;
            }
            periods.push(OverlapPeriod {
                first: OverlapSession::of(a),
                second: OverlapSession::of(b),
                start,
                end,
                duration_minutes: (overlap.num_seconds() as f64 / 60.0 * 10.0).round() / 10.0,
            });
        }
    }

    periods.sort_by(|x, y| {
        y.duration_minutes
            .total_cmp(&x.duration_minutes)
            .then_with(|| x.start.cmp(&y.start))
            .then_with(|| x.first.session_id.cmp(&y.first.session_id))
            .then_with(|| x.second.session_id.cmp(&y.second.session_id))
    });
    periods
}
