//! Period-over-period comparison.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sessight_types::{PeriodMetrics, TimeWindow};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Changes within this many percent either way count as unchanged
const DEAD_ZONE_PCT: f64 = 5.0;
const MAX_TOOL_CHANGES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricChange {
    pub current: f64,
    pub previous: f64,
    /// Percent change, one decimal
    pub change_pct: f64,
    pub direction: Direction,
}

impl MetricChange {
    pub fn between(current: f64, previous: f64) -> Self {
        let (pct, direction) = if previous == 0.0 {
            if current == 0.0 {
                (0.0, Direction::Unchanged)
            } else {
                (100.0, Direction::Up)
            }
        } else {
            let pct = (current - previous) / previous * 100.0;
            let direction = if pct > DEAD_ZONE_PCT {
                Direction::Up
            } else if pct < -DEAD_ZONE_PCT {
                Direction::Down
            } else {
                Direction::Unchanged
            };
            (pct, direction)
        };

        Self {
            current,
            previous,
            change_pct: (pct * 10.0).round() / 10.0,
            direction,
        }
    }

    fn counts(current: i64, previous: i64) -> Self {
        Self::between(current as f64, previous as f64)
    }
}

/// Which earlier period the current one is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// The period of equal length immediately before
    #[default]
    Previous,
    /// The same span ending 30 days earlier
    SameLastMonth,
}

impl CompareMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareMode::Previous => "previous",
            CompareMode::SameLastMonth => "same_last_month",
        }
    }

    pub fn comparison_window(&self, current: &TimeWindow) -> TimeWindow {
        match self {
            CompareMode::Previous => current.shifted_back(current.duration()),
            CompareMode::SameLastMonth => current.shifted_back(Duration::days(30)),
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous" => Ok(CompareMode::Previous),
            "same_last_month" => Ok(CompareMode::SameLastMonth),
            other => Err(format!(
                "unknown comparison '{}': expected previous or same_last_month",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendMetrics {
    pub events: MetricChange,
    pub sessions: MetricChange,
    pub errors: MetricChange,
    pub error_rate: MetricChange,
    pub input_tokens: MetricChange,
    pub output_tokens: MetricChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolChange {
    pub tool: String,
    #[serde(flatten)]
    pub change: MetricChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub metrics: TrendMetrics,
    /// Largest relative changes first
    pub tool_changes: Vec<ToolChange>,
}

pub fn compare_periods(current: &PeriodMetrics, previous: &PeriodMetrics) -> PeriodComparison {
    let metrics = TrendMetrics {
        events: MetricChange::counts(current.events, previous.events),
        sessions: MetricChange::counts(current.sessions, previous.sessions),
        errors: MetricChange::counts(current.errors, previous.errors),
        error_rate: MetricChange::between(current.error_rate(), previous.error_rate()),
        input_tokens: MetricChange::counts(current.input_tokens, previous.input_tokens),
        output_tokens: MetricChange::counts(current.output_tokens, previous.output_tokens),
    };

    let tools: BTreeSet<&String> = current
        .tool_counts
        .keys()
        .chain(previous.tool_counts.keys())
        .collect();

    let mut tool_changes: Vec<ToolChange> = tools
        .into_iter()
        .filter_map(|tool| {
            let now = current.tool_counts.get(tool).copied().unwrap_or(0);
            let before = previous.tool_counts.get(tool).copied().unwrap_or(0);
            let change = MetricChange::counts(now, before);
            (change.direction != Direction::Unchanged || now > 0).then(|| ToolChange {
                tool: tool.clone(),
                change,
            })
        })
        .collect();

    // Stable sort keeps tool names ordered within equal magnitudes
    tool_changes.sort_by(|a, b| b.change.change_pct.abs().total_cmp(&a.change.change_pct.abs()));
    tool_changes.truncate(MAX_TOOL_CHANGES);

    PeriodComparison {
        metrics,
        tool_changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::at;
    use std::collections::BTreeMap;

    #[test]
    fn test_metric_change_directions() {
        let up = MetricChange::between(150.0, 100.0);
        assert_eq!((up.change_pct, up.direction), (50.0, Direction::Up));

        let down = MetricChange::between(50.0, 100.0);
        assert_eq!((down.change_pct, down.direction), (-50.0, Direction::Down));

        let flat = MetricChange::between(96.0, 100.0);
        assert_eq!((flat.change_pct, flat.direction), (-4.0, Direction::Unchanged));

        let edge = MetricChange::between(104.0, 100.0);
        assert_eq!(edge.direction, Direction::Unchanged);

        let slight_drop = MetricChange::between(94.0, 100.0);
        assert_eq!(slight_drop.direction, Direction::Down);
    }

    #[test]
    fn test_drop_from_hundred_to_eighty() {
        let change = MetricChange::between(80.0, 100.0);
        assert_eq!(change.change_pct, -20.0);
        assert_eq!(change.direction, Direction::Down);
    }

    #[test]
    fn test_metric_change_from_zero() {
        let both = MetricChange::between(0.0, 0.0);
        assert_eq!((both.change_pct, both.direction), (0.0, Direction::Unchanged));

        let fresh = MetricChange::between(7.0, 0.0);
        assert_eq!((fresh.change_pct, fresh.direction), (100.0, Direction::Up));
    }

    #[test]
    fn test_pct_rounded_to_one_decimal() {
        assert_eq!(MetricChange::between(2.0, 3.0).change_pct, -33.3);
    }

    #[test]
    fn test_comparison_windows() {
        let current = TimeWindow::days_ending_at(at(0), 7);

        let previous = CompareMode::Previous.comparison_window(&current);
        assert_eq!(previous.end, current.start);
        assert_eq!(previous.duration(), current.duration());

        let last_month = CompareMode::SameLastMonth.comparison_window(&current);
        assert_eq!(last_month.end, at(0) - Duration::days(30));
        assert_eq!(last_month.start, at(0) - Duration::days(37));
    }

    #[test]
    fn test_compare_mode_parses() {
        assert_eq!("same_last_month".parse(), Ok(CompareMode::SameLastMonth));
        assert!("yesterday".parse::<CompareMode>().is_err());
    }

    #[test]
    fn test_tool_changes_ranked_by_magnitude() {
        let current = PeriodMetrics {
            events: 200,
            errors: 10,
            tool_counts: BTreeMap::from([
                ("Bash".to_string(), 40),
                ("Edit".to_string(), 20),
                ("Read".to_string(), 100),
            ]),
            ..Default::default()
        };
        let previous = PeriodMetrics {
            events: 100,
            errors: 10,
            tool_counts: BTreeMap::from([
                ("Bash".to_string(), 10),
                ("Read".to_string(), 100),
                ("Grep".to_string(), 5),
            ]),
            ..Default::default()
        };

        let comparison = compare_periods(&current, &previous);
        assert_eq!(comparison.metrics.events.direction, Direction::Up);
        assert_eq!(comparison.metrics.error_rate.change_pct, -50.0);

        let ranked: Vec<(&str, f64)> = comparison
            .tool_changes
            .iter()
            .map(|t| (t.tool.as_str(), t.change.change_pct))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Bash", 300.0),
                ("Edit", 100.0),
                ("Grep", -100.0),
                ("Read", 0.0),
            ]
        );
    }

    #[test]
    fn test_unused_tools_are_dropped() {
        let current = PeriodMetrics::default();
        let previous = PeriodMetrics {
            tool_counts: BTreeMap::from([("Glob".to_string(), 1)]),
            ..Default::default()
        };
        let comparison = compare_periods(&current, &previous);
        assert_eq!(comparison.tool_changes.len(), 1);

        let steady = PeriodMetrics {
            tool_counts: BTreeMap::from([("Glob".to_string(), 0)]),
            ..Default::default()
        };
        assert!(compare_periods(&steady, &steady).tool_changes.is_empty());
    }
}
