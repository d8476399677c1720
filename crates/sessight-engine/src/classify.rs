//! Labels sessions by their dominant activity.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value, json};
use sessight_types::SessionActivity;
use std::fmt;

/// Sessions with fewer events are not classified
pub const DEFAULT_MIN_EVENTS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Debugging,
    Development,
    Maintenance,
    Research,
    Mixed,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Debugging => "debugging",
            Category::Development => "development",
            Category::Maintenance => "maintenance",
            Category::Research => "research",
            Category::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that fired and the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationFactors {
    pub trigger: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl ClassificationFactors {
    fn new(trigger: &str, values: Value) -> Self {
        let values = match values {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            trigger: trigger.to_string(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub total_events: i64,
    pub edit_count: i64,
    pub read_count: i64,
    pub search_count: i64,
    pub git_count: i64,
    pub error_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClassification {
    pub session_id: String,
    pub project: String,
    pub category: Category,
    /// 0.0 to 1.0, two decimals
    pub confidence: f64,
    pub factors: ClassificationFactors,
    pub stats: ActivityStats,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

/// Session count per category; every category is always present.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDistribution {
    pub debugging: usize,
    pub development: usize,
    pub research: usize,
    pub maintenance: usize,
    pub mixed: usize,
}

impl CategoryDistribution {
    pub fn add(&mut self, category: Category) {
        let slot = match category {
            Category::Debugging => &mut self.debugging,
            Category::Development => &mut self.development,
            Category::Research => &mut self.research,
            Category::Maintenance => &mut self.maintenance,
            Category::Mixed => &mut self.mixed,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.debugging + self.development + self.research + self.maintenance + self.mixed
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub sessions: Vec<SessionClassification>,
    pub distribution: CategoryDistribution,
}

/// Classify every session with at least `min_events` events, keeping input
/// order.
pub fn classify(activity: &[SessionActivity], min_events: i64) -> Classification {
    let mut result = Classification::default();
    for session in activity.iter().filter(|a| a.total_events >= min_events) {
        let classified = classify_session(session);
        result.distribution.add(classified.category);
        result.sessions.push(classified);
    }
    result
}

fn pct(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}

/// Apply the rules in priority order: debugging, development, maintenance,
/// research, then mixed.
pub fn classify_session(activity: &SessionActivity) -> SessionClassification {
    let total = activity.total_events.max(1) as f64;
    let ratio = |n: i64| n as f64 / total;

    let edit = ratio(activity.edit_count);
    let write = ratio(activity.write_count);
    let read = ratio(activity.read_count);
    let search = ratio(activity.search_count);
    let git = ratio(activity.git_count);
    let build = ratio(activity.build_count);
    let error = ratio(activity.error_count);

    let (category, confidence, factors) = if error > 0.15 || activity.error_count > 5 {
        (
            Category::Debugging,
            (error * 3.0).min(1.0),
            ClassificationFactors::new(
                if error > 0.15 {
                    "error_rate > 15%"
                } else {
                    "error_count > 5"
                },
                json!({ "error_rate": pct(error), "error_count": activity.error_count }),
            ),
        )
    } else if edit > 0.3 || activity.write_count > 3 {
        (
            Category::Development,
            ((edit + write) * 2.0).min(1.0),
            ClassificationFactors::new(
                if edit > 0.3 {
                    "edit_rate > 30%"
                } else {
                    "write_count > 3"
                },
                json!({ "edit_rate": pct(edit), "write_count": activity.write_count }),
            ),
        )
    } else if git + build > 0.3 {
        (
            Category::Maintenance,
            ((git + build) * 2.0).min(1.0),
            ClassificationFactors::new(
                "git_build_rate > 30%",
                json!({ "git_rate": pct(git), "build_rate": pct(build) }),
            ),
        )
    } else if read + search > 0.5 {
        (
            Category::Research,
            ((read + search) * 1.5).min(1.0),
            ClassificationFactors::new(
                "read_search_rate > 50%",
                json!({ "read_rate": pct(read), "search_rate": pct(search) }),
            ),
        )
    } else {
        (
            Category::Mixed,
            0.5,
            ClassificationFactors::new(
                "no_dominant_pattern",
                json!({
                    "top_activities": {
                        "edit_rate": pct(edit),
                        "read_rate": pct(read),
                        "search_rate": pct(search),
                    }
                }),
            ),
        )
    };

    SessionClassification {
        session_id: activity.session_id.clone(),
        project: activity.project_path.clone(),
        category,
        confidence: (confidence * 100.0).round() / 100.0,
        factors,
        stats: ActivityStats {
            total_events: activity.total_events,
            edit_count: activity.edit_count,
            read_count: activity.read_count,
            search_count: activity.search_count,
            git_count: activity.git_count,
            error_count: activity.error_count,
        },
        first_seen: activity.first_seen,
        last_seen: activity.last_seen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(total: i64) -> SessionActivity {
        SessionActivity {
            session_id: "s1".to_string(),
            project_path: "proj".to_string(),
            total_events: total,
            ..Default::default()
        }
    }

    #[test]
    fn test_debugging_by_error_rate() {
        let session = SessionActivity {
            error_count: 4,
            edit_count: 10,
            ..activity(20)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Debugging);
        assert_eq!(c.confidence, 0.6);
        assert_eq!(c.factors.trigger, "error_rate > 15%");
        assert_eq!(c.factors.values["error_rate"], json!(20.0));
    }

    #[test]
    fn test_debugging_by_error_count() {
        let session = SessionActivity {
            error_count: 6,
            ..activity(100)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Debugging);
        assert_eq!(c.factors.trigger, "error_count > 5");
        assert_eq!(c.confidence, 0.18);
    }

    #[test]
    fn test_development() {
        let session = SessionActivity {
            edit_count: 4,
            write_count: 1,
            ..activity(10)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Development);
        assert_eq!(c.confidence, 1.0);

        let writer = SessionActivity {
            write_count: 4,
            ..activity(40)
        };
        let c = classify_session(&writer);
        assert_eq!(c.category, Category::Development);
        assert_eq!(c.factors.trigger, "write_count > 3");
        assert_eq!(c.confidence, 0.2);
    }

    #[test]
    fn test_two_failures_in_six_calls() {
        let session = SessionActivity {
            error_count: 2,
            edit_count: 1,
            read_count: 3,
            ..activity(6)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Debugging);
        assert_eq!(c.factors.values["error_rate"], json!(33.3));
    }

    #[test]
    fn test_edit_heavy_session_with_reads() {
        let session = SessionActivity {
            edit_count: 4,
            read_count: 2,
            ..activity(6)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Development);
        assert_eq!(c.factors.trigger, "edit_rate > 30%");
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_maintenance_and_research() {
        let ops = SessionActivity {
            git_count: 2,
            build_count: 2,
            ..activity(10)
        };
        let c = classify_session(&ops);
        assert_eq!(c.category, Category::Maintenance);
        assert_eq!(c.confidence, 0.8);

        let reader = SessionActivity {
            read_count: 4,
            search_count: 2,
            ..activity(10)
        };
        let c = classify_session(&reader);
        assert_eq!(c.category, Category::Research);
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn test_mixed_fallback() {
        let session = SessionActivity {
            edit_count: 2,
            read_count: 2,
            ..activity(10)
        };
        let c = classify_session(&session);
        assert_eq!(c.category, Category::Mixed);
        assert_eq!(c.confidence, 0.5);
        assert_eq!(c.factors.values["top_activities"]["read_rate"], json!(20.0));
    }

    #[test]
    fn test_small_sessions_excluded_from_distribution() {
        let sessions = vec![
            SessionActivity {
                read_count: 8,
                ..activity(10)
            },
            SessionActivity {
                session_id: "tiny".to_string(),
                error_count: 4,
                ..activity(4)
            },
        ];
        let result = classify(&sessions, DEFAULT_MIN_EVENTS);
        assert_eq!(result.sessions.len(), 1);
        assert_eq!(result.distribution.research, 1);
        assert_eq!(result.distribution.total(), 1);
    }

    #[test]
    fn test_factors_serialize_flat() {
        let c = classify_session(&SessionActivity {
            git_count: 5,
            ..activity(10)
        });
        insta::assert_json_snapshot!(c.factors, @r#"
        {
          "trigger": "git_build_rate > 30%",
          "build_rate": 0.0,
          "git_rate": 50.0
        }
        "#);
    }
}
