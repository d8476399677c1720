pub(crate) mod activity;
pub(crate) mod analytics;
pub(crate) mod event;
pub(crate) mod git;
pub(crate) mod ingestion;
pub(crate) mod pattern;
pub(crate) mod search;
pub(crate) mod session;
pub(crate) mod stats;

use rusqlite::ToSql;
use sessight_types::TimeWindow;

use crate::convert::{contains_pattern, ts_to_sql};

/// Accumulates `WHERE` clauses with their positional parameters.
#[derive(Default)]
pub(crate) struct Filters {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Filters {
    pub fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.clauses.push(clause.to_string());
        self.params.push(Box::new(value));
    }

    pub fn push_raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Restrict `column` to the half-open window.
    pub fn window(&mut self, column: &str, window: Option<&TimeWindow>) {
        if let Some(window) = window {
            self.push(&format!("{} >= ?", column), ts_to_sql(&window.start));
            self.push(&format!("{} < ?", column), ts_to_sql(&window.end));
        }
    }

    pub fn project(&mut self, column: &str, project: Option<&str>) {
        if let Some(project) = project {
            self.push(&format!("{} LIKE ?", column), contains_pattern(project));
        }
    }

    /// Append one positional parameter that is not tied to a clause.
    pub fn bind(&mut self, value: impl ToSql + 'static) {
        self.params.push(Box::new(value));
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}
