use rusqlite::types::Type;
use rusqlite::{Connection, Row, Statement, params};
use serde_json::{Map, Value};
use sessight_types::{Pattern, PatternType};

use crate::Result;
use crate::convert::{opt_ts_column, opt_ts_to_sql, ts_column, ts_to_sql};

const UPSERT_PATTERN: &str = r#"
    INSERT INTO patterns (pattern_type, pattern_key, count, last_seen, metadata_json, computed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(pattern_type, pattern_key) DO UPDATE SET
        count = ?3,
        last_seen = ?4,
        metadata_json = ?5,
        computed_at = ?6
"#;

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    let pattern_type = row
        .get::<_, String>(0)?
        .parse::<PatternType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    let metadata = match row.get::<_, Option<String>>(4)? {
        Some(raw) => serde_json::from_str::<Map<String, Value>>(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        None => Map::new(),
    };

    Ok(Pattern {
        pattern_type,
        pattern_key: row.get(1)?,
        count: row.get(2)?,
        last_seen: opt_ts_column(row, 3)?,
        metadata,
        computed_at: ts_column(row, 5)?,
    })
}

fn upsert_with(stmt: &mut Statement<'_>, pattern: &Pattern) -> Result<()> {
    let metadata = if pattern.metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&pattern.metadata)?)
    };

    stmt.execute(params![
        pattern.pattern_type.as_str(),
        &pattern.pattern_key,
        pattern.count,
        opt_ts_to_sql(pattern.last_seen.as_ref()),
        metadata,
        ts_to_sql(&pattern.computed_at),
    ])?;

    Ok(())
}

pub fn upsert(conn: &Connection, pattern: &Pattern) -> Result<()> {
    let mut stmt = conn.prepare_cached(UPSERT_PATTERN)?;
    upsert_with(&mut stmt, pattern)
}

/// Clear the given types and write `patterns` in one transaction.
pub fn replace(conn: &Connection, types: &[PatternType], patterns: &[Pattern]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for pattern_type in types {
        tx.execute(
            "DELETE FROM patterns WHERE pattern_type = ?1",
            [pattern_type.as_str()],
        )?;
    }
    {
        let mut stmt = tx.prepare_cached(UPSERT_PATTERN)?;
        for pattern in patterns {
            upsert_with(&mut stmt, pattern)?;
        }
    }
    tx.commit()?;

    Ok(patterns.len())
}

pub fn list(conn: &Connection, pattern_type: Option<PatternType>) -> Result<Vec<Pattern>> {
    let mut filters = super::Filters::default();
    if let Some(pattern_type) = pattern_type {
        filters.push("pattern_type = ?", pattern_type.as_str());
    }

    let sql = format!(
        r#"
        SELECT pattern_type, pattern_key, count, last_seen, metadata_json, computed_at
        FROM patterns
        {}
        ORDER BY pattern_type, count DESC, pattern_key
        "#,
        filters.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let patterns = stmt
        .query_map(filters.params().as_slice(), pattern_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(patterns)
}

pub fn clear(conn: &Connection, pattern_type: Option<PatternType>) -> Result<usize> {
    let deleted = match pattern_type {
        Some(t) => conn.execute("DELETE FROM patterns WHERE pattern_type = ?1", [t.as_str()])?,
        None => conn.execute("DELETE FROM patterns", [])?,
    };
    Ok(deleted)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patterns", [], |row| row.get(0))?)
}
