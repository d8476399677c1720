use chrono::{Duration, SubsecRound};
use serde::Serialize;
use sessight_index::Database;
use sessight_providers::{discover_log_files, read_log_file, system_time_to_utc};
use sessight_types::{IngestionState, utc_now};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::Result;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub logs_dir: PathBuf,
    /// Only files modified within this many days are considered
    pub days: u32,
    /// Substring of the project directory name
    pub project: Option<String>,
    /// Reparse files even when their fingerprint is unchanged
    pub force: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub entries_processed: usize,
    pub events_added: usize,
    /// Lines that were not valid JSON; also counted in `errors`
    pub malformed_lines: usize,
    pub sessions_updated: usize,
    /// Files that failed to read or store, plus malformed lines
    pub errors: usize,
}

/// Parse every new or changed log file into the store, then rebuild sessions.
///
/// A file is skipped when its size matches the stored fingerprint and its
/// mtime is not newer. Files that cannot be read or stored are counted in
/// `errors` and left for the next run; their fingerprint is not touched.
pub fn ingest_logs(db: &Database, options: &IngestOptions) -> Result<IngestReport> {
    let files = discover_log_files(&options.logs_dir, options.days, options.project.as_deref());
    let mut report = IngestReport {
        files_found: files.len(),
        ..IngestReport::default()
    };

    for file in &files {
        let metadata = match fs::metadata(&file.path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(file = %file.path.display(), error = %err, "failed to stat log file");
                report.errors += 1;
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => system_time_to_utc(modified).trunc_subsecs(6),
            Err(err) => {
                warn!(file = %file.path.display(), error = %err, "log file has no mtime");
                report.errors += 1;
                continue;
            }
        };
        let size = metadata.len() as i64;
        let key = file.path.to_string_lossy();

        if !options.force
            && let Some(state) = db.get_ingestion_state(&key)?
            && state.is_unchanged(size, modified)
        {
            debug!(file = %key, "unchanged since last ingestion");
            report.files_skipped += 1;
            continue;
        }

        let parsed = match read_log_file(&file.path) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(file = %key, error = %err, "failed to read log file");
                report.errors += 1;
                continue;
            }
        };

        let added = match db.add_events(&parsed.events) {
            Ok(added) => added,
            Err(err) => {
                warn!(file = %key, error = %err, "failed to store events");
                report.errors += 1;
                continue;
            }
        };
        let state = IngestionState {
            file_path: key.into_owned(),
            file_size: size,
            last_modified: modified,
            entries_processed: parsed.entries as i64,
            last_processed: utc_now(),
        };
        if let Err(err) = db.update_ingestion_state(&state) {
            warn!(file = %state.file_path, error = %err, "failed to record ingestion state");
            report.errors += 1;
        }

        report.files_processed += 1;
        report.entries_processed += parsed.entries;
        report.events_added += added;
        report.malformed_lines += parsed.malformed_lines;
        report.errors += parsed.malformed_lines;
    }

    report.sessions_updated = db.recompute_sessions()?;

    info!(
        found = report.files_found,
        processed = report.files_processed,
        skipped = report.files_skipped,
        events = report.events_added,
        errors = report.errors,
        "ingestion finished"
    );
    Ok(report)
}

/// Ingest only when the last ingestion is older than `max_age_minutes` or
/// there has been none. Returns the report of the run, if one happened.
pub fn ensure_fresh(
    db: &Database,
    options: &IngestOptions,
    max_age_minutes: i64,
) -> Result<Option<IngestReport>> {
    let stale = match db.last_ingestion_time()? {
        Some(last) => utc_now() - last > Duration::minutes(max_age_minutes),
        None => true,
    };
    if !stale {
        debug!(max_age_minutes, "data is fresh");
        return Ok(None);
    }
    ingest_logs(db, options).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessight_testing::{SessionLog, TestWorld};

    fn options(world: &TestWorld) -> IngestOptions {
        IngestOptions {
            logs_dir: world.logs_dir().to_path_buf(),
            days: 7,
            project: None,
            force: false,
        }
    }

    #[test]
    fn test_second_run_skips_unchanged_files() {
        let world = TestWorld::new();
        let log = SessionLog::new("s1").user(0, "hi").read(1, "/work/app/a.rs");
        world.write_log("-work-app", &log).unwrap();
        let db = Database::open_in_memory().unwrap();

        let first = ingest_logs(&db, &options(&world)).unwrap();
        assert_eq!(first.files_processed, 1);
        assert_eq!(first.entries_processed, 3);
        assert_eq!(first.events_added, 4);
        assert_eq!(first.sessions_updated, 1);

        let second = ingest_logs(&db, &options(&world)).unwrap();
        assert_eq!(second.files_skipped, 1);
        assert_eq!(second.files_processed, 0);
        assert_eq!(second.events_added, 0);
    }

    #[test]
    fn test_force_reparses_without_duplicates() {
        let world = TestWorld::new();
        world
            .write_log("-work-app", &SessionLog::new("s1").user(0, "hi"))
            .unwrap();
        let db = Database::open_in_memory().unwrap();
        ingest_logs(&db, &options(&world)).unwrap();

        let forced = ingest_logs(
            &db,
            &IngestOptions {
                force: true,
                ..options(&world)
            },
        )
        .unwrap();
        assert_eq!(forced.files_processed, 1);
        assert_eq!(forced.events_added, 0);
        assert_eq!(db.event_count().unwrap(), 1);
    }

    #[test]
    fn test_store_failure_skips_only_that_file() {
        let world = TestWorld::new();
        world
            .write_log("-work-app", &SessionLog::new("good").user(0, "hi"))
            .unwrap();
        let rejected = world
            .write_log("-work-app", &SessionLog::new("rejected").user(0, "hi"))
            .unwrap();

        let db_path = world.data_dir().join("store.db");
        let db = Database::open(&db_path).unwrap();
        rusqlite::Connection::open(&db_path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_session BEFORE INSERT ON events
                 WHEN NEW.session_id = 'rejected'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let report = ingest_logs(&db, &options(&world)).unwrap();
        assert_eq!(report.files_found, 2);
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.sessions_updated, 1);
        assert_eq!(db.event_count().unwrap(), 1);

        let key = rejected.to_string_lossy();
        assert!(db.get_ingestion_state(&key).unwrap().is_none());
    }

    #[test]
    fn test_ensure_fresh_runs_once() {
        let world = TestWorld::new();
        world
            .write_log("-work-app", &SessionLog::new("s1").user(0, "hi"))
            .unwrap();
        let db = Database::open_in_memory().unwrap();

        assert!(ensure_fresh(&db, &options(&world), 5).unwrap().is_some());
        assert!(ensure_fresh(&db, &options(&world), 5).unwrap().is_none());

        std::thread::sleep(std::time::Duration::from_millis(5));
        let stale = ensure_fresh(&db, &options(&world), 0).unwrap().unwrap();
        assert_eq!(stale.files_skipped, 1);
    }
}
