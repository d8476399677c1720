use serde_json::Value;
use sessight_types::Event;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use super::parser::parse_record;
use crate::{Error, Result};

/// Outcome of one full pass over a session log.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub events: Vec<Event>,
    /// Lines that decoded as JSON, whether or not they produced events
    pub entries: usize,
    /// Lines that are not valid JSON
    pub malformed_lines: usize,
}

/// Project name of a session log: the name of its parent directory.
pub fn project_name(path: &Path) -> Result<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Parse(format!("no project directory for {}", path.display())))
}

/// Parse one JSONL line. `None` when the line is not valid JSON.
pub fn parse_line(line: &str, project_path: &str) -> Option<Vec<Event>> {
    serde_json::from_str::<Value>(line)
        .ok()
        .map(|raw| parse_record(&raw, project_path))
}

/// Read a session log line by line.
///
/// Lines that are not valid UTF-8 or not valid JSON are counted and skipped.
/// A read failure part way through aborts the whole file.
pub fn read_log_file(path: &Path) -> Result<ParsedFile> {
    let project = project_name(path)?;
    let mut reader = BufReader::new(File::open(path)?);
    let mut parsed = ParsedFile::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!(file = %path.display(), line = line_no, "skipping line with invalid UTF-8");
            parsed.malformed_lines += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line, &project) {
            Some(events) => {
                parsed.entries += 1;
                parsed.events.extend(events);
            }
            None => {
                debug!(file = %path.display(), line = line_no, "skipping malformed line");
                parsed.malformed_lines += 1;
            }
        }
    }

    Ok(parsed)
}
