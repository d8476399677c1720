//! Claude Code session logs: one JSONL file per conversation, one directory
//! per project.

mod command;
mod io;
mod parser;
mod schema;
mod tools;

pub use command::command_name;
pub use io::{ParsedFile, parse_line, project_name, read_log_file};
pub use parser::{MAX_MESSAGE_CHARS, parse_record};
pub use tools::{ToolFields, extract_tool_fields, split_shell_command};
