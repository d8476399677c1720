//! Field extraction from tool invocation inputs.

use serde_json::Value;

/// Tools whose input names a file or directory
const FILE_TOOLS: &[&str] = &["Read", "Edit", "MultiEdit", "Write", "Glob", "Grep"];

/// Denormalized fields pulled out of one tool input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToolFields {
    pub command: Option<String>,
    pub command_args: Option<String>,
    pub file_path: Option<String>,
    pub skill_name: Option<String>,
}

pub fn extract_tool_fields(tool_name: &str, input: &Value) -> ToolFields {
    match tool_name {
        "Bash" => {
            let (command, command_args) = input
                .get("command")
                .and_then(Value::as_str)
                .map(split_shell_command)
                .unwrap_or_default();
            ToolFields {
                command,
                command_args,
                ..ToolFields::default()
            }
        }
        "Skill" => ToolFields {
            skill_name: string_field(input, "skill"),
            ..ToolFields::default()
        },
        "Task" => ToolFields {
            skill_name: string_field(input, "subagent_type"),
            ..ToolFields::default()
        },
        name if FILE_TOOLS.contains(&name) => ToolFields {
            file_path: string_field(input, "file_path").or_else(|| string_field(input, "path")),
            ..ToolFields::default()
        },
        // mcp__* and everything else keep only the name and raw input
        _ => ToolFields::default(),
    }
}

/// Split a shell line into its program and the remainder.
pub fn split_shell_command(line: &str) -> (Option<String>, Option<String>) {
    let line = line.trim();
    if line.is_empty() {
        return (None, None);
    }
    match line.split_once(char::is_whitespace) {
        Some((program, rest)) => {
            let rest = rest.trim();
            let args = (!rest.is_empty()).then(|| rest.to_string());
            (Some(program.to_string()), args)
        }
        None => (Some(line.to_string()), None),
    }
}

fn string_field(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bash_splits_program_from_args() {
        let fields = extract_tool_fields("Bash", &json!({"command": "git  commit -m 'x y'"}));
        assert_eq!(fields.command.as_deref(), Some("git"));
        assert_eq!(fields.command_args.as_deref(), Some("commit -m 'x y'"));

        let bare = extract_tool_fields("Bash", &json!({"command": "ls"}));
        assert_eq!(bare.command.as_deref(), Some("ls"));
        assert_eq!(bare.command_args, None);

        let empty = extract_tool_fields("Bash", &json!({"command": "   "}));
        assert_eq!(empty, ToolFields::default());
    }

    #[test]
    fn test_file_tools_fall_back_to_path() {
        let read = extract_tool_fields("Read", &json!({"file_path": "/src/main.rs"}));
        assert_eq!(read.file_path.as_deref(), Some("/src/main.rs"));

        let grep = extract_tool_fields("Grep", &json!({"pattern": "fn", "path": "/src"}));
        assert_eq!(grep.file_path.as_deref(), Some("/src"));

        let multi = extract_tool_fields("MultiEdit", &json!({"file_path": "/a.rs", "edits": []}));
        assert_eq!(multi.file_path.as_deref(), Some("/a.rs"));
    }

    #[test]
    fn test_skill_and_task_names() {
        let skill = extract_tool_fields("Skill", &json!({"skill": "pdf"}));
        assert_eq!(skill.skill_name.as_deref(), Some("pdf"));

        let task = extract_tool_fields("Task", &json!({"subagent_type": "Explore", "prompt": "…"}));
        assert_eq!(task.skill_name.as_deref(), Some("Explore"));
    }

    #[test]
    fn test_mcp_tools_extract_nothing() {
        let fields = extract_tool_fields(
            "mcp__event-bus__register_session",
            &json!({"file_path": "/ignored"}),
        );
        assert_eq!(fields, ToolFields::default());
    }
}
