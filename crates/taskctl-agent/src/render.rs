//! Renders an `ExecutionResult` (or a `ParseError`) back into the
//! environment-output tag that gets mirrored into the next prompt.

use taskctl_core::types::{Action, ExecutionResult};

use crate::parser::ParseError;

pub fn action_output_tag(action: &Action) -> &'static str {
    match action {
        Action::File(_) => "file_output",
        Action::Search(_) => "search_output",
        Action::Bash { .. } => "bash_output",
        Action::Todo(_) => "todo_output",
        Action::Scratchpad { .. } => "scratchpad_output",
        Action::TaskCreate { .. } => "task_create_output",
        Action::LaunchSubagent { .. } => "launch_subagent_output",
        Action::AddContext { .. } => "add_context_output",
        Action::Finish { .. } => "finish_output",
        Action::Report { .. } => "report_output",
        Action::WriteTempScript { .. } => "write_temp_script_output",
        Action::Reasoning { .. } => "reasoning_output",
    }
}

pub fn render_result(tag: &str, result: &ExecutionResult) -> String {
    if result.ok {
        format!("<{tag}>\n{}\n</{tag}>", result.payload)
    } else {
        format!(
            "<{tag} error=\"{}\">\n{}\n</{tag}>",
            result.error_kind.map(|k| k.to_string()).unwrap_or_default(),
            result.error_message.clone().unwrap_or_default(),
        )
    }
}

pub fn render_action_result(action: &Action, result: &ExecutionResult) -> String {
    render_result(action_output_tag(action), result)
}

pub fn render_parse_error(error: &ParseError) -> String {
    format!(
        "<parse_error tag=\"{}\">\n{}\n</parse_error>",
        error.tag.clone().unwrap_or_default(),
        error.message,
    )
}

pub fn render_turn_block(turn_index: usize, raw_response: &str, env_blocks: &[String]) -> String {
    format!(
        "<assistant_turn index=\"{turn_index}\">\n{raw_response}\n</assistant_turn>\n{}",
        env_blocks.join("\n")
    )
}
