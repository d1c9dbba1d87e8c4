//! Two-phase action parser: first pull top-level `<tag>...</tag>` elements
//! out of the raw completion text, then parse each element's body as an
//! indentation-based key/value payload and build a typed `Action` from it.
//!
//! The two phases stay decoupled on purpose — tag extraction never looks at
//! payload contents, and payload parsing never looks at the tag name until
//! the very last step (`build_action`). That mirrors one parser per tag
//! rather than a single schema-driven deserializer.

use taskctl_core::types::{
    Action, ContextBootstrap, ContextDraft, EditOp, FileOp, SearchOp, TodoOp,
};

const KNOWN_TAGS: &[&str] = &[
    "task_create",
    "launch_subagent",
    "add_context",
    "finish",
    "reasoning",
    "file",
    "search",
    "bash",
    "todo",
    "scratchpad",
    "report",
    "write_temp_script",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub tag: Option<String>,
    pub message: String,
}

impl ParseError {
    fn new(tag: Option<&str>, message: impl Into<String>) -> Self {
        Self { tag: tag.map(str::to_string), message: message.into() }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "<{tag}>: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// ===========================================================================
// Phase 1: element extraction
// ===========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RawElement {
    pub tag: String,
    pub body: String,
}

/// Scans for top-level `<tag>body</tag>` elements. Not a general XML parser:
/// it recognizes exactly one level of opening/closing tags and treats
/// anything that looks like a tag but never closes as a hard parse error.
pub fn extract_elements(raw: &str) -> Vec<Result<RawElement, ParseError>> {
    let mut out = Vec::new();
    let bytes = raw.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        // A closing tag with nothing open is not a start; skip past it.
        if raw[i..].starts_with("</") {
            i += 2;
            continue;
        }
        let Some(close_angle) = raw[i..].find('>') else {
            break;
        };
        let tag_candidate = &raw[i + 1..i + close_angle];
        if tag_candidate.is_empty() || !is_tag_name(tag_candidate) {
            i += 1;
            continue;
        }
        let tag = tag_candidate.to_string();
        let body_start = i + close_angle + 1;
        let closing = format!("</{tag}>");
        match raw[body_start..].find(closing.as_str()) {
            Some(rel) => {
                let body = raw[body_start..body_start + rel].to_string();
                out.push(Ok(RawElement { tag, body }));
                i = body_start + rel + closing.len();
            }
            None => {
                out.push(Err(ParseError::new(Some(&tag), "element is never closed")));
                break;
            }
        }
    }
    out
}

fn is_tag_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ===========================================================================
// Phase 2: body -> Value tree -> typed Action
// ===========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Scalar(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Parses every known element and reports every failure. Unknown tags and
/// malformed bodies both come back as `Err(ParseError)` rather than aborting
/// the whole response — a single bad action should not silence the rest.
pub fn parse_actions(raw: &str) -> Vec<Result<Action, ParseError>> {
    extract_elements(raw)
        .into_iter()
        .map(|element| match element {
            Err(e) => Err(e),
            Ok(el) => parse_one(&el),
        })
        .collect()
}

fn parse_one(el: &RawElement) -> Result<Action, ParseError> {
    if !KNOWN_TAGS.contains(&el.tag.as_str()) {
        return Err(ParseError::new(Some(&el.tag), format!("unknown action tag <{}>", el.tag)));
    }
    let fields = parse_body(&el.body)
        .map(Fields)
        .map_err(|msg| ParseError::new(Some(&el.tag), msg))?;
    build_action(&el.tag, &fields).map_err(|msg| ParseError::new(Some(&el.tag), msg))
}

fn parse_body(body: &str) -> Result<Vec<(String, Value)>, String> {
    let lines: Vec<&str> = body.lines().collect();
    let base_indent = match next_structural(&lines, 0) {
        Some(i) => indent_of(lines[i])?,
        None => return Ok(Vec::new()),
    };
    let mut pos = 0usize;
    parse_mapping(&lines, &mut pos, base_indent)
}

fn indent_of(line: &str) -> Result<usize, String> {
    let stripped = line.trim_start_matches(' ');
    let count = line.len() - stripped.len();
    if stripped.starts_with('\t') || line[..count].contains('\t') {
        return Err("tabs are not allowed for indentation".to_string());
    }
    Ok(count)
}

fn next_structural(lines: &[&str], mut pos: usize) -> Option<usize> {
    while pos < lines.len() {
        if !lines[pos].trim().is_empty() {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

fn parse_mapping(
    lines: &[&str],
    pos: &mut usize,
    indent: usize,
) -> Result<Vec<(String, Value)>, String> {
    let mut out = Vec::new();
    loop {
        let Some(i) = next_structural(lines, *pos) else {
            break;
        };
        let line = lines[i];
        let line_indent = indent_of(line)?;
        if line_indent != indent {
            break;
        }
        let trimmed = line.trim_start();
        let Some(colon) = trimmed.find(':') else {
            return Err(format!("expected 'key: value' in line {:?}", line));
        };
        let key = trimmed[..colon].trim().to_string();
        let rest = trimmed[colon + 1..].trim().to_string();
        *pos = i + 1;

        if rest == "|" {
            out.push((key, parse_block_scalar(lines, pos, indent + 2)));
            continue;
        }

        if rest.is_empty() {
            match next_structural(lines, *pos) {
                Some(j) if indent_of(lines[j])? > indent => {
                    let child_indent = indent_of(lines[j])?;
                    if lines[j].trim_start().starts_with("- ") || lines[j].trim() == "-" {
                        let value = parse_list(lines, pos, child_indent)?;
                        out.push((key, value));
                    } else {
                        let value = parse_mapping(lines, pos, child_indent)?;
                        out.push((key, Value::Map(value)));
                    }
                }
                _ => out.push((key, Value::Scalar(String::new()))),
            }
            continue;
        }

        out.push((key, Value::Scalar(parse_scalar(&rest)?)));
    }
    Ok(out)
}

fn parse_block_scalar(lines: &[&str], pos: &mut usize, indent: usize) -> Value {
    let mut collected = Vec::new();
    while *pos < lines.len() {
        let line = lines[*pos];
        if line.trim().is_empty() {
            collected.push(String::new());
            *pos += 1;
            continue;
        }
        let line_indent = line.len() - line.trim_start_matches(' ').len();
        if line_indent < indent {
            break;
        }
        collected.push(line[indent.min(line.len())..].to_string());
        *pos += 1;
    }
    while collected.last().is_some_and(|l| l.is_empty()) {
        collected.pop();
    }
    Value::Scalar(collected.join("\n"))
}

fn parse_list(lines: &[&str], pos: &mut usize, indent: usize) -> Result<Value, String> {
    let mut items = Vec::new();
    loop {
        let Some(i) = next_structural(lines, *pos) else {
            break;
        };
        let line = lines[i];
        let line_indent = indent_of(line)?;
        if line_indent != indent {
            break;
        }
        let trimmed = line.trim_start();
        if !trimmed.starts_with('-') {
            break;
        }
        let after_dash = trimmed[1..].trim_start();
        *pos = i + 1;

        if let Some(colon) = after_dash.find(':') {
            if !after_dash.is_empty() {
                let first_key = after_dash[..colon].trim().to_string();
                let first_rest = after_dash[colon + 1..].trim().to_string();
                let mut fields = vec![(first_key, Value::Scalar(parse_scalar(&first_rest)?))];
                if let Some(j) = next_structural(lines, *pos) {
                    if indent_of(lines[j])? == indent + 2 {
                        fields.extend(parse_mapping(lines, pos, indent + 2)?);
                    }
                }
                items.push(Value::Map(fields));
                continue;
            }
        }
        items.push(Value::Scalar(parse_scalar(after_dash)?));
    }
    Ok(Value::List(items))
}

fn parse_scalar(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return Ok(trimmed[1..trimmed.len() - 1].to_string());
    }
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return unescape_double_quoted(&trimmed[1..trimmed.len() - 1]);
    }
    Ok(trimmed.to_string())
}

fn unescape_double_quoted(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('r') => out.push('\r'),
            Some('$') => out.push('$'),
            Some(other) => return Err(format!("unsupported escape sequence '\\{other}'")),
            None => return Err("dangling escape at end of string".to_string()),
        }
    }
    Ok(out)
}

// ===========================================================================
// Field accessors
// ===========================================================================

struct Fields(Vec<(String, Value)>);

impl Fields {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn require(&self, key: &str) -> Result<&Value, String> {
        self.get(key).ok_or_else(|| format!("missing required field '{key}'"))
    }

    fn require_str(&self, key: &str) -> Result<String, String> {
        self.require(key)?
            .as_scalar()
            .map(str::to_string)
            .ok_or_else(|| format!("field '{key}' must be a scalar string"))
    }

    fn opt_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_scalar).map(str::to_string)
    }

    fn opt_usize(&self, key: &str) -> Result<Option<usize>, String> {
        match self.opt_str(key) {
            None => Ok(None),
            Some(s) => s.parse().map(Some).map_err(|_| format!("field '{key}' must be an integer")),
        }
    }

    fn opt_u64(&self, key: &str) -> Result<Option<u64>, String> {
        match self.opt_str(key) {
            None => Ok(None),
            Some(s) => s.parse().map(Some).map_err(|_| format!("field '{key}' must be an integer")),
        }
    }

    fn bool(&self, key: &str, default: bool) -> Result<bool, String> {
        match self.opt_str(key) {
            None => Ok(default),
            Some(s) if s == "true" => Ok(true),
            Some(s) if s == "false" => Ok(false),
            Some(other) => Err(format!("field '{key}' must be 'true' or 'false', got '{other}'")),
        }
    }

    fn str_list(&self, key: &str) -> Result<Vec<String>, String> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(v) => v
                .as_list()
                .ok_or_else(|| format!("field '{key}' must be a list"))?
                .iter()
                .map(|item| {
                    item.as_scalar()
                        .map(str::to_string)
                        .ok_or_else(|| format!("field '{key}' items must be scalars"))
                })
                .collect(),
        }
    }
}

// ===========================================================================
// Typed construction
// ===========================================================================

fn build_action(tag: &str, fields: &Fields) -> Result<Action, String> {
    match tag {
        "task_create" => {
            let agent_type = match fields.require_str("agent_type")?.as_str() {
                "explorer" => taskctl_core::types::AgentType::Explorer,
                "coder" => taskctl_core::types::AgentType::Coder,
                other => return Err(format!("agent_type must be 'explorer' or 'coder', got '{other}'")),
            };
            Ok(Action::TaskCreate {
                agent_type,
                title: fields.require_str("title")?,
                description: fields.require_str("description")?,
                context_refs: fields.str_list("context_refs")?,
                context_bootstrap: parse_bootstrap_list(fields.get("context_bootstrap"))?,
            })
        }
        "launch_subagent" => Ok(Action::LaunchSubagent { task_id: fields.require_str("task_id")? }),
        "add_context" => Ok(Action::AddContext {
            id: fields.require_str("id")?,
            content: fields.require_str("content")?,
        }),
        "finish" => Ok(Action::Finish { message: fields.require_str("message")? }),
        "reasoning" => Ok(Action::Reasoning { text: fields.opt_str("text").unwrap_or_default() }),
        "file" => Ok(Action::File(parse_file_op(fields)?)),
        "search" => Ok(Action::Search(parse_search_op(fields)?)),
        "bash" => Ok(Action::Bash {
            cmd: fields.require_str("cmd")?,
            block: fields.bool("block", false)?,
            timeout_secs: fields.opt_u64("timeout_secs")?,
            cwd: fields.opt_str("cwd"),
        }),
        "todo" => Ok(Action::Todo(parse_todo_op(fields)?)),
        "scratchpad" => Ok(Action::Scratchpad { note: fields.require_str("note")? }),
        "report" => {
            let final_status = match fields.require_str("final_status")?.as_str() {
                "completed" => taskctl_core::types::FinalStatus::Completed,
                "failed" => taskctl_core::types::FinalStatus::Failed,
                other => return Err(format!("final_status must be 'completed' or 'failed', got '{other}'")),
            };
            Ok(Action::Report {
                contexts: parse_context_draft_list(fields.get("contexts"))?,
                comments: fields.opt_str("comments").unwrap_or_default(),
                final_status,
            })
        }
        "write_temp_script" => Ok(Action::WriteTempScript {
            path: fields.require_str("path")?,
            content: fields.require_str("content")?,
        }),
        other => Err(format!("unhandled action tag '{other}'")),
    }
}

fn parse_file_op(fields: &Fields) -> Result<FileOp, String> {
    match fields.require_str("action")?.as_str() {
        "read" => Ok(FileOp::Read {
            path: fields.require_str("path")?,
            offset: fields.opt_usize("offset")?,
            limit: fields.opt_usize("limit")?,
        }),
        "write" => Ok(FileOp::Write {
            path: fields.require_str("path")?,
            content: fields.require_str("content")?,
        }),
        "edit" => Ok(FileOp::Edit {
            path: fields.require_str("path")?,
            old_string: fields.require_str("old_string")?,
            new_string: fields.require_str("new_string")?,
            replace_all: fields.bool("replace_all", false)?,
        }),
        "multi_edit" => Ok(FileOp::MultiEdit {
            path: fields.require_str("path")?,
            edits: parse_edit_list(fields.get("edits"))?,
        }),
        "metadata" => Ok(FileOp::Metadata { paths: fields.str_list("paths")? }),
        other => Err(format!("unknown file action '{other}'")),
    }
}

fn parse_search_op(fields: &Fields) -> Result<SearchOp, String> {
    match fields.require_str("action")?.as_str() {
        "grep" => Ok(SearchOp::Grep {
            pattern: fields.require_str("pattern")?,
            path: fields.opt_str("path"),
            include: fields.opt_str("include"),
        }),
        "glob" => Ok(SearchOp::Glob {
            pattern: fields.require_str("pattern")?,
            path: fields.opt_str("path"),
        }),
        other => Err(format!("unknown search action '{other}'")),
    }
}

fn parse_todo_op(fields: &Fields) -> Result<TodoOp, String> {
    match fields.require_str("action")?.as_str() {
        "add" => Ok(TodoOp::Add { id: fields.require_str("id")?, text: fields.require_str("text")? }),
        "complete" => Ok(TodoOp::Complete { id: fields.require_str("id")? }),
        "delete" => Ok(TodoOp::Delete { id: fields.require_str("id")? }),
        "view_all" => Ok(TodoOp::ViewAll),
        other => Err(format!("unknown todo action '{other}'")),
    }
}

fn parse_edit_list(value: Option<&Value>) -> Result<Vec<EditOp>, String> {
    let Some(value) = value else { return Ok(Vec::new()) };
    let items = value.as_list().ok_or("'edits' must be a list")?;
    items
        .iter()
        .map(|item| {
            let map = item.as_map().ok_or("each edit must be a mapping")?;
            let old_string = map_get(map, "old_string")?;
            let new_string = map_get(map, "new_string")?;
            Ok(EditOp { old_string, new_string })
        })
        .collect()
}

fn parse_bootstrap_list(value: Option<&Value>) -> Result<Vec<ContextBootstrap>, String> {
    let Some(value) = value else { return Ok(Vec::new()) };
    let items = value.as_list().ok_or("'context_bootstrap' must be a list")?;
    items
        .iter()
        .map(|item| {
            let map = item.as_map().ok_or("each context_bootstrap entry must be a mapping")?;
            Ok(ContextBootstrap { path: map_get(map, "path")?, reason: map_get(map, "reason")? })
        })
        .collect()
}

fn parse_context_draft_list(value: Option<&Value>) -> Result<Vec<ContextDraft>, String> {
    let Some(value) = value else { return Ok(Vec::new()) };
    let items = value.as_list().ok_or("'contexts' must be a list")?;
    items
        .iter()
        .map(|item| {
            let map = item.as_map().ok_or("each context entry must be a mapping")?;
            Ok(ContextDraft { id: map_get(map, "id")?, content: map_get(map, "content")? })
        })
        .collect()
}

fn map_get(map: &[(String, Value)], key: &str) -> Result<String, String> {
    map.iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_scalar())
        .map(str::to_string)
        .ok_or_else(|| format!("missing required field '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskctl_core::types::{AgentType, FinalStatus};

    #[test]
    fn finish_message_round_trips() {
        let actions = parse_actions("<finish>\n  message: all done\n</finish>");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0], Ok(Action::Finish { message: "all done".into() }));
    }

    #[test]
    fn double_quoted_string_processes_escapes() {
        let actions = parse_actions("<scratchpad>\n  note: \"line one\\nline two\"\n</scratchpad>");
        assert_eq!(
            actions[0],
            Ok(Action::Scratchpad { note: "line one\nline two".into() })
        );
    }

    #[test]
    fn double_quoted_string_unescapes_dollar_sign() {
        let actions = parse_actions("<bash>\n  cmd: \"echo \\$HOME\"\n</bash>");
        assert_eq!(actions[0], Ok(Action::Bash { cmd: "echo $HOME".into(), block: false, timeout_secs: None, cwd: None }));
    }

    #[test]
    fn single_quoted_string_is_literal() {
        let actions = parse_actions("<scratchpad>\n  note: 'no \\n escapes here'\n</scratchpad>");
        assert_eq!(
            actions[0],
            Ok(Action::Scratchpad { note: "no \\n escapes here".into() })
        );
    }

    #[test]
    fn block_scalar_preserves_newlines() {
        let raw = "<file>\n  action: write\n  path: /tmp/x.txt\n  content: |\n    line one\n    line two\n</file>";
        let actions = parse_actions(raw);
        assert_eq!(
            actions[0],
            Ok(Action::File(FileOp::Write {
                path: "/tmp/x.txt".into(),
                content: "line one\nline two".into(),
            }))
        );
    }

    #[test]
    fn list_of_scalars_parses_context_refs() {
        let raw = "<task_create>\n  agent_type: explorer\n  title: t\n  description: d\n  context_refs:\n    - alpha\n    - beta\n</task_create>";
        let actions = parse_actions(raw);
        assert_eq!(
            actions[0],
            Ok(Action::TaskCreate {
                agent_type: AgentType::Explorer,
                title: "t".into(),
                description: "d".into(),
                context_refs: vec!["alpha".into(), "beta".into()],
                context_bootstrap: vec![],
            })
        );
    }

    #[test]
    fn list_of_mappings_parses_multi_edit() {
        let raw = "<file>\n  action: multi_edit\n  path: /a.txt\n  edits:\n    - old_string: foo\n      new_string: bar\n    - old_string: baz\n      new_string: qux\n</file>";
        let actions = parse_actions(raw);
        assert_eq!(
            actions[0],
            Ok(Action::File(FileOp::MultiEdit {
                path: "/a.txt".into(),
                edits: vec![
                    EditOp { old_string: "foo".into(), new_string: "bar".into() },
                    EditOp { old_string: "baz".into(), new_string: "qux".into() },
                ],
            }))
        );
    }

    #[test]
    fn report_with_contexts_list() {
        let raw = "<report>\n  final_status: completed\n  comments: done\n  contexts:\n    - id: result\n      content: ok\n</report>";
        let actions = parse_actions(raw);
        assert_eq!(
            actions[0],
            Ok(Action::Report {
                contexts: vec![ContextDraft { id: "result".into(), content: "ok".into() }],
                comments: "done".into(),
                final_status: FinalStatus::Completed,
            })
        );
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let actions = parse_actions("<launch_missile>\n  target: moon\n</launch_missile>");
        assert!(actions[0].is_err());
    }

    #[test]
    fn unclosed_tag_is_a_parse_error() {
        let actions = parse_actions("<finish>\n  message: oops");
        assert_eq!(actions.len(), 1);
        assert!(actions[0].is_err());
    }

    #[test]
    fn two_actions_in_one_response_both_parse() {
        let raw = "<scratchpad>\n  note: first\n</scratchpad>\n<scratchpad>\n  note: second\n</scratchpad>";
        let actions = parse_actions(raw);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Ok(Action::Scratchpad { note: "first".into() }));
        assert_eq!(actions[1], Ok(Action::Scratchpad { note: "second".into() }));
    }

    #[test]
    fn bash_block_defaults_to_false() {
        let actions = parse_actions("<bash>\n  cmd: echo hi\n</bash>");
        assert_eq!(
            actions[0],
            Ok(Action::Bash { cmd: "echo hi".into(), block: false, timeout_secs: None, cwd: None })
        );
    }
}
