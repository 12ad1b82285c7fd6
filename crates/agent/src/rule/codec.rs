use std::fmt::Write as _;
use std::path::Path;

use flexalert_common::Action;
use serde_json::Value;

use super::error::RuleError;
use super::json_walk;
use super::model::Rule;

const ENVELOPE_PREFIX: &str = "flexible/";

/// Parses a rule document, optionally wrapped in `{"flexible": ...}`.
///
/// Results accept both the legacy `results/<key>/action/<N>` form, where the
/// value names the action, and the structured
/// `results/<key>/action/<N>/{action,asset,mode}` form. Unknown paths are
/// ignored.
pub fn parse(text: &str) -> Result<Rule, RuleError> {
    let doc: Value = serde_json::from_str(text)?;
    let mut rule = Rule::default();
    let mut pending = PendingAction::default();

    json_walk::walk(&doc, |path, value| {
        let path = path.strip_prefix(ENVELOPE_PREFIX).unwrap_or(path);
        apply(&mut rule, &mut pending, path, value);
    });

    if rule.name.is_empty() {
        return Err(RuleError::MissingName);
    }
    Ok(rule)
}

pub fn load_from_path(path: &Path) -> Result<Rule, RuleError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

pub fn save_to_path(rule: &Rule, path: &Path) -> Result<(), RuleError> {
    std::fs::write(path, to_json(rule))?;
    Ok(())
}

fn apply(rule: &mut Rule, pending: &mut PendingAction, path: &str, value: Option<&str>) {
    match path {
        "name" => rule.name = value.unwrap_or_default().to_string(),
        "description" => rule.description = value.unwrap_or_default().to_string(),
        "logical_asset" => rule.logical_asset = value.unwrap_or_default().to_string(),
        "evaluation" => rule.evaluation = value.unwrap_or_default().to_string(),
        _ => {
            if let Some(rest) = path.strip_prefix("results/") {
                apply_result(rule, pending, rest, value);
            } else if let Some(var) = path.strip_prefix("variables/") {
                if let Some(v) = value.filter(|v| !v.is_empty()) {
                    rule.variables.insert(var.to_string(), v.to_string());
                }
            } else if let Some((list, keep_empty)) = selector_list(rule, path) {
                if let Some(v) = value.filter(|v| keep_empty || !v.is_empty()) {
                    list.push(v.to_string());
                }
            }
        }
    }
}

/// Target list for a selector path and whether empty strings are kept.
fn selector_list<'a>(rule: &'a mut Rule, path: &str) -> Option<(&'a mut Vec<String>, bool)> {
    let (head, _) = path.split_once('/')?;
    match head {
        "metrics" => Some((&mut rule.metrics, true)),
        "assets" => Some((&mut rule.assets, true)),
        "groups" => Some((&mut rule.groups, true)),
        "models" => Some((&mut rule.models, false)),
        "types" => Some((&mut rule.types, false)),
        _ => None,
    }
}

/// Fields of the action currently being assembled, keyed by result and
/// position so that a half-specified action never leaks into the next one.
#[derive(Default)]
struct PendingAction {
    group: Option<(String, String)>,
    action: Option<String>,
    asset: Option<String>,
    mode: Option<String>,
}

impl PendingAction {
    fn enter(&mut self, key: &str, index: &str) {
        let same = matches!(&self.group, Some((k, i)) if k == key && i == index);
        if !same {
            *self = Self {
                group: Some((key.to_string(), index.to_string())),
                ..Default::default()
            };
        }
    }

    fn take_complete(&mut self) -> Option<Action> {
        let action = Action::from_parts(
            self.action.as_deref()?,
            self.asset.as_deref(),
            self.mode.as_deref(),
        )
        .filter(is_complete)?;
        self.action = None;
        self.asset = None;
        self.mode = None;
        Some(action)
    }
}

/// Device actions only count once both target and mode are known.
fn is_complete(action: &Action) -> bool {
    action.is_notification() || action.mode().is_some()
}

fn apply_result(rule: &mut Rule, pending: &mut PendingAction, rest: &str, value: Option<&str>) {
    let mut parts = rest.splitn(4, '/');
    let (Some(key), Some("action"), Some(index)) = (parts.next(), parts.next(), parts.next())
    else {
        return;
    };
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return;
    }
    pending.enter(key, index);

    let Some(value) = value else { return };
    match parts.next() {
        None => {
            if let Some(action) = Action::from_colon_form(value).filter(is_complete) {
                rule.add_result_action(key, action);
            }
            return;
        }
        Some("action") => pending.action = Some(value.to_string()),
        Some("asset") => pending.asset = Some(value.to_string()),
        Some("mode") => pending.mode = Some(value.to_string()),
        Some(_) => return,
    }

    if let Some(action) = pending.take_complete() {
        rule.add_result_action(key, action);
    }
}

/// Serializes a rule in the stable on-disk layout. Parsing the output and
/// serializing again yields identical bytes.
pub fn to_json(rule: &Rule) -> String {
    let mut out = String::with_capacity(512);
    out.push_str("{\n");
    push_field(&mut out, "name", &encode_string(&rule.name));
    push_field(&mut out, "description", &encode_string(&rule.description));
    push_field(&mut out, "logical_asset", &encode_string(&rule.logical_asset));
    push_field(&mut out, "metrics", &string_array(&rule.metrics));
    push_field(&mut out, "assets", &string_array(&rule.assets));
    push_field(&mut out, "models", &string_array(&rule.models));
    push_field(&mut out, "groups", &string_array(&rule.groups));

    let results: Vec<String> = rule
        .results
        .iter()
        .map(|(key, actions)| {
            format!(
                "{}: {{\"action\": {}}}",
                encode_string(key),
                action_array(actions)
            )
        })
        .collect();
    out.push_str("\"results\": {\n");
    out.push_str(&results.join(",\n"));
    out.push_str("},\n");

    if !rule.variables.is_empty() {
        let vars: Vec<String> = rule
            .variables
            .iter()
            .map(|(k, v)| format!("{}:{}", encode_string(k), encode_string(v)))
            .collect();
        out.push_str("\"variables\": {\n");
        out.push_str(&vars.join(",\n"));
        out.push_str("},\n");
    }

    out.push_str("\"evaluation\":");
    out.push_str(&encode_string(&rule.evaluation));
    out.push_str("\n}\n");
    out
}

fn push_field(out: &mut String, name: &str, encoded: &str) {
    let _ = write!(out, "\"{name}\":{encoded},\n");
}

fn string_array(items: &[String]) -> String {
    let encoded: Vec<String> = items.iter().map(|s| encode_string(s)).collect();
    format!("[{}]", encoded.join(", "))
}

fn action_array(actions: &[Action]) -> String {
    let encoded: Vec<String> = actions.iter().map(encode_action).collect();
    format!("[{}]", encoded.join(", "))
}

fn encode_action(action: &Action) -> String {
    let mut out = format!("{{\"action\": {}", encode_string(action.name()));
    if let Some(asset) = action.asset() {
        let _ = write!(out, ", \"asset\": {}", encode_string(asset));
    }
    if let Some(mode) = action.mode() {
        let _ = write!(out, ", \"mode\": {}", encode_string(mode));
    }
    out.push('}');
    out
}

/// JSON string literal with everything outside printable ASCII escaped as
/// `\uXXXX` (UTF-16 surrogate pairs above the BMP).
pub fn encode_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
    out
}
