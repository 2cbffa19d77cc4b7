use chatflow_types::VariableBag;
use chrono::{SecondsFormat, Utc};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z0-9_-]+)*)\s*\}\}")
        .expect("token pattern is valid")
});

/// Resolves `{{path}}` tokens in `template` against the session's variable
/// bag. Total: never fails, unresolved tokens become empty strings.
///
/// The scan is a single pass over the input; substituted output is never
/// re-scanned, so a variable whose value contains `{{...}}` cannot trigger
/// another round of substitution.
pub fn substitute(template: &str, variables: &VariableBag) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| {
            resolve_token(&caps[1], variables)
        })
        .into_owned()
}

fn resolve_token(path: &str, variables: &VariableBag) -> String {
    // Reserved token: the current instant, machine-readable.
    if path == "now" {
        return Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    let resolved = variables.get_path(path).or_else(|| {
        // Authoring leniency for legacy flat variable names.
        if !path.contains('.') {
            variables.get(path)
        } else {
            None
        }
    });
    match resolved {
        None | Some(Value::Null) => String::new(),
        Some(value) => value_to_string(value),
    }
}

/// String form of a variable value: strings unquoted, structures
/// pretty-printed, everything else via its JSON display form.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        other => other.to_string(),
    }
}
