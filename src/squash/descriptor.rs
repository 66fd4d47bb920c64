//! Attachment descriptor rendering.
//!
//! # Responsibilities
//! - Expand `{{ VAR }}` placeholders in the attachment template against the
//!   process environment
//! - JSON-quote every substituted value so the result stays well-formed
//!
//! # Design Decisions
//! - Rendering happens once, when the configuration is accepted; the state
//!   machine only ever sees the finished string
//! - A missing environment variable substitutes `""` and logs a warning; the
//!   filter must stay usable even on a partially configured pod

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder syntax accepted inside attachment templates.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{ ([a-zA-Z_]+) \}\}").expect("placeholder regex"));

/// Descriptor used when the configuration does not supply a template.
/// Identifies the pod the proxy runs in so the debugger attaches to the
/// workload that received the request.
pub const DEFAULT_ATTACHMENT_TEMPLATE: &str = r#"{
  "spec": {
    "attachment": {
      "pod": {{ POD_NAME }},
      "namespace": {{ POD_NAMESPACE }}
    },
    "match_request": true
  }
}"#;

/// Render an attachment template against the current process environment.
pub fn render_attachment(template: &str) -> String {
    render_with(template, |name| std::env::var(name).ok())
}

/// Render with an explicit variable lookup. Each substituted value is emitted
/// as a JSON string literal (quoted and escaped); unset variables become `""`.
pub fn render_with<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];

        out.push_str(&template[last..whole.start()]);

        let value = match lookup(name) {
            Some(v) => v,
            None => {
                tracing::warn!(variable = %name, "Attachment template variable not set, substituting empty string");
                String::new()
            }
        };
        // serde_json string serialization gives us the quoting and escaping.
        out.push_str(&serde_json::to_string(&value).expect("string serialization"));

        last = whole.end();
    }

    out.push_str(&template[last..]);
    out
}
