//! Generates the HTML entry document that loads the emitted scripts and stylesheets.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Document used when no template is available.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>App</title>
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>
"#;

/// The `html` section of the configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlConfig {
  /// Emit the entry document.
  pub enabled: bool,
  /// Template path relative to the project root.
  pub template: Option<String>,
  /// Output file name.
  pub filename: String,
}

impl Default for HtmlConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      template: Some("public/index.html".into()),
      filename: "index.html".into(),
    }
  }
}

fn head_close() -> &'static Regex {
  static HEAD: OnceLock<Regex> = OnceLock::new();
  HEAD.get_or_init(|| Regex::new(r"(?i)([ \t]*)</head>").expect("invalid head regex"))
}

fn body_close() -> &'static Regex {
  static BODY: OnceLock<Regex> = OnceLock::new();
  BODY.get_or_init(|| Regex::new(r"(?i)([ \t]*)</body>").expect("invalid body regex"))
}

/// Inject stylesheet links before `</head>` and deferred scripts before `</body>`.
///
/// Tags are appended at the end of the document when the closing tag is missing.
pub fn render_document(template: Option<&str>, styles: &[String], scripts: &[String]) -> String {
  let mut text = template.unwrap_or(DEFAULT_TEMPLATE).to_string();

  let links: Vec<String> = styles
    .iter()
    .map(|href| format!(r#"<link href="{}" rel="stylesheet">"#, escape_attr(href)))
    .collect();
  let tags: Vec<String> = scripts
    .iter()
    .map(|src| format!(r#"<script defer src="{}"></script>"#, escape_attr(src)))
    .collect();

  text = inject(&text, head_close(), &links);
  inject(&text, body_close(), &tags)
}

fn inject(text: &str, closing: &Regex, tags: &[String]) -> String {
  if tags.is_empty() {
    return text.to_string();
  }

  match closing.captures(text) {
    Some(caps) => {
      let indent = caps.get(1).map_or("", |m| m.as_str());
      let block: String = tags
        .iter()
        .map(|tag| format!("{indent}  {tag}\n"))
        .collect();
      closing
        .replacen(text, 1, |caps: &regex::Captures<'_>| {
          format!("{block}{}", &caps[0])
        })
        .into_owned()
    }
    None => {
      let mut out = text.to_string();
      if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
      }
      for tag in tags {
        out.push_str(tag);
        out.push('\n');
      }
      out
    }
  }
}

fn escape_attr(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('"', "&quot;")
    .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn injects_tags_into_the_default_template() {
    let html = render_document(
      None,
      &["static/css/main.css".into()],
      &["static/js/runtime~main.js".into(), "static/js/main.js".into()],
    );

    let link = html.find(r#"<link href="static/css/main.css" rel="stylesheet">"#).unwrap();
    let head = html.find("</head>").unwrap();
    let runtime = html.find(r#"<script defer src="static/js/runtime~main.js"></script>"#).unwrap();
    let main = html.find(r#"<script defer src="static/js/main.js"></script>"#).unwrap();
    let body = html.find("</body>").unwrap();

    assert!(link < head);
    assert!(runtime < main && main < body);
    assert!(html.contains(r#"<div id="root"></div>"#));
  }

  #[test]
  fn keeps_custom_templates_and_handles_case() {
    let template = "<HTML><HEAD><title>x</title></HEAD><BODY><main></main></BODY></HTML>";
    let html = render_document(Some(template), &[], &["a.js".into()]);
    assert!(html.contains("<title>x</title></HEAD>"));
    assert!(html.contains("<script defer src=\"a.js\"></script>\n</BODY>"));
  }

  #[test]
  fn appends_when_closing_tags_are_missing() {
    let html = render_document(Some("<p>fragment</p>"), &["a.css".into()], &["a.js".into()]);
    assert_eq!(
      html,
      concat!(
        "<p>fragment</p>\n",
        "<link href=\"a.css\" rel=\"stylesheet\">\n",
        "<script defer src=\"a.js\"></script>\n",
      )
    );
  }

  #[test]
  fn escapes_attribute_values() {
    let html = render_document(Some("</body>"), &[], &["a\"b.js".into()]);
    assert!(html.contains("a&quot;b.js"));
  }
}
