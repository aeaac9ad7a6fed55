//! Built-in stand-ins for the external transforms and minimizers.
//!
//! Real compilation and minification are delegated to external tools. These
//! implementations keep the content flowing with the right format so a build can run
//! end to end; only the style injection, theme variable substitution, data URI inlining
//! and lint checks change the content.

use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde_json::Value;

use crate::error::StepError;
use crate::paths::mime_type;
use crate::transform::registry::{
  ContentFormat, MinimizeInput, Minimizer, TransformExecutor, TransformInput, TransformOutput,
  TransformRegistry,
};

/// Step appended to asset chains that inline the file as a data URI.
pub const INLINE_STEP: &str = "asset/inline";

/// Step appended to asset chains that emit the file separately.
pub const RESOURCE_STEP: &str = "asset/resource";

pub(crate) fn register(registry: &mut TransformRegistry) {
  registry
    .register_executor("babel-loader", PassThrough(Some(ContentFormat::Script)))
    .register_executor("ts-loader", PassThrough(Some(ContentFormat::Script)))
    .register_executor("css-loader", PassThrough(Some(ContentFormat::Style)))
    .register_executor("postcss-loader", PassThrough(Some(ContentFormat::Style)))
    .register_executor("sass-loader", PassThrough(Some(ContentFormat::Style)))
    .register_executor("stylus-loader", PassThrough(Some(ContentFormat::Style)))
    .register_executor("less-loader", ThemeVariables)
    .register_executor("style-loader", StyleInjector)
    .register_executor("mini-css-extract", PassThrough(Some(ContentFormat::Style)))
    .register_executor("eslint", DebuggerLint)
    .register_executor(INLINE_STEP, InlineAsset)
    .register_executor(RESOURCE_STEP, PassThrough(Some(ContentFormat::Binary)));

  registry
    .register_minimizer("terser", ScriptLines)
    .register_minimizer("css-minimizer", StyleWhitespace)
    .register_minimizer("image-minimizer", Unchanged);
}

/// Leaves content untouched, optionally relabelling its format.
#[derive(Debug, Clone, Copy)]
pub struct PassThrough(pub Option<ContentFormat>);

impl TransformExecutor for PassThrough {
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
    Ok(TransformOutput::new(
      input.content.to_vec(),
      self.0.unwrap_or(input.format),
    ))
  }
}

/// Wraps a stylesheet in a script that injects it into the document at runtime.
#[derive(Debug, Clone, Copy)]
pub struct StyleInjector;

impl TransformExecutor for StyleInjector {
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
    let css = utf8(input.path, input.content)?;
    let literal = serde_json::to_string(css).map_err(|err| StepError::new(err.to_string()))?;
    let script = format!(
      concat!(
        "(function () {{\n",
        "  var style = document.createElement(\"style\");\n",
        "  style.setAttribute(\"data-source\", {source});\n",
        "  style.textContent = {literal};\n",
        "  document.head.appendChild(style);\n",
        "}})();\n",
      ),
      source = serde_json::to_string(input.path).map_err(|err| StepError::new(err.to_string()))?,
      literal = literal,
    );
    Ok(TransformOutput::new(script.into_bytes(), ContentFormat::Script))
  }
}

/// Applies `modifyVars` overrides: definitions of overridden variables are dropped and
/// every reference is replaced with the override value.
#[derive(Debug, Clone, Copy)]
pub struct ThemeVariables;

impl TransformExecutor for ThemeVariables {
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
    let mut text = utf8(input.path, input.content)?.to_string();

    let overrides = input
      .options
      .pointer("/lessOptions/modifyVars")
      .or_else(|| input.options.get("modifyVars"))
      .and_then(Value::as_object);

    if let Some(overrides) = overrides {
      for (name, value) in overrides {
        let replacement = match value {
          Value::String(value) => value.clone(),
          other => other.to_string(),
        };
        let escaped = regex::escape(name);
        let definition = Regex::new(&format!(r"(?m)^[ \t]*{escaped}[ \t]*:[^;\n]*;[ \t]*\n?"))
          .map_err(|err| StepError::new(err.to_string()))?;
        let reference = Regex::new(&format!(r"{escaped}([^\w-]|$)"))
          .map_err(|err| StepError::new(err.to_string()))?;

        text = definition.replace_all(&text, "").into_owned();
        text = reference
          .replace_all(&text, |caps: &regex::Captures<'_>| {
            format!("{replacement}{}", &caps[1])
          })
          .into_owned();
      }
    }

    Ok(TransformOutput::new(text.into_bytes(), ContentFormat::Style))
  }
}

/// Reports `debugger` statements without touching the content.
#[derive(Debug, Clone, Copy)]
pub struct DebuggerLint;

impl TransformExecutor for DebuggerLint {
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
    static DEBUGGER: OnceLock<Regex> = OnceLock::new();
    let pattern = DEBUGGER.get_or_init(|| Regex::new(r"\bdebugger\b").expect("invalid lint regex"));

    let text = String::from_utf8_lossy(input.content);
    let warnings = text
      .lines()
      .enumerate()
      .filter(|(_, line)| !line.trim_start().starts_with("//") && pattern.is_match(line))
      .map(|(index, _)| {
        format!("line {}: unexpected `debugger` statement (no-debugger)", index + 1)
      })
      .collect();

    Ok(TransformOutput {
      content: input.content.to_vec(),
      format: input.format,
      warnings,
    })
  }
}

/// Turns a binary asset into a script module exporting a base64 data URI.
#[derive(Debug, Clone, Copy)]
pub struct InlineAsset;

impl TransformExecutor for InlineAsset {
  fn apply(&self, input: TransformInput<'_>) -> Result<TransformOutput, StepError> {
    let uri = format!(
      "data:{};base64,{}",
      mime_type(input.path),
      STANDARD.encode(input.content)
    );
    let literal = serde_json::to_string(&uri).map_err(|err| StepError::new(err.to_string()))?;
    Ok(TransformOutput::new(
      format!("export default {literal};\n").into_bytes(),
      ContentFormat::Script,
    ))
  }
}

/// Drops blank lines and trailing whitespace.
#[derive(Debug, Clone, Copy)]
pub struct ScriptLines;

impl Minimizer for ScriptLines {
  fn minimize(&self, input: MinimizeInput<'_>) -> Result<Vec<u8>, StepError> {
    let text = utf8(input.path, input.content)?;
    let mut out = String::with_capacity(text.len());
    for line in text.lines().map(str::trim_end).filter(|line| !line.is_empty()) {
      out.push_str(line);
      out.push('\n');
    }
    Ok(out.into_bytes())
  }
}

/// Strips comments and collapses whitespace around punctuation.
#[derive(Debug, Clone, Copy)]
pub struct StyleWhitespace;

impl Minimizer for StyleWhitespace {
  fn minimize(&self, input: MinimizeInput<'_>) -> Result<Vec<u8>, StepError> {
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();

    let comments =
      COMMENTS.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("invalid comment regex"));
    let whitespace =
      WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("invalid whitespace regex"));
    let punctuation = PUNCTUATION
      .get_or_init(|| Regex::new(r"\s*([{}:;,])\s*").expect("invalid punctuation regex"));

    let text = utf8(input.path, input.content)?;
    let text = comments.replace_all(text, "");
    let text = whitespace.replace_all(&text, " ");
    let text = punctuation.replace_all(&text, "$1");
    Ok(text.trim().as_bytes().to_vec())
  }
}

/// Returns the content unchanged; the directives are consumed by the external optimizer.
#[derive(Debug, Clone, Copy)]
pub struct Unchanged;

impl Minimizer for Unchanged {
  fn minimize(&self, input: MinimizeInput<'_>) -> Result<Vec<u8>, StepError> {
    Ok(input.content.to_vec())
  }
}

fn utf8<'a>(path: &str, content: &'a [u8]) -> Result<&'a str, StepError> {
  std::str::from_utf8(content).map_err(|err| StepError::new(format!("{path} is not UTF-8: {err}")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mode::BuildMode;
  use serde_json::json;

  fn input<'a>(path: &'a str, content: &'a [u8], options: &'a Value) -> TransformInput<'a> {
    TransformInput {
      path,
      content,
      format: crate::paths::initial_format(path),
      options,
      mode: BuildMode::Production,
    }
  }

  #[test]
  fn theme_variables_replace_definitions_and_references() {
    let options = json!({"lessOptions": {"modifyVars": {"@primary-color": "#1DA57A"}}});
    let source = concat!(
      "@primary-color: #1890ff;\n",
      "@primary-color-hover: #40a9ff;\n",
      ".btn { color: @primary-color; border: 1px solid @primary-color-hover; }\n",
    )
    .as_bytes();

    let output = ThemeVariables
      .apply(input("src/theme.less", source, &options))
      .expect("theme substitution should succeed");
    let text = String::from_utf8(output.content).unwrap();

    assert!(!text.contains("#1890ff"));
    assert!(text.contains("color: #1DA57A;"));
    assert!(text.contains("@primary-color-hover: #40a9ff;"));
    assert!(text.contains("solid @primary-color-hover;"));
  }

  #[test]
  fn style_injector_produces_script() {
    let output = StyleInjector
      .apply(input("src/app.css", b"body { margin: 0; }", &Value::Null))
      .unwrap();
    let text = String::from_utf8(output.content).unwrap();
    assert_eq!(output.format, ContentFormat::Script);
    assert!(text.contains("document.head.appendChild(style)"));
    assert!(text.contains(r#""body { margin: 0; }""#));
  }

  #[test]
  fn inline_asset_encodes_data_uri() {
    let output = InlineAsset
      .apply(input("src/dot.png", &[0x89, 0x50, 0x4e, 0x47], &Value::Null))
      .unwrap();
    assert_eq!(
      String::from_utf8(output.content).unwrap(),
      "export default \"data:image/png;base64,iVBORw==\";\n"
    );
  }

  #[test]
  fn lint_reports_debugger_lines() {
    let source = b"const a = 1;\n// debugger in a comment\ndebugger;\n";
    let output = DebuggerLint
      .apply(input("src/main.js", source, &Value::Null))
      .unwrap();
    assert_eq!(output.content, source.to_vec());
    assert_eq!(output.warnings, vec![
      "line 3: unexpected `debugger` statement (no-debugger)".to_string()
    ]);
  }

  #[test]
  fn style_minimizer_collapses_whitespace() {
    let css = b"/* header */\nbody {\n  margin: 0;\n  color: red;\n}\n";
    let out = StyleWhitespace
      .minimize(MinimizeInput {
        path: "static/css/main.css",
        content: css,
        options: &Value::Null,
      })
      .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "body{margin:0;color:red;}");
  }

  #[test]
  fn rejects_non_utf8_styles() {
    let err = StyleInjector
      .apply(input("src/bad.css", &[0xff, 0xfe], &Value::Null))
      .unwrap_err();
    assert!(err.message.contains("src/bad.css"));
  }
}
