//! Output filename templates and the mode dependent namer.
//!
//! Templates use bracket placeholders: `[name]`, `[ext]` (with its leading dot),
//! `[query]`, and `[contenthash]`/`[hash]` with an optional `:N` length. In production the
//! hash is the blake3 hex digest of the artifact content; in development it resolves to
//! nothing and the `.` in front of it is dropped, giving stable names.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::BuildContext;
use crate::error::{ConfigError, ConfigResult};
use crate::output::hash::ContentHash;
use crate::paths::{extension, file_stem, split_query};

/// Longest accepted explicit hash length.
pub const MAX_HASH_LENGTH: usize = 64;

fn placeholder() -> &'static Regex {
  static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
  PLACEHOLDER.get_or_init(|| {
    Regex::new(r"\[(name|contenthash|hash|ext|query)(?::\s*(\d+))?\]")
      .expect("invalid placeholder regex")
  })
}

fn bracket_token() -> &'static Regex {
  static TOKEN: OnceLock<Regex> = OnceLock::new();
  TOKEN.get_or_init(|| Regex::new(r"\[[^\]]*\]").expect("invalid token regex"))
}

/// Naming surfaces with independently configurable templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingSurface {
  /// Entry and runtime script bundles.
  Script,
  /// Shared script chunks.
  ScriptChunk,
  /// Extracted entry stylesheets.
  Style,
  /// Extracted shared stylesheets.
  StyleChunk,
  /// Emitted media and passthrough files.
  Media,
}

/// Filename templates for each naming surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputTemplates {
  /// Entry and runtime script bundles.
  pub script: String,
  /// Shared script chunks.
  pub script_chunk: String,
  /// Extracted entry stylesheets.
  pub style: String,
  /// Extracted shared stylesheets.
  pub style_chunk: String,
  /// Emitted media and passthrough files.
  pub media: String,
}

impl Default for OutputTemplates {
  fn default() -> Self {
    Self {
      script: "static/js/[name].[contenthash].js".into(),
      script_chunk: "static/js/[name].[contenthash].chunk.js".into(),
      style: "static/css/[name].[contenthash].css".into(),
      style_chunk: "static/css/[name].[contenthash].chunk.css".into(),
      media: "static/js/[hash:10][ext][query]".into(),
    }
  }
}

impl OutputTemplates {
  /// Template configured for `surface`.
  pub fn for_surface(&self, surface: NamingSurface) -> &str {
    match surface {
      NamingSurface::Script => &self.script,
      NamingSurface::ScriptChunk => &self.script_chunk,
      NamingSurface::Style => &self.style,
      NamingSurface::StyleChunk => &self.style_chunk,
      NamingSurface::Media => &self.media,
    }
  }

  /// Validate every template.
  pub fn validate(&self) -> ConfigResult<()> {
    [
      &self.script,
      &self.script_chunk,
      &self.style,
      &self.style_chunk,
      &self.media,
    ]
    .into_iter()
    .try_for_each(|template| validate_template(template))
  }
}

/// Default hash lengths used when a placeholder carries no explicit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HashLengths {
  /// Script bundles and chunks.
  pub scripts: usize,
  /// Extracted stylesheets.
  pub styles: usize,
  /// Emitted media other than images.
  pub media: usize,
  /// Emitted images; shorter since they change rarely.
  pub images: usize,
}

impl Default for HashLengths {
  fn default() -> Self {
    Self {
      scripts: 10,
      styles: 10,
      media: 10,
      images: 8,
    }
  }
}

impl HashLengths {
  /// Default length for a file with extension `ext` named on `surface`.
  pub fn for_surface(&self, surface: NamingSurface, ext: &str) -> usize {
    match surface {
      NamingSurface::Script | NamingSurface::ScriptChunk => self.scripts,
      NamingSurface::Style | NamingSurface::StyleChunk => self.styles,
      NamingSurface::Media if is_image(ext) => self.images,
      NamingSurface::Media => self.media,
    }
  }
}

fn is_image(ext: &str) -> bool {
  matches!(
    ext.to_ascii_lowercase().as_str(),
    ".png" | ".jpg" | ".jpeg" | ".gif" | ".svg" | ".ico" | ".webp"
  )
}

/// Reject empty templates, unknown placeholders and out of range hash lengths.
pub fn validate_template(template: &str) -> ConfigResult<()> {
  let invalid = |reason: String| ConfigError::InvalidTemplate {
    template: template.to_string(),
    reason,
  };

  if template.trim().is_empty() {
    return Err(invalid("template is empty".into()));
  }

  for token in bracket_token().find_iter(template) {
    let Some(caps) = placeholder().captures(token.as_str()) else {
      return Err(invalid(format!("unknown placeholder {}", token.as_str())));
    };
    if caps.get(0).map(|m| m.as_str()) != Some(token.as_str()) {
      return Err(invalid(format!("unknown placeholder {}", token.as_str())));
    }
    if let Some(length) = caps.get(2) {
      let length: usize = length
        .as_str()
        .parse()
        .map_err(|_| invalid(format!("invalid hash length in {}", token.as_str())))?;
      if length == 0 || length > MAX_HASH_LENGTH {
        return Err(invalid(format!(
          "hash length {length} outside 1..={MAX_HASH_LENGTH}"
        )));
      }
    }
  }

  Ok(())
}

/// Logical identity of an artifact before naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalName<'a> {
  /// Directory of the source file without a trailing `/`; empty for chunks.
  pub dir: &'a str,
  /// Base name without extension.
  pub name: &'a str,
  /// Extension with its leading dot.
  pub ext: &'a str,
  /// Query string with its leading `?`.
  pub query: &'a str,
}

impl<'a> LogicalName<'a> {
  /// Derive the logical name of a source path.
  pub fn from_path(path: &'a str) -> Self {
    let (file, query) = split_query(path);
    Self {
      dir: file.rsplit_once('/').map_or("", |(dir, _)| dir),
      name: file_stem(path),
      ext: extension(path),
      query,
    }
  }

  /// Logical name of a chunk.
  pub fn chunk(name: &'a str, ext: &'a str) -> Self {
    Self {
      dir: "",
      name,
      ext,
      query: "",
    }
  }
}

/// Computes destination paths for emitted artifacts.
#[derive(Debug, Clone, Copy)]
pub struct OutputNamer<'a> {
  ctx: BuildContext<'a>,
}

impl<'a> OutputNamer<'a> {
  /// Create a namer bound to the build context.
  pub fn new(ctx: BuildContext<'a>) -> Self {
    Self { ctx }
  }

  /// Name an artifact using the template of `surface`.
  pub fn name(&self, surface: NamingSurface, logical: &LogicalName<'_>, content: &[u8]) -> String {
    let template = self.ctx.config.output_templates.for_surface(surface);
    self.name_with_template(template, surface, logical, content)
  }

  /// Name an artifact using an explicit template, such as a rule override.
  pub fn name_with_template(
    &self,
    template: &str,
    surface: NamingSurface,
    logical: &LogicalName<'_>,
    content: &[u8],
  ) -> String {
    let default_length = self
      .ctx
      .config
      .hash_lengths
      .for_surface(surface, logical.ext);
    render(
      template,
      logical,
      content,
      default_length,
      self.ctx.mode.is_production(),
    )
  }
}

fn render(
  template: &str,
  logical: &LogicalName<'_>,
  content: &[u8],
  default_length: usize,
  hashed: bool,
) -> String {
  let has_name = template.contains("[name]");
  let mut hash: Option<ContentHash> = None;
  let mut out = String::with_capacity(template.len() + 16);
  let mut last = 0;

  for caps in placeholder().captures_iter(template) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    out.push_str(&template[last..whole.start()]);
    last = whole.end();

    match &caps[1] {
      "name" => out.push_str(logical.name),
      "ext" => out.push_str(logical.ext),
      "query" => out.push_str(logical.query),
      _ if hashed => {
        let length = caps
          .get(2)
          .and_then(|m| m.as_str().parse().ok())
          .unwrap_or(default_length);
        let digest = *hash.get_or_insert_with(|| ContentHash::of(content));
        out.push_str(&digest.short(length));
      }
      _ if !has_name => {
        if !logical.dir.is_empty() {
          out.push_str(logical.dir);
          out.push('/');
        }
        out.push_str(logical.name);
      }
      _ => {
        if out.ends_with('.') {
          out.pop();
        }
      }
    }
  }

  out.push_str(&template[last..]);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PipelineConfig;
  use crate::mode::BuildMode;
  use proptest::prelude::*;

  fn namer(config: &PipelineConfig, mode: BuildMode) -> OutputNamer<'_> {
    OutputNamer::new(BuildContext::new(config, mode))
  }

  #[test]
  fn production_script_names_carry_hashes() {
    let config = PipelineConfig::default();
    let name = namer(&config, BuildMode::Production).name(
      NamingSurface::Script,
      &LogicalName::chunk("main", ".js"),
      b"console.log(1)",
    );

    let hash = ContentHash::of(b"console.log(1)").short(10);
    assert_eq!(name, format!("static/js/main.{hash}.js"));
  }

  #[test]
  fn development_names_drop_hashes() {
    let config = PipelineConfig::default();
    let namer = namer(&config, BuildMode::Development);

    assert_eq!(
      namer.name(
        NamingSurface::ScriptChunk,
        &LogicalName::chunk("vendors~main", ".js"),
        b"x"
      ),
      "static/js/vendors~main.chunk.js"
    );
    assert_eq!(
      namer.name(NamingSurface::Style, &LogicalName::chunk("main", ".css"), b"x"),
      "static/css/main.css"
    );
  }

  #[test]
  fn development_hash_only_templates_fall_back_to_names() {
    let config = PipelineConfig::default();
    let name = namer(&config, BuildMode::Development).name(
      NamingSurface::Media,
      &LogicalName::from_path("src/fonts/icons.woff2"),
      b"font",
    );
    assert_eq!(name, "static/js/src/fonts/icons.woff2");

    let home = namer(&config, BuildMode::Development).name(
      NamingSurface::Media,
      &LogicalName::from_path("src/home/logo.png?v=2"),
      b"home",
    );
    let about = namer(&config, BuildMode::Development).name(
      NamingSurface::Media,
      &LogicalName::from_path("src/about/logo.png?v=2"),
      b"about",
    );
    assert_eq!(home, "static/js/src/home/logo.png?v=2");
    assert_ne!(home, about);
  }

  #[test]
  fn default_media_names_use_a_ten_character_hash() {
    let config = PipelineConfig::default();
    let name = namer(&config, BuildMode::Production).name(
      NamingSurface::Media,
      &LogicalName::from_path("src/fonts/icons.woff2?v=1"),
      b"font",
    );
    let hash = ContentHash::of(b"font").short(10);
    assert_eq!(name, format!("static/js/{hash}.woff2?v=1"));
  }

  #[test]
  fn images_use_the_shorter_hash() {
    let config = PipelineConfig::default();
    let name = namer(&config, BuildMode::Production).name_with_template(
      "static/imgs/[hash][ext][query]",
      NamingSurface::Media,
      &LogicalName::from_path("src/logo.png?v=3"),
      b"png-bytes",
    );
    let hash = ContentHash::of(b"png-bytes").short(8);
    assert_eq!(name, format!("static/imgs/{hash}.png?v=3"));
  }

  #[test]
  fn explicit_lengths_override_defaults() {
    let config = PipelineConfig::default();
    let name = namer(&config, BuildMode::Production).name_with_template(
      "static/js/[name].[contenthash: 6].js",
      NamingSurface::Script,
      &LogicalName::chunk("main", ".js"),
      b"abc",
    );
    assert_eq!(name, format!("static/js/main.{}.js", ContentHash::of(b"abc").short(6)));
  }

  #[test]
  fn validates_placeholders() {
    assert!(validate_template("static/js/[name].[contenthash:10].js").is_ok());
    assert!(validate_template("static/js/[name].[contenthash: 10].js").is_ok());
    assert!(validate_template("static/[id].js").is_err());
    assert!(validate_template("static/[hash:0].js").is_err());
    assert!(validate_template("static/[hash:65].js").is_err());
    assert!(validate_template("  ").is_err());
    assert!(OutputTemplates::default().validate().is_ok());
  }

  proptest! {
    #[test]
    fn near_duplicate_contents_never_share_a_name(
      base in prop::collection::vec(any::<u8>(), 1..256),
      index in any::<prop::sample::Index>(),
      flip in 1u8..=255,
    ) {
      let config = PipelineConfig::default();
      let namer = namer(&config, BuildMode::Production);
      let logical = LogicalName::chunk("main", ".js");

      let mut changed = base.clone();
      let at = index.index(changed.len());
      changed[at] ^= flip;

      let first = namer.name(NamingSurface::Script, &logical, &base);
      prop_assert_eq!(&first, &namer.name(NamingSurface::Script, &logical, &base));
      prop_assert_ne!(first, namer.name(NamingSurface::Script, &logical, &changed));
    }
  }
}
