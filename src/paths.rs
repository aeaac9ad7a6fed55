//! Helpers for normalising project paths and deriving names from them.
//!
//! Every path handled by the pipeline is project relative and uses forward slashes, so
//! rule patterns and output names behave identically on every platform.

use crate::transform::ContentFormat;

/// Normalise a path to forward slashes without a leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
  let unified = path.replace('\\', "/");
  let mut trimmed = unified.as_str();
  while let Some(rest) = trimmed.strip_prefix("./") {
    trimmed = rest;
  }
  trimmed.trim_start_matches('/').to_string()
}

/// Split `path?query` into the path and the query including its leading `?`.
pub fn split_query(path: &str) -> (&str, &str) {
  match path.find('?') {
    Some(index) => (&path[..index], &path[index..]),
    None => (path, ""),
  }
}

/// File name without directories or extension, used as the logical asset name.
pub fn file_stem(path: &str) -> &str {
  let (path, _) = split_query(path);
  let file_name = path.rsplit('/').next().unwrap_or(path);
  match file_name.rfind('.') {
    Some(0) | None => file_name,
    Some(index) => &file_name[..index],
  }
}

/// Extension including its leading dot, or an empty string.
pub fn extension(path: &str) -> &str {
  let (path, _) = split_query(path);
  let file_name = path.rsplit('/').next().unwrap_or(path);
  match file_name.rfind('.') {
    Some(0) | None => "",
    Some(index) => &file_name[index..],
  }
}

/// Returns `true` when the path lives inside a `node_modules` directory.
pub fn is_vendor_path(path: &str) -> bool {
  path.split('/').any(|segment| segment == "node_modules")
}

/// Directory scope matching: `src` matches `src` and `src/a.js` but not `srcx/a.js`.
pub fn scope_matches(scope: &str, candidate: &str) -> bool {
  let scope = scope.trim().trim_matches('/');
  if scope.is_empty() || candidate == scope {
    return true;
  }

  candidate
    .strip_prefix(scope)
    .is_some_and(|suffix| suffix.starts_with('/'))
}

/// Best-effort content format of a file before any transform ran.
pub fn initial_format(path: &str) -> ContentFormat {
  match extension(path).to_ascii_lowercase().as_str() {
    ".js" | ".jsx" | ".mjs" | ".cjs" | ".ts" | ".tsx" => ContentFormat::Script,
    ".css" | ".less" | ".scss" | ".sass" | ".styl" => ContentFormat::Style,
    ".json" | ".html" | ".txt" | ".md" | ".svg" => ContentFormat::Text,
    _ => ContentFormat::Binary,
  }
}

/// MIME type used when inlining an asset as a data URI.
pub fn mime_type(path: &str) -> &'static str {
  match extension(path).to_ascii_lowercase().as_str() {
    ".png" => "image/png",
    ".jpg" | ".jpeg" => "image/jpeg",
    ".gif" => "image/gif",
    ".svg" => "image/svg+xml",
    ".ico" => "image/x-icon",
    ".webp" => "image/webp",
    ".ttf" => "font/ttf",
    ".woff" => "font/woff",
    ".woff2" => "font/woff2",
    ".avi" => "video/x-msvideo",
    ".css" => "text/css",
    ".js" => "text/javascript",
    ".json" => "application/json",
    _ => "application/octet-stream",
  }
}

/// Returns `true` for raster and vector image files.
pub fn is_image(path: &str) -> bool {
  mime_type(path).starts_with("image/")
}
