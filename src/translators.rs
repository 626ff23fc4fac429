//! Translator index generation.
//!
//! Each translator script starts with a JSON metadata block:
//!
//! ```text
//! {
//!     "translatorID": "…",
//!     "label": "…",
//!     "lastUpdated": "2024-01-01 00:00:00"
//! }
//!
//! function detectWeb(doc, url) { … }
//! ```
//!
//! The grammar accepted by [`extract_metadata_header`]: an optional byte order mark and
//! leading whitespace, then `{`. Braces are balanced outside of JSON string literals
//! (escapes honoured), and the block ends at the `}` returning to depth zero. That
//! brace may be followed by spaces or tabs, then a line break (`\n`, `\r\n` or `\r`) or
//! the end of the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::BundleError;
use crate::models::TranslatorIndexEntry;
use crate::payload::has_extension;

/// Locate the leading metadata block of a translator script.
pub fn extract_metadata_header(text: &str) -> Option<&str> {
  let body = text.strip_prefix('\u{feff}').unwrap_or(text);
  let offset = text.len() - body.len();
  let start = offset + (body.len() - body.trim_start().len());
  let block = &text[start..];
  if !block.starts_with('{') {
    return None;
  }

  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (idx, ch) in block.char_indices() {
    if in_string {
      match ch {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }

    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          let end = idx + ch.len_utf8();
          let rest = block[end..].trim_start_matches([' ', '\t']);
          let terminated = rest.is_empty() || rest.starts_with(['\n', '\r']);
          return terminated.then(|| &block[..end]);
        }
      }
      _ => {}
    }
  }

  None
}

/// Parse the metadata block of `text`, read from `file`, into an index entry.
pub fn parse_translator(file: &Path, text: &str) -> Result<TranslatorIndexEntry> {
  let header = extract_metadata_header(text).ok_or_else(|| BundleError::MissingMetadata {
    file: file.to_path_buf(),
  })?;

  let invalid = |reason: String| BundleError::InvalidMetadata {
    file: file.to_path_buf(),
    reason,
  };

  let metadata: Value = serde_json::from_str(header).map_err(|err| invalid(err.to_string()))?;
  let field = |name: &str| -> Result<String, BundleError> {
    match metadata.get(name) {
      Some(Value::String(value)) => Ok(value.clone()),
      Some(_) => Err(invalid(format!("`{name}` is not a string"))),
      None => Err(invalid(format!("`{name}` is missing"))),
    }
  };

  let id = field("translatorID")?;
  let last_updated = field("lastUpdated")?;
  let file_name = file
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .ok_or_else(|| invalid("path has no file name".into()))?;

  Ok(TranslatorIndexEntry {
    id,
    file_name,
    last_updated,
  })
}

/// Build the index of every translator script in `dir`, ordered case-insensitively by
/// file name. A single file without valid metadata fails the whole build.
pub fn build_translator_index(dir: &Path, extension: &str) -> Result<Vec<TranslatorIndexEntry>> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
    let entry = entry?;
    if entry.file_type()?.is_file() && has_extension(&entry.path(), extension) {
      files.push(entry.path());
    }
  }
  sort_case_insensitive(&mut files);

  let mut index = Vec::with_capacity(files.len());
  for path in files {
    let text = fs::read_to_string(&path)
      .with_context(|| format!("failed to read translator {}", path.display()))?;
    let entry = parse_translator(&path, &text)?;
    debug!(file = %entry.file_name, id = %entry.id, "indexed translator");
    index.push(entry);
  }

  info!(dir = %dir.display(), translators = index.len(), "built translator index");
  Ok(index)
}

/// Serialise the index as pretty JSON to `path`.
pub fn write_index(path: &Path, index: &[TranslatorIndexEntry]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let json = serde_json::to_string_pretty(index)?;
  fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn sort_case_insensitive(files: &mut [std::path::PathBuf]) {
  files.sort_by_cached_key(|path| {
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    (name.to_lowercase(), name)
  });
}
