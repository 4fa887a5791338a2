//! Path utilities shared by every stage of the engine.
//!
//! All comparisons are string based on '/'-separated absolute paths. Prefix tests respect
//! segment boundaries: `/foo` contains `/foo/bar` but never `/foobar`.

use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

pub const SEPARATOR: char = '/';

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// Lexically clean a path: NFC, collapse repeated separators, resolve `.` and `..`, and drop a
/// trailing separator. Never touches the filesystem. Relative paths only lose their trailing '/'.
pub fn clean(path: &str) -> String {
    let nfc = normalize_nfc(path.trim());
    if !nfc.starts_with(SEPARATOR) {
        return trim_trailing_separator(&nfc).to_string();
    }
    let needs_work = nfc.contains("//")
        || nfc.split(SEPARATOR).any(|seg| seg == "." || seg == "..")
        || (nfc.len() > 1 && nfc.ends_with(SEPARATOR));
    if !needs_work {
        return nfc;
    }
    match Path::new(&nfc).absolutize() {
        // Re-collecting components drops repeated separators, inner `.` and the trailing '/'
        Ok(p) => p.components().collect::<PathBuf>().to_string_lossy().into_owned(),
        Err(_) => nfc,
    }
}

/// Strip one or more trailing separators, keeping a bare "/" intact.
pub fn trim_trailing_separator(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() && path.starts_with(SEPARATOR) { "/" } else { trimmed }
}

/// True iff `path == prefix` or `path` starts with `prefix` followed by a separator.
/// A prefix that already ends with a separator (only "/" after cleaning) matches anything below it.
pub fn contains(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR) || prefix.ends_with(SEPARATOR),
        None => false,
    }
}

/// Join a base path and a relative remainder with exactly one separator between them.
pub fn join(base: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches(SEPARATOR);
    if rest.is_empty() {
        return base.to_string();
    }
    if base.ends_with(SEPARATOR) { format!("{base}{rest}") } else { format!("{base}{SEPARATOR}{rest}") }
}

/// Replace the `prefix` of `path` with `replacement`, keeping the remainder of the path.
/// Returns None when `prefix` does not contain `path`.
pub fn replace_prefix(path: &str, prefix: &str, replacement: &str) -> Option<String> {
    if !contains(prefix, path) {
        return None;
    }
    Some(join(replacement, &path[prefix.len()..]))
}

/// Parent directory of an absolute path; None for "/" and for bare names.
pub fn parent(path: &str) -> Option<&str> {
    let path = trim_trailing_separator(path);
    if path == "/" {
        return None;
    }
    let idx = path.rfind(SEPARATOR)?;
    Some(if idx == 0 { "/" } else { &path[..idx] })
}

/// Last segment of a path.
pub fn file_name(path: &str) -> &str {
    let path = trim_trailing_separator(path);
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Location of the directory holding `path`, relative to `root`, with a trailing separator
/// (`Pictures/Screenshots/`). Empty for entries directly under `root`; None outside `root`.
pub fn relative_location(root: &str, path: &str) -> Option<String> {
    let dir = parent(path)?;
    if !contains(root, dir) {
        return None;
    }
    let rel = dir[root.len()..].trim_start_matches(SEPARATOR);
    Some(if rel.is_empty() { String::new() } else { format!("{rel}{SEPARATOR}") })
}

/// The set of root strings that denote the same physical storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRoots {
    canonical: String,
    aliases: Vec<String>,
}

impl AliasRoots {
    pub fn new<I, S>(canonical: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = clean(&canonical.into());
        let mut aliases: Vec<String> = aliases
            .into_iter()
            .map(|a| clean(&a.into()))
            .filter(|a| !a.is_empty() && *a != canonical)
            .collect();
        // Longest first so nested aliases resolve to the most specific root
        aliases.sort_by(|a, b| b.len().cmp(&a.len()));
        aliases.dedup();
        Self { canonical, aliases }
    }

    pub fn canonical_root(&self) -> &str { &self.canonical }

    /// Clean `path` and map any alias root onto the canonical root, remembering the alias used.
    pub fn normalize(&self, path: &str) -> NormalizedPath {
        let cleaned = clean(path);
        for alias in &self.aliases {
            if let Some(mapped) = replace_prefix(&cleaned, alias, &self.canonical) {
                return NormalizedPath {
                    canonical: mapped,
                    alias: Some((alias.clone(), self.canonical.clone())),
                };
            }
        }
        NormalizedPath { canonical: cleaned, alias: None }
    }

    /// Canonical form only, for paths whose original alias does not need to be restored.
    pub fn canonicalize(&self, path: &str) -> String {
        self.normalize(path).canonical
    }
}

/// A canonicalized path plus the alias root it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub canonical: String,
    alias: Option<(String, String)>,
}

impl NormalizedPath {
    /// The alias root the caller originally used, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_ref().map(|(a, _)| a.as_str())
    }

    /// Map a canonical result back onto the alias root the caller used.
    pub fn denormalize(&self, canonical_result: &str) -> String {
        match &self.alias {
            Some((alias, root)) => replace_prefix(canonical_result, root, alias)
                .unwrap_or_else(|| canonical_result.to_string()),
            None => canonical_result.to_string(),
        }
    }

    /// This path, in the caller's original alias form.
    pub fn original(&self) -> String {
        self.denormalize(&self.canonical)
    }
}
