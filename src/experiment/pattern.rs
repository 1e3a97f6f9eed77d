//! Glob patterns over the experiment hierarchy.

use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use tracing::warn;

use crate::error::ExperimentError;

/// Suffix appended to a level name when no extension is given.
const LEVEL_SUFFIX: &str = "--*";

/// Join `parts` below `root` and append `extension`, or `--*` if none.
///
/// `root` is escaped so that brackets or asterisks in the experiment folder
/// name are matched literally; `parts` are used as pattern text.
///
/// ```
/// use std::path::Path;
/// use matrixscan::experiment::pattern;
///
/// assert_eq!(pattern(Path::new("/exp"), &["slide"], None), "/exp/slide--*");
/// assert_eq!(
///     pattern(Path::new("/exp[1]"), &["image"], Some("*.png")),
///     "/exp[[]1[]]/image*.png"
/// );
/// ```
pub fn pattern(root: &Path, parts: &[&str], extension: Option<&str>) -> String {
    let mut path = PathBuf::from(Pattern::escape(&root.to_string_lossy()));
    for part in parts {
        path.push(part);
    }
    let mut text = path.to_string_lossy().into_owned();
    text.push_str(extension.unwrap_or(LEVEL_SUFFIX));
    text
}

/// Append more pattern text to an already built pattern.
pub(crate) fn extend(base: &str, parts: &[&str], extension: Option<&str>) -> String {
    let mut path = PathBuf::from(base);
    for part in parts {
        path.push(part);
    }
    let mut text = path.to_string_lossy().into_owned();
    text.push_str(extension.unwrap_or(LEVEL_SUFFIX));
    text
}

/// Check that `pattern` compiles.
pub(crate) fn validate(pattern: &str) -> Result<(), ExperimentError> {
    Pattern::new(pattern)?;
    Ok(())
}

/// Paths matching `pattern`, sorted.
///
/// Unreadable entries are skipped; an invalid pattern matches nothing.
pub fn sorted_glob(pattern: &str) -> Vec<PathBuf> {
    let paths = match glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid glob pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };
    let mut found: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    found.sort();
    found
}
