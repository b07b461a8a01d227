//! Assorted helper functionality used around, but not by, the core
//! annotator.

use std::path::Path;
use std::path::PathBuf;

use crate::util;
use crate::Result;


/// Lexically normalize a path, resolving `.` and `..` components without
/// consulting the file system.
pub fn normalize(path: &Path) -> PathBuf {
    util::normalize(path)
}

/// Make a path absolute (against the current working directory, if
/// necessary) and lexically normalize it.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    util::absolutize(path)
}
