//! Compile commands database handling.

use std::env::current_dir;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;

use regex::Regex;

use serde::Deserialize;

use tracing::debug;
use tracing::warn;

use asmsift::helper::normalize;


/// One entry of a `compile_commands.json` database.
#[derive(Debug, Deserialize)]
struct Entry {
    directory: PathBuf,
    command: String,
    file: PathBuf,
}


/// The compile command of one translation unit, with all paths resolved
/// to absolute ones.
#[derive(Clone, Debug)]
pub struct CompileCommand {
    /// The working directory of the compilation.
    pub directory: PathBuf,
    /// The compiler command line, as one string.
    pub command: String,
    /// The translation unit's source file.
    pub file: PathBuf,
}


/// Resolve `path` against `base` unless it is already absolute, and
/// normalize it.
fn absolute_or(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Probe the current directory for a `compile_commands.json`.
pub fn find_ccj() -> Option<PathBuf> {
    let probe = current_dir().ok()?.join("compile_commands.json");
    probe.exists().then_some(probe)
}

/// Load and parse a compile commands database, skipping entries that do
/// not carry the expected fields.
fn load(ccj_path: &Path) -> Result<Vec<Entry>> {
    let content = read_to_string(ccj_path)
        .with_context(|| format!("could not open {}", ccj_path.display()))?;
    let values = serde_json::from_str::<Vec<serde_json::Value>>(&content)
        .with_context(|| format!("could not parse {}", ccj_path.display()))?;

    let entries = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Entry>(value) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping compile command entry: {err}");
                None
            }
        })
        .collect();
    Ok(entries)
}

/// The directory a database's relative paths resolve against.
fn base_dir(ccj_path: &Path) -> PathBuf {
    ccj_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Find the compile command of `target` in the database at `ccj_path`.
///
/// A relative `target` is resolved against the database's directory.
pub fn find_compile_command(ccj_path: &Path, target: &Path) -> Result<Option<CompileCommand>> {
    let ccj_dir = base_dir(ccj_path);
    let target = absolute_or(&ccj_dir, target);

    for entry in load(ccj_path)? {
        let directory = absolute_or(&ccj_dir, &entry.directory);
        let file = absolute_or(&directory, &entry.file);
        if file == target {
            return Ok(Some(CompileCommand {
                directory,
                command: entry.command,
                file,
            }))
        }
    }
    Ok(None)
}

/// The `-I` include directories of a compile command, resolved against
/// the compilation directory.
fn include_dirs(directory: &Path, command: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut tokens = command.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "-I" {
            if let Some(dir) = tokens.next() {
                dirs.push(absolute_or(directory, Path::new(dir)));
            }
        } else if let Some(dir) = token.strip_prefix("-I") {
            dirs.push(absolute_or(directory, Path::new(dir)));
        }
    }
    dirs
}

/// Find the translation unit to compile for `target`.
///
/// If the database has an entry for `target` itself, that entry wins.
/// Otherwise `target` is assumed to be a header and every translation
/// unit's source text is scanned for an `#include` resolving to it,
/// against the unit's own directory and its `-I` directories; the first
/// unit in database order that includes the target is returned.
pub fn infer(ccj_path: &Path, target: &Path) -> Result<Option<CompileCommand>> {
    if let Some(cmd) = find_compile_command(ccj_path, target)? {
        return Ok(Some(cmd))
    }

    let include =
        Regex::new(r#"#\s*include\s*[<"]([^">]+)[">]"#).expect("include pattern failed to compile");
    let ccj_dir = base_dir(ccj_path);
    let target = absolute_or(&ccj_dir, target);

    for entry in load(ccj_path)? {
        let directory = absolute_or(&ccj_dir, &entry.directory);
        let file = absolute_or(&directory, &entry.file);
        let source = match read_to_string(&file) {
            Ok(source) => source,
            Err(err) => {
                warn!("could not read {}: {err}", file.display());
                continue
            }
        };

        let unit_dir = file.parent().map(Path::to_path_buf).unwrap_or_else(|| directory.clone());
        let mut candidates = vec![unit_dir];
        candidates.extend(include_dirs(&directory, &entry.command));
        candidates.push(directory.clone());

        for captures in include.captures_iter(&source) {
            let Some(included) = captures.get(1) else { continue };
            for candidate in &candidates {
                if normalize(&candidate.join(included.as_str())) == target {
                    debug!(
                        "{} includes {}",
                        file.display(),
                        target.display()
                    );
                    return Ok(Some(CompileCommand {
                        directory,
                        command: entry.command,
                        file,
                    }))
                }
            }
        }
    }
    Ok(None)
}
