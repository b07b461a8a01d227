//! State built by the first pass and consumed by the second.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::annotate::LineMapping;


/// One record of the `.file` directive table.
///
/// The record's `path` is the absolute path reconstructed from the
/// directive's directory and file name, resolved against the compilation
/// directory. Multiple file indices can refer to the same file; `indices`
/// collects all of them.
#[derive(Clone, Debug)]
pub(crate) struct FileInfo<'input> {
    pub(crate) indices: BTreeSet<usize>,
    pub(crate) directory: Option<&'input str>,
    pub(crate) name: &'input str,
    pub(crate) md5: Option<&'input str>,
    pub(crate) path: PathBuf,
}

impl PartialEq for FileInfo<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.md5, other.md5) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => self.path == other.path,
        }
    }
}

impl Eq for FileInfo<'_> {}


/// The per-source-line map of output line ranges.
///
/// Ranges are closed, disjoint, and non-touching: for any two ranges of
/// the same source line, the later one starts at least two lines after
/// the earlier one ends. The structured form is required for merging;
/// [`flatten`][Self::flatten] produces the public representation.
#[derive(Debug, Default)]
pub(crate) struct LineMap {
    ranges: BTreeMap<usize, BTreeSet<(usize, usize)>>,
}

impl LineMap {
    /// Record that output line `asm_line` was produced by source line
    /// `source_line`, extending or merging adjacent ranges.
    pub(crate) fn register(&mut self, source_line: usize, asm_line: usize) {
        let ranges = self.ranges.entry(source_line).or_default();

        let below = ranges
            .iter()
            .find(|(_lo, hi)| hi + 1 == asm_line)
            .copied();
        let above = ranges
            .iter()
            .find(|(lo, _hi)| *lo == asm_line + 1)
            .copied();

        match (below, above) {
            // The new line bridges two existing ranges.
            (Some(below), Some(above)) => {
                let _removed = ranges.remove(&below);
                let _removed = ranges.remove(&above);
                let _inserted = ranges.insert((below.0, above.1));
            }
            (Some(below), None) => {
                let _removed = ranges.remove(&below);
                let _inserted = ranges.insert((below.0, asm_line));
            }
            (None, Some(above)) => {
                let _removed = ranges.remove(&above);
                let _inserted = ranges.insert((asm_line, above.1));
            }
            (None, None) => {
                let _inserted = ranges.insert((asm_line, asm_line));
            }
        }
    }

    /// Flatten into `(source_line, asm_start, asm_end)` triples, source
    /// lines ascending and ranges ascending within each.
    pub(crate) fn flatten(&self) -> Vec<LineMapping> {
        self.ranges
            .iter()
            .flat_map(|(source_line, ranges)| {
                ranges.iter().map(|(asm_start, asm_end)| LineMapping {
                    source_line: *source_line,
                    asm_start: *asm_start,
                    asm_end: *asm_end,
                })
            })
            .collect()
    }
}


/// Everything the first pass learns about the input.
///
/// All string keys and values borrow from the input buffer.
#[derive(Debug, Default)]
pub(crate) struct ParserState<'input> {
    /// Routine symbol to the labels its opcodes reference.
    pub(crate) routines: HashMap<&'input str, Vec<&'input str>>,
    /// Symbols declared `.globl` or `.type ..., @function`/`%object`.
    pub(crate) globals: HashSet<&'input str>,
    /// The symbol whose body is currently being scanned.
    pub(crate) current_global: Option<&'input str>,
    /// The compilation directory from the DWARF5 `.file 0` entry.
    pub(crate) compile_dir: PathBuf,
    /// All numbered `.file` records, by index.
    pub(crate) file_table: BTreeMap<usize, FileInfo<'input>>,
    /// The union of the file records matching the annotation target.
    pub(crate) target_info: Option<FileInfo<'input>>,
    /// Routines with at least one `.loc` pointing into the target file.
    pub(crate) target_routines: HashSet<&'input str>,
    /// Labels surviving reachability.
    pub(crate) used_labels: HashSet<&'input str>,
    pub(crate) linemap: LineMap,
}


#[cfg(test)]
mod tests {
    use super::*;


    fn ranges_of(map: &LineMap, line: usize) -> Vec<(usize, usize)> {
        map.ranges
            .get(&line)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// A new source line starts with a singleton range.
    #[test]
    fn register_fresh() {
        let mut map = LineMap::default();
        map.register(7, 3);
        assert_eq!(ranges_of(&map, 7), vec![(3, 3)]);
    }

    /// Consecutive output lines extend the range upward.
    #[test]
    fn register_extend_up() {
        let mut map = LineMap::default();
        map.register(7, 3);
        map.register(7, 4);
        map.register(7, 5);
        assert_eq!(ranges_of(&map, 7), vec![(3, 5)]);
    }

    /// A line just below an existing range extends it downward.
    #[test]
    fn register_extend_down() {
        let mut map = LineMap::default();
        map.register(7, 4);
        map.register(7, 3);
        assert_eq!(ranges_of(&map, 7), vec![(3, 4)]);
    }

    /// A line exactly between two ranges merges them.
    #[test]
    fn register_bridge() {
        let mut map = LineMap::default();
        map.register(7, 2);
        map.register(7, 4);
        assert_eq!(ranges_of(&map, 7), vec![(2, 2), (4, 4)]);
        map.register(7, 3);
        assert_eq!(ranges_of(&map, 7), vec![(2, 4)]);
    }

    /// Non-adjacent lines stay in disjoint, non-touching ranges.
    #[test]
    fn register_disjoint() {
        let mut map = LineMap::default();
        map.register(7, 2);
        map.register(7, 5);
        map.register(7, 6);
        map.register(9, 1);
        assert_eq!(ranges_of(&map, 7), vec![(2, 2), (5, 6)]);
        assert_eq!(ranges_of(&map, 9), vec![(1, 1)]);
    }

    /// Flattening iterates source lines and ranges in ascending order.
    #[test]
    fn flatten_ordering() {
        let mut map = LineMap::default();
        map.register(9, 1);
        map.register(7, 5);
        map.register(7, 2);
        let flat = map.flatten();
        let triples = flat
            .iter()
            .map(|m| (m.source_line, m.asm_start, m.asm_end))
            .collect::<Vec<_>>();
        assert_eq!(triples, vec![(7, 2, 2), (7, 5, 5), (9, 1, 1)]);
    }

    /// File records compare by md5 when both have one, by path otherwise.
    #[test]
    fn file_info_equality() {
        let record = |md5: Option<&'static str>, path: &str| FileInfo {
            indices: BTreeSet::new(),
            directory: None,
            name: "header.hpp",
            md5,
            path: PathBuf::from(path),
        };

        let a = record(Some("0xaa"), "/proj/header.hpp");
        let b = record(Some("0xaa"), "/elsewhere/header.hpp");
        let c = record(Some("0xbb"), "/proj/header.hpp");
        let d = record(None, "/proj/header.hpp");
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Without a pair of checksums the paths decide.
        assert_eq!(a, d);
        assert_ne!(record(None, "/x"), record(None, "/y"));
    }
}
