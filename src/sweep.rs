//! The line sweeper driving both annotation passes.

use regex::CaptureLocations;

use crate::annotate::AnnotateOpts;
use crate::rules::rules;
use crate::rules::Rule;
use crate::rules::RuleTable;
use crate::rules::MAX_GROUPS;
use crate::Result;


/// Per-sweep scratch space holding one reusable capture buffer per rule.
#[derive(Debug)]
struct Scratch {
    locations: Vec<CaptureLocations>,
}

impl Scratch {
    fn new(table: &RuleTable) -> Self {
        let locations = table
            .iter()
            .map(|regex| regex.capture_locations())
            .collect();
        Self { locations }
    }
}


/// The spans produced by a successful rule match.
///
/// Capture 0 is the consumed span: everything from the start of the
/// match window through the end of the match, any unmatched prefix
/// included. Captures 1 and up are the rule's groups.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Spans<'input> {
    whole: &'input str,
    groups: [Option<&'input str>; MAX_GROUPS],
}

impl<'input> Spans<'input> {
    /// The consumed span (capture 0).
    #[inline]
    pub(crate) fn whole(&self) -> &'input str {
        self.whole
    }

    /// Capture group `idx` (1-based), if the rule defines it and it
    /// participated in the match.
    #[inline]
    pub(crate) fn group(&self, idx: usize) -> Option<&'input str> {
        self.groups[idx - 1]
    }
}


/// The sweeper's view of the current line, presented to a rule body.
///
/// A rule body decides the line's fate by calling [`preserve`][Self::preserve]
/// or [`kill`][Self::kill] (the first call wins); if it does neither, the
/// sweeper applies the default disposition.
#[derive(Debug)]
pub(crate) struct Cursor<'input, 'sweep> {
    line: &'input str,
    output: &'sweep mut Vec<&'input str>,
    linum: &'sweep mut usize,
    scratch: &'sweep mut Scratch,
    decided: bool,
}

impl<'input> Cursor<'input, '_> {
    /// The line under consideration.
    #[inline]
    pub(crate) fn line(&self) -> &'input str {
        self.line
    }

    /// Append the current line to the output and advance the output-line
    /// counter.
    pub(crate) fn preserve(&mut self) {
        if !self.decided {
            self.output.push(self.line);
            *self.linum += 1;
            self.decided = true;
        }
    }

    /// Drop the current line.
    pub(crate) fn kill(&mut self) {
        self.decided = true;
    }

    /// The output-line number the current line will receive if preserved.
    #[inline]
    pub(crate) fn asm_linum(&self) -> usize {
        *self.linum
    }

    /// Match `rule` against the whole line.
    #[inline]
    pub(crate) fn matches(&mut self, rule: Rule) -> Option<Spans<'input>> {
        self.matches_at(rule, 0)
    }

    /// Match `rule` against the line suffix starting at byte `offset`.
    pub(crate) fn matches_at(&mut self, rule: Rule, offset: usize) -> Option<Spans<'input>> {
        let line: &'input str = self.line;
        let window = line.get(offset..)?;
        let regex = rules().regex(rule);
        let locations = &mut self.scratch.locations[rule.index()];
        let found = regex.captures_read(locations, window)?;

        let whole = &window[..found.end()];
        let mut groups = [None; MAX_GROUPS];
        for (slot, idx) in groups.iter_mut().zip(1..regex.captures_len()) {
            *slot = locations.get(idx).map(|(start, end)| &window[start..end]);
        }
        Some(Spans { whole, groups })
    }
}


/// Sweep over `input`, letting `body` decide each non-empty line's fate.
///
/// Empty lines are dropped unconditionally. Lines the body leaves
/// undecided are preserved when `preserve_directives` is set and dropped
/// otherwise.
pub(crate) fn sweep<'input, I, F>(input: I, opts: &AnnotateOpts, mut body: F) -> Result<Vec<&'input str>>
where
    I: IntoIterator<Item = &'input str>,
    F: FnMut(&mut Cursor<'input, '_>) -> Result<()>,
{
    let mut scratch = Scratch::new(rules());
    let mut output = Vec::new();
    let mut linum = 1;

    for line in input {
        if line.is_empty() {
            continue
        }

        let mut cursor = Cursor {
            line,
            output: &mut output,
            linum: &mut linum,
            scratch: &mut scratch,
            decided: false,
        };
        let () = body(&mut cursor)?;

        if !cursor.decided {
            if opts.preserve_directives {
                cursor.preserve();
            } else {
                cursor.kill();
            }
        }
    }
    Ok(output)
}
