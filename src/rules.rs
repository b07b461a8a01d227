//! The catalogue of line patterns driving the sweeps.

use std::sync::LazyLock;

use regex::Regex;


/// The number of rules in the catalogue.
pub(crate) const RULE_COUNT: usize = 11;

/// The maximum number of capture groups any rule defines.
pub(crate) const MAX_GROUPS: usize = 4;


/// A named pattern from the rule catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rule {
    /// A label definition at the start of a line, e.g. `main:`.
    LabelStart,
    /// Leading whitespace followed by an instruction mnemonic.
    HasOpcode,
    /// A line carrying nothing but a comment.
    CommentOnly,
    /// A reference to an assembler label, e.g. `.LC0`.
    LabelReference,
    /// A `.globl`/`.global` directive.
    DefinesGlobal,
    /// A `.type <sym>, @function`/`%object` directive.
    DefinesType,
    /// A numbered `.file` directive.
    FileDirective,
    /// A `.loc <file> <line>` directive.
    LocDirective,
    /// A `.stabn <type>,0,<line>,...` directive (STABS debug info).
    Stabn,
    /// A directive ending the current block of code or data.
    EndBlock,
    /// A data definition directive, e.g. `.quad` or `.string`.
    DataDefn,
}

impl Rule {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}


/// The compiled rule catalogue.
///
/// A single immutable instance exists per process, created on first use;
/// retrieve it with [`rules`].
#[derive(Debug)]
pub(crate) struct RuleTable {
    regexes: [Regex; RULE_COUNT],
}

impl RuleTable {
    fn new() -> Self {
        let compile = |pattern| Regex::new(pattern).expect("rule catalogue pattern failed to compile");

        let regexes = [
            /* LabelStart */ compile(r"^([^:]+): *(?:#.*)?$"),
            /* HasOpcode */ compile(r"^\s+[A-Za-z]+\s*"),
            /* CommentOnly */ compile(r"^\s*(?:[#;@]|//|/\*.*\*/).*$"),
            /* LabelReference */ compile(r"\.[A-Za-z_][A-Za-z0-9$._]*"),
            /* DefinesGlobal */ compile(r"^\s*\.globa?l\s*([.A-Za-z_][A-Za-z0-9$._]*)"),
            /* DefinesType */ compile(r"^\s*\.type\s*(.*),\s*[%@]"),
            /* FileDirective */
            compile(r#"^\s*\.file\s+([0-9]+)(?:\s+"([^"]+)")?\s+"([^"]+)"(?:\s+md5\s+(0x[0-9a-fA-F]+))?"#),
            /* LocDirective */ compile(r"^\s*\.loc\s+([0-9]+)\s+([0-9]+)"),
            /* Stabn */ compile(r"\.stabn\s+([0-9]+),0,([0-9]+),"),
            /* EndBlock */ compile(r"\.(?:cfi_endproc|data|section|text)"),
            /* DataDefn */
            compile(r"^\s*\.(?:string|asciz|ascii|[1248]?byte|short|word|long|quad|value|zero)"),
        ];
        Self { regexes }
    }

    #[inline]
    pub(crate) fn regex(&self, rule: Rule) -> &Regex {
        &self.regexes[rule.index()]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Regex> {
        self.regexes.iter()
    }
}

/// Retrieve the process-wide rule catalogue.
pub(crate) fn rules() -> &'static RuleTable {
    static TABLE: LazyLock<RuleTable> = LazyLock::new(RuleTable::new);
    &TABLE
}
