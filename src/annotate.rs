//! The two-pass annotator.

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use crate::demangle;
use crate::lines::lines;
use crate::log;
use crate::rules::Rule;
use crate::state::FileInfo;
use crate::state::ParserState;
use crate::sweep::sweep;
use crate::sweep::Cursor;
use crate::sweep::Spans;
use crate::util;
use crate::Error;
use crate::ErrorExt as _;
use crate::Result;

// STABS type codes understood by the second pass.
const N_SLINE: usize = 68;
const N_SO: usize = 100;
const N_SOL: usize = 132;


/// Options controlling what [`annotate`] keeps and collects.
///
/// All options default to `false`.
#[derive(Clone, Debug, Default)]
pub struct AnnotateOpts {
    /// Keep assembler directives that no other rule claimed.
    pub preserve_directives: bool,
    /// Keep standalone comment lines.
    pub preserve_comments: bool,
    /// Include every routine, not just those of the target file.
    pub preserve_library_functions: bool,
    /// Keep labels even if nothing reachable references them.
    pub preserve_unused_labels: bool,
    /// Collect mangled/demangled symbol pairs for later substitution.
    pub demangle: bool,
}


/// A mapping from one source line to a contiguous range of output lines.
///
/// Both line numbers are 1-based and the range is inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineMapping {
    /// The source line the range originates from.
    pub source_line: usize,
    /// The first output line of the range.
    pub asm_start: usize,
    /// The last output line of the range.
    pub asm_end: usize,
}


/// A mangled symbol occurrence and its demangled form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Demangling<'input> {
    /// The mangled symbol, borrowing from the input buffer.
    pub mangled: &'input str,
    /// The demangled rendering.
    pub demangled: String,
}


/// The result of annotating one assembly listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotation<'input> {
    /// The surviving lines, borrowing from the input buffer.
    pub lines: Vec<&'input str>,
    /// Source-to-output line mappings, flattened and ordered.
    pub linemap: Vec<LineMapping>,
    /// Mangled/demangled pairs in order of appearance, one per
    /// occurrence. Empty unless demangling was requested.
    pub demanglings: Vec<Demangling<'input>>,
}

impl Annotation<'_> {
    /// Produce an owned copy of [`lines`][Self::lines] with all collected
    /// demanglings substituted in.
    ///
    /// Substitutions within a line are applied right to left so earlier
    /// offsets stay valid. Lines without demanglings are copied verbatim.
    pub fn apply_demanglings(&self) -> Vec<String> {
        let mut output = Vec::with_capacity(self.lines.len());
        let mut pending = self.demanglings.iter().peekable();

        for line in &self.lines {
            let line_start = line.as_ptr() as usize;
            let line_end = line_start + line.len();

            // Demanglings were collected in output order, so the ones
            // belonging to this line form a prefix of what is pending.
            let mut applicable = Vec::new();
            while let Some(demangling) = pending.peek() {
                let mangled_start = demangling.mangled.as_ptr() as usize;
                let mangled_end = mangled_start + demangling.mangled.len();
                if mangled_start >= line_start && mangled_end <= line_end {
                    applicable.push((mangled_start - line_start, *demangling));
                    let _consumed = pending.next();
                } else {
                    break
                }
            }

            if applicable.is_empty() {
                output.push((*line).to_string());
            } else {
                let mut owned = (*line).to_string();
                for (offset, demangling) in applicable.iter().rev() {
                    owned.replace_range(
                        *offset..*offset + demangling.mangled.len(),
                        &demangling.demangled,
                    );
                }
                output.push(owned);
            }
        }
        output
    }
}


/// Annotate one assembly listing.
///
/// Runs the first pass to build parser state, derives label reachability,
/// and re-sweeps to produce the filtered output together with the
/// source-line map. `target_file` names the source file whose functions
/// to keep; when absent, the translation unit's primary file (from the
/// DWARF5 `.file 0` entry) is used.
///
/// The returned [`Annotation`] borrows from `input`.
pub fn annotate<'input>(
    input: &'input str,
    opts: &AnnotateOpts,
    target_file: Option<&Path>,
) -> Result<Annotation<'input>> {
    log::debug!("annotating {} bytes of assembly", input.len());

    if input.is_empty() {
        return Ok(Annotation::default())
    }

    let mut state = ParserState::default();
    let intermediate = first_pass(input, &mut state, opts, target_file)?;
    let () = derive_used_labels(&mut state, opts);
    second_pass(&intermediate, &mut state, opts)
}


/// Record a numbered `.file` directive: maintain the compilation
/// directory, fix the effective annotation target, reconstruct the
/// entry's absolute path, and union it into the target record on a path
/// match.
fn record_file_entry<'input>(
    state: &mut ParserState<'input>,
    target: &mut Option<PathBuf>,
    spans: &Spans<'input>,
) -> Result<()> {
    let index = util::parse_num(spans.group(1).unwrap_or_default())
        .context("parsing .file index")?;
    let directory = spans.group(2);
    let name = match spans.group(3) {
        // Compilers reading standard input report the file as `-`.
        Some("-") | None => "<stdin>",
        Some(name) => name,
    };
    let md5 = spans.group(4);

    if index == 0 {
        // The DWARF5 entry 0 carries the compilation directory.
        if let Some(dir) = directory {
            state.compile_dir = util::absolutize(Path::new(dir))?;
        }
        match target.as_ref() {
            None => *target = Some(state.compile_dir.join(name)),
            Some(supplied) => *target = Some(util::absolutize(supplied)?),
        }
        log::debug!(
            "compile dir {}, annotation target {:?}",
            state.compile_dir.display(),
            target
        );
    }

    if state.compile_dir.as_os_str().is_empty() {
        return Err(Error::with_missing_compile_dir(
            "no DWARF5 .file 0 entry preceded this .file directive",
        ))
    }

    // Reconstruct the entry's absolute path. GCC and Clang disagree on
    // whether non-primary entries carry a directory field and on whether
    // it is absolute; resolving whatever is present against the
    // compilation directory converges on the same canonical path for
    // every dialect.
    let path = match directory {
        Some(dir) if Path::new(dir).is_absolute() => util::normalize(&Path::new(dir).join(name)),
        Some(dir) => util::normalize(&state.compile_dir.join(dir).join(name)),
        None => util::normalize(&state.compile_dir.join(name)),
    };
    let info = FileInfo {
        indices: BTreeSet::from([index]),
        directory,
        name,
        md5,
        path,
    };
    log::trace!(
        "file {index}: dir={:?} name={} md5={:?} -> {}",
        info.directory,
        info.name,
        info.md5,
        info.path.display()
    );

    if target.as_deref() == Some(info.path.as_path()) {
        log::debug!("file {index} matches the annotation target");
        match state.target_info.as_mut() {
            Some(existing) => {
                let _new = existing.indices.insert(index);
            }
            None => state.target_info = Some(info.clone()),
        }
    }
    let _previous = state.file_table.insert(index, info);
    Ok(())
}


/// The first pass: populate parser state and emit the intermediate line
/// sequence.
fn first_pass<'input>(
    input: &'input str,
    state: &mut ParserState<'input>,
    opts: &AnnotateOpts,
    target_file: Option<&Path>,
) -> Result<Vec<&'input str>> {
    let mut target = target_file.map(Path::to_path_buf);

    let output = sweep(lines(input), opts, |cursor| {
        let line = cursor.line();
        if !line.starts_with('\t') {
            if let Some(spans) = cursor.matches(Rule::LabelStart) {
                let label = spans.group(1).unwrap_or_default();
                if state.globals.contains(label) {
                    log::trace!("entering global {label}");
                    state.current_global = Some(label);
                }
                cursor.preserve();
            } else {
                cursor.kill();
            }
            return Ok(())
        }

        if let Some(current) = state.current_global {
            if let Some(opcode) = cursor.matches(Rule::HasOpcode) {
                let callees = state.routines.entry(current).or_default();
                let mut offset = opcode.whole().len();
                while let Some(reference) = cursor.matches_at(Rule::LabelReference, offset) {
                    callees.push(reference.whole());
                    offset += reference.whole().len();
                }
                cursor.preserve();
                return Ok(())
            }
        }

        if !opts.preserve_comments && cursor.matches(Rule::CommentOnly).is_some() {
            cursor.kill();
        } else if let Some(spans) = cursor
            .matches(Rule::DefinesGlobal)
            .or_else(|| cursor.matches(Rule::DefinesType))
        {
            let symbol = spans.group(1).unwrap_or_default();
            let _new = state.globals.insert(symbol);
            // No disposition; the default applies.
        } else if let Some(spans) = cursor.matches(Rule::FileDirective) {
            let () = record_file_entry(state, &mut target, &spans)?;
        } else if let Some(spans) = cursor.matches(Rule::LocDirective) {
            if let Some(current) = state.current_global {
                if let Some(target_info) = &state.target_info {
                    let index = util::parse_num(spans.group(1).unwrap_or_default())
                        .context("parsing .loc file index")?;
                    if target_info.indices.contains(&index) {
                        let _new = state.target_routines.insert(current);
                    }
                }
            }
            cursor.preserve();
        } else if cursor.matches(Rule::EndBlock).is_some() {
            state.current_global = None;
            cursor.preserve();
        } else {
            cursor.preserve();
        }
        Ok(())
    })?;

    if state.target_info.is_none() {
        let described = target
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<none>".to_string());
        return Err(Error::with_no_target_file(format!(
            "at end of first pass, none of {} .file entries matched annotation target '{described}'",
            state.file_table.len()
        )))
    }
    Ok(output)
}


/// Derive the reachable-label set: the selected routines plus their
/// immediate callees. No transitive closure is taken.
fn derive_used_labels(state: &mut ParserState<'_>, opts: &AnnotateOpts) {
    if opts.preserve_library_functions {
        for (label, callees) in &state.routines {
            let _new = state.used_labels.insert(*label);
            for callee in callees {
                let _new = state.used_labels.insert(*callee);
            }
        }
    } else {
        for label in &state.target_routines {
            let _new = state.used_labels.insert(*label);
            if let Some(callees) = state.routines.get(label) {
                for callee in callees {
                    let _new = state.used_labels.insert(*callee);
                }
            }
        }
    }
    log::debug!("{} labels reachable", state.used_labels.len());
}


/// Preserve the current line, scanning it for mangled symbols first when
/// demangling was requested.
fn preserve_scanned<'input>(
    cursor: &mut Cursor<'input, '_>,
    opts: &AnnotateOpts,
    demanglings: &mut Vec<Demangling<'input>>,
) {
    if opts.demangle {
        let () = demangle::collect_into(cursor.line(), demanglings);
    }
    cursor.preserve();
}


/// The second pass: re-sweep the intermediate sequence, keeping only
/// reachable content and recording source-line mappings.
fn second_pass<'input>(
    intermediate: &[&'input str],
    state: &mut ParserState<'input>,
    opts: &AnnotateOpts,
) -> Result<Annotation<'input>> {
    let mut reachable_label: Option<&'input str> = None;
    let mut source_linum: Option<usize> = None;
    let mut demanglings = Vec::new();

    let output = sweep(intermediate.iter().copied(), opts, |cursor| {
        let line = cursor.line();
        if !line.starts_with('\t') {
            if let Some(spans) = cursor.matches(Rule::LabelStart) {
                let label = spans.group(1).unwrap_or_default();
                if state.used_labels.contains(label) {
                    reachable_label = Some(label);
                    preserve_scanned(cursor, opts, &mut demanglings);
                } else if opts.preserve_unused_labels {
                    preserve_scanned(cursor, opts, &mut demanglings);
                } else {
                    cursor.kill();
                }
            }
            return Ok(())
        }

        if reachable_label.is_some() && cursor.matches(Rule::DataDefn).is_some() {
            preserve_scanned(cursor, opts, &mut demanglings);
        } else if reachable_label.is_some() && cursor.matches(Rule::HasOpcode).is_some() {
            if let Some(source_line) = source_linum {
                state.linemap.register(source_line, cursor.asm_linum());
            }
            preserve_scanned(cursor, opts, &mut demanglings);
        } else if let Some(spans) = cursor.matches(Rule::LocDirective) {
            let index = util::parse_num(spans.group(1).unwrap_or_default())
                .context("parsing .loc file index")?;
            source_linum = match &state.target_info {
                Some(info) if info.indices.contains(&index) => Some(
                    util::parse_num(spans.group(2).unwrap_or_default())
                        .context("parsing .loc source line")?,
                ),
                _ => None,
            };
        } else if let Some(spans) = cursor.matches(Rule::Stabn) {
            let stab_type = util::parse_num(spans.group(1).unwrap_or_default())
                .context("parsing .stabn type")?;
            match stab_type {
                N_SLINE => {
                    source_linum = Some(
                        util::parse_num(spans.group(2).unwrap_or_default())
                            .context("parsing .stabn line")?,
                    )
                }
                N_SO | N_SOL => source_linum = None,
                _ => (),
            }
        } else if cursor.matches(Rule::EndBlock).is_some() {
            reachable_label = None;
        }
        Ok(())
    })?;

    Ok(Annotation {
        lines: output,
        linemap: state.linemap.flatten(),
        demanglings,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::ErrorKind;


    /// A minimal GCC flavored listing for a translation unit read from
    /// standard input.
    const STDIN_LISTING: &str = concat!(
        "\t.file\t\"-\"\n",
        "\t.text\n",
        "\t.globl\tmain\n",
        "\t.type\tmain, @function\n",
        "main:\n",
        "\t.file 0 \"/proj\" \"-\"\n",
        "\t.loc 0 3 5\n",
        "\tmovl\t$42, %eax\n",
        "\tret\n",
        "\t.cfi_endproc\n",
    );

    /// Annotating a stdin compilation unit canonicalises `-` to
    /// `<stdin>` and converges file 0 and the target.
    #[test]
    fn stdin_canonicalisation() {
        let result = annotate(STDIN_LISTING, &AnnotateOpts::default(), None).unwrap();
        assert_eq!(result.lines, vec!["main:", "\tmovl\t$42, %eax", "\tret"]);
        assert_eq!(
            result.linemap,
            vec![LineMapping {
                source_line: 3,
                asm_start: 2,
                asm_end: 3,
            }]
        );
        assert!(result.demanglings.is_empty());
    }

    /// An explicit target that matches no `.file` entry fails with
    /// `NoTargetFile`.
    #[test]
    fn unmatched_target() {
        let err = annotate(
            STDIN_LISTING,
            &AnnotateOpts::default(),
            Some(Path::new("/absent/other.cpp")),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoTargetFile);
    }

    /// A listing without any numbered `.file` entry fails with
    /// `NoTargetFile`.
    #[test]
    fn no_file_directives() {
        let input = concat!(
            "\t.globl\tmain\n",
            "main:\n",
            "\tret\n",
        );
        let err = annotate(input, &AnnotateOpts::default(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoTargetFile);
    }

    /// A numbered `.file` entry before any `.file 0` fails with
    /// `MissingCompileDir`.
    #[test]
    fn no_compile_dir() {
        let input = "\t.file 1 \"source.cpp\"\n";
        let err = annotate(input, &AnnotateOpts::default(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCompileDir);
    }

    /// An overflowing file index fails with `MalformedNumber`.
    #[test]
    fn overflowing_file_index() {
        let input = "\t.file 99999999999999999999999999 \"source.cpp\"\n";
        let err = annotate(input, &AnnotateOpts::default(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedNumber);
    }

    /// Empty input produces an empty result instead of an error.
    #[test]
    fn empty_input() {
        let result = annotate("", &AnnotateOpts::default(), None).unwrap();
        assert!(result.lines.is_empty());
        assert!(result.linemap.is_empty());
        assert!(result.demanglings.is_empty());
    }

    /// STABS line markers drive the source line like `.loc` does. STABS
    /// output has no `.loc` to mark target routines, so routines are only
    /// selected via `preserve_library_functions`.
    #[test]
    fn stabs_line_markers() {
        let input = concat!(
            "\t.globl\tmain\n",
            "\t.type\tmain, @function\n",
            "main:\n",
            "\t.file 0 \"/proj\" \"source.cpp\"\n",
            "\t.stabn\t68,0,4,.LM0-main\n",
            "\tpushq\t%rbp\n",
            "\t.stabn\t100,0,0,.LM1-main\n",
            "\tret\n",
        );
        let opts = AnnotateOpts {
            preserve_library_functions: true,
            ..Default::default()
        };
        let result = annotate(input, &opts, None).unwrap();
        assert_eq!(result.lines, vec!["main:", "\tpushq\t%rbp", "\tret"]);
        // The N_SO marker clears the source line, so only `pushq` maps.
        assert_eq!(
            result.linemap,
            vec![LineMapping {
                source_line: 4,
                asm_start: 2,
                asm_end: 2,
            }]
        );
    }

    /// A label without an opcode body survives only under
    /// `preserve_unused_labels`.
    #[test]
    fn bare_label_preservation() {
        let input = concat!(
            "\t.globl\tmain\n",
            "\t.type\tmain, @function\n",
            "main:\n",
            "\t.file 0 \"/proj\" \"source.cpp\"\n",
            "\t.loc 0 1 1\n",
            "\tret\n",
            ".Ldangling:\n",
        );
        let result = annotate(input, &AnnotateOpts::default(), None).unwrap();
        assert!(!result.lines.contains(&".Ldangling:"));

        let opts = AnnotateOpts {
            preserve_unused_labels: true,
            ..Default::default()
        };
        let result = annotate(input, &opts, None).unwrap();
        assert!(result.lines.contains(&".Ldangling:"));
    }
}
