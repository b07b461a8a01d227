use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;

use asmsift::AnnotateOpts;


/// A command line utility for filtering and annotating compiler
/// assembly.
///
/// Assembly is read from standard input or `--asm-file`; alternatively a
/// source file can be named, in which case its translation unit is
/// located through a compile commands database and compiled on the fly.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// The source file to compile and annotate, resolved through the
    /// compile commands database.
    pub source_file: Option<PathBuf>,
    /// Read assembly from a file instead of compiling or reading
    /// standard input.
    #[arg(long)]
    pub asm_file: Option<PathBuf>,
    /// The compile_commands.json database to consult (defaults to the
    /// one in the current directory).
    #[arg(long = "ccj", alias = "compile-commands")]
    pub compile_commands: Option<PathBuf>,
    /// The source file whose functions to keep (defaults to the
    /// translation unit's primary file).
    #[arg(long)]
    pub target_file: Option<PathBuf>,
    /// Keep assembler directives that no other rule claimed.
    #[arg(long)]
    pub preserve_directives: bool,
    /// Keep standalone comment lines.
    #[arg(long)]
    pub preserve_comments: bool,
    /// Keep every routine, not just the ones of the target file.
    #[arg(long)]
    pub preserve_library_functions: bool,
    /// Keep labels even if nothing reachable references them.
    #[arg(long)]
    pub preserve_unused_labels: bool,
    /// Demangle C++ and Rust symbols in the output.
    #[arg(long)]
    pub demangle: bool,
    /// Emit JSON instead of plain assembly lines.
    #[arg(long)]
    pub json: bool,
    /// Increase verbosity (can be supplied multiple times).
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Collect the annotation options the flags describe.
    pub fn annotate_opts(&self) -> AnnotateOpts {
        AnnotateOpts {
            preserve_directives: self.preserve_directives,
            preserve_comments: self.preserve_comments,
            preserve_library_functions: self.preserve_library_functions,
            preserve_unused_labels: self.preserve_unused_labels,
            demangle: self.demangle,
        }
    }
}
