//! **asmsift** filters the assembly listing a C/C++ compiler produced for
//! one translation unit down to the function bodies that originate in a
//! chosen source file, and correlates the result with source lines.
//!
//! The annotator is a regex driven state machine working in two sweeps
//! over the input: the first pass collects symbols, per-routine label
//! references, and the `.file` table, and disambiguates which file
//! indices denote the annotation target across the GCC and Clang
//! dialects; the second pass emits only the content reachable from the
//! target file's routines and records which source line produced which
//! range of output lines. Symbol demangling is available behind the
//! `demangle` feature.
//!
//! The entry point is [`annotate`]:
//!
//! ```no_run
//! use asmsift::annotate;
//! use asmsift::AnnotateOpts;
//!
//! # fn main() -> asmsift::Result<()> {
//! let listing = std::fs::read_to_string("listing.s")?;
//! let result = annotate(&listing, &AnnotateOpts::default(), None)?;
//! for line in &result.lines {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Output lines are zero-copy views into the input buffer, which hence
//! has to outlive the [`Annotation`];
//! [`Annotation::apply_demanglings`] is the explicit escape hatch to an
//! owned representation.

#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes
)]

mod annotate;
mod demangle;
mod error;
pub mod helper;
mod lines;
mod log;
mod rules;
mod state;
mod sweep;
mod util;

pub use crate::annotate::annotate;
pub use crate::annotate::AnnotateOpts;
pub use crate::annotate::Annotation;
pub use crate::annotate::Demangling;
pub use crate::annotate::LineMapping;
pub use crate::error::Error;
pub use crate::error::ErrorExt;
pub use crate::error::ErrorKind;
pub use crate::error::Result;
