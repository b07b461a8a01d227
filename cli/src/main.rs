//! A command line utility for the `asmsift` library.

mod args;
mod ccj;
mod driver;

use std::fs::read_to_string;
use std::io::read_to_string as read_stdin_to_string;
use std::io::stderr;
use std::io::stdin;
use std::io::IsTerminal as _;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context as _;
use anyhow::Result;

use clap::Parser as _;

use serde::Serialize;

use tracing::info;
use tracing::subscriber::set_global_default as set_global_subscriber;
use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::FmtSubscriber;

use asmsift::annotate;
use asmsift::Annotation;

use crate::args::Args;


#[derive(Serialize)]
struct JsonMapping {
    source_line: usize,
    asm_start: usize,
    asm_end: usize,
}

#[derive(Serialize)]
struct JsonOutput {
    assembly: Vec<String>,
    line_mappings: Vec<JsonMapping>,
}

fn print_result(result: &Annotation<'_>, json: bool) -> Result<()> {
    let assembly = result.apply_demanglings();
    if json {
        let output = JsonOutput {
            assembly,
            line_mappings: result
                .linemap
                .iter()
                .map(|mapping| JsonMapping {
                    source_line: mapping.source_line,
                    asm_start: mapping.asm_start,
                    asm_end: mapping.asm_end,
                })
                .collect(),
        };
        let rendered =
            serde_json::to_string(&output).context("failed to serialize annotation result")?;
        println!("{rendered}");
    } else {
        for line in assembly {
            println!("{line}");
        }
    }
    Ok(())
}

/// Acquire the assembly to annotate, along with the annotation target it
/// implies, if any.
fn acquire_input(args: &Args) -> Result<(String, Option<PathBuf>)> {
    if let Some(path) = &args.asm_file {
        info!("reading assembly from {}", path.display());
        let input = read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok((input, None))
    }

    let stdin = stdin();
    if !stdin.is_terminal() {
        info!("reading assembly from standard input");
        let input = read_stdin_to_string(stdin).context("failed to read standard input")?;
        return Ok((input, None))
    }

    if let Some(source) = &args.source_file {
        let ccj_path = args
            .compile_commands
            .clone()
            .or_else(ccj::find_ccj)
            .context("no compile_commands.json found; point --ccj at one")?;
        info!("using compile commands from {}", ccj_path.display());

        let cmd = ccj::infer(&ccj_path, source)?.with_context(|| {
            format!(
                "no compile command found for {} in {}",
                source.display(),
                ccj_path.display()
            )
        })?;
        info!("compiling {}", cmd.file.display());
        let assembly = driver::get_asm(&cmd)?;
        let target = asmsift::helper::absolutize(source)?;
        return Ok((assembly, Some(target)))
    }

    bail!("nothing to annotate: pipe assembly in, or pass --asm-file or a source file")
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = match args.verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_timer(SystemTime)
        .with_writer(stderr)
        .finish();
    let () = set_global_subscriber(subscriber).context("failed to set tracing subscriber")?;

    let (input, inferred_target) = acquire_input(&args)?;
    let target = args.target_file.clone().or(inferred_target);

    let opts = args.annotate_opts();
    let result = annotate(&input, &opts, target.as_deref())
        .context("failed to annotate assembly")?;
    print_result(&result, args.json)
}
