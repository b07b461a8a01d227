//! Spawning the compiler to produce an annotated listing's input.

use std::process::Command;
use std::process::Stdio;

use anyhow::bail;
use anyhow::Context as _;
use anyhow::Result;

use tracing::debug;
use tracing::info;

use crate::ccj::CompileCommand;


/// A rewritten compiler invocation producing assembly on stdout.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// The compiler executable.
    pub compiler: String,
    /// Its arguments.
    pub args: Vec<String>,
}


/// Rewrite a stored compile command into one that emits assembly with
/// minimal debug info on standard output: output specifiers are dropped,
/// `-c` becomes `-S`, and `-g1 -o -` is appended.
pub fn rewrite_command(cmd: &CompileCommand) -> Result<Invocation> {
    let mut tokens = cmd.command.split_whitespace();
    let compiler = tokens
        .next()
        .with_context(|| format!("empty compile command for {}", cmd.file.display()))?
        .to_string();

    let mut args = Vec::new();
    let mut had_dash_c = false;
    while let Some(token) = tokens.next() {
        if token == "-o" {
            // Drop the output specifier together with its argument.
            let _output = tokens.next();
            continue
        }
        if token.len() > 2 && token.starts_with("-o") {
            continue
        }
        if token == "-c" {
            args.push("-S".to_string());
            had_dash_c = true;
            continue
        }
        args.push(token.to_string());
    }

    args.push("-g1".to_string());
    if !had_dash_c {
        args.push("-S".to_string());
        args.push(cmd.file.display().to_string());
    }
    args.push("-o".to_string());
    args.push("-".to_string());

    Ok(Invocation { compiler, args })
}

/// Run the (rewritten) compiler of `cmd` in its stored directory and
/// capture the assembly it writes to standard output.
pub fn get_asm(cmd: &CompileCommand) -> Result<String> {
    let invocation = rewrite_command(cmd)?;
    info!(
        "running {} {}",
        invocation.compiler,
        invocation.args.join(" ")
    );
    debug!("in {}", cmd.directory.display());

    let output = Command::new(&invocation.compiler)
        .args(&invocation.args)
        .current_dir(&cmd.directory)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to spawn {}", invocation.compiler))?;

    if !output.status.success() {
        bail!(
            "compiler failed with {}:\n{}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).context("compiler emitted non-UTF-8 assembly")
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;


    fn command(text: &str) -> CompileCommand {
        CompileCommand {
            directory: PathBuf::from("/proj"),
            command: text.to_string(),
            file: PathBuf::from("/proj/source.cpp"),
        }
    }

    /// `-c` turns into `-S` and the output goes to stdout.
    #[test]
    fn rewrite_object_compilation() {
        let invocation =
            rewrite_command(&command("g++ -std=c++17 -c source.cpp -o build/source.o")).unwrap();
        assert_eq!(invocation.compiler, "g++");
        assert_eq!(
            invocation.args,
            vec!["-std=c++17", "-S", "source.cpp", "-g1", "-o", "-"]
        );
    }

    /// Without `-c` the source file is appended along with `-S`.
    #[test]
    fn rewrite_plain_compilation() {
        let invocation = rewrite_command(&command("clang++ -O2")).unwrap();
        assert_eq!(invocation.compiler, "clang++");
        assert_eq!(
            invocation.args,
            vec!["-O2", "-g1", "-S", "/proj/source.cpp", "-o", "-"]
        );
    }

    /// Attached output specifiers (`-ofoo`) are dropped without eating
    /// the following argument.
    #[test]
    fn rewrite_attached_output() {
        let invocation =
            rewrite_command(&command("g++ -c -obuild/source.o source.cpp")).unwrap();
        assert_eq!(
            invocation.args,
            vec!["-S", "source.cpp", "-g1", "-o", "-"]
        );
    }

    /// An empty command is rejected.
    #[test]
    fn rewrite_empty_command() {
        assert!(rewrite_command(&command("   ")).is_err());
    }
}
