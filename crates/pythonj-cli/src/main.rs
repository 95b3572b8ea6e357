//! Reads one `.py` file, invokes the `pythonj` library, writes the emitted
//! `.java` source next to it (or to `-o`), and maps a non-zero translator
//! diagnostic count to a non-zero process exit code.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(name = "pythonj", version, about = "Translate a Python subset to JVM source")]
struct Cli {
    /// Input .py file
    input: PathBuf,

    /// Output .java file (defaults to the input's stem + ".java" alongside it)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Allow compiler-internal intrinsic call forms (__pythonj_null__, __pythonj_next__)
    #[arg(long)]
    intrinsics: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let path = cli.input.to_string_lossy().into_owned();
    let translation = match pythonj::translate_with_intrinsics(&path, &source, cli.intrinsics) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    for diagnostic in &translation.diagnostics {
        eprintln!("{diagnostic}");
    }
    if !translation.diagnostics.is_empty() {
        eprintln!(
            "{}: {} error(s); aborting before JVM source was written",
            cli.input.display(),
            translation.diagnostics.len()
        );
        return ExitCode::FAILURE;
    }

    let output = cli.output.unwrap_or_else(|| cli.input.with_extension("java"));
    if let Err(e) = fs::write(&output, translation.source) {
        eprintln!("{}: {e}", output.display());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
