//! pythonj - a source-to-source compiler from a controlled Python subset to
//! statically-typed JVM source code.
//!
//! Each input module is parsed by `ruff_python_parser` (consumed as an AST,
//! never as raw text — see [`lower`]'s `ident_expr`/expression lowering),
//! lowered by [`lower::Lowerer`] into the tree-shaped IR in [`ir`], and
//! rendered by [`emit::Emitter`] into one `.java` source file containing a
//! single public final class. The emitted class depends on an external,
//! hand-written runtime library (`Runtime`, `PyObject`, `PyInt`, `PyList`,
//! `PyDict`, ...) whose interface is fixed but whose implementation is
//! out of scope for this crate.
//!
//! # Example
//!
//! ```
//! let translation = pythonj::translate("fib.py", "print(1 + 1)\n").unwrap();
//! assert!(translation.diagnostics.is_empty());
//! assert!(translation.source.contains("public final class fib"));
//! ```

mod builtins;
mod diagnostic;
mod emit;
mod error;
mod ir;
mod lower;
mod peephole;
mod pool;

pub use diagnostic::{Diagnostic, Span};
pub use error::{Error, Result};

use ruff_python_parser::parse_module;

/// Every `Runtime.<x>` / bare-runtime-type identifier the lowering visitor
/// and emitter can produce, per §6's interface table. Kept as a single
/// named constant purely for internal consistency checking: a test asserts
/// every such identifier the emitter actually writes appears here, catching
/// a typo in a generated symbol name at test time rather than at `javac`
/// time (the runtime library itself is out of scope for this crate).
pub const RUNTIME_SYMBOLS: &[&str] = &[
    "PyObject",
    "PyBool",
    "PyNone",
    "PyInt",
    "PyString",
    "PyBytes",
    "PyList",
    "PyTuple",
    "PySet",
    "PyDict",
    "PySlice",
    "PyUserFunction",
    "PyRaise",
    "PyAssertionError",
    "Runtime",
    "addStarToArrayList",
    "addPyObjectToArrayList",
    "arrayListToArray",
    "nextRequireNonNull",
    "nextRequireNull",
    "requireKwStrings",
    "raiseUserExactArgs",
];

/// The result of translating one source file: the emitted Java source text
/// plus any recoverable diagnostics collected along the way. Per §7, a
/// non-empty `diagnostics` means the translation is incomplete (placeholder
/// expressions stand in for what couldn't be lowered) and the caller must
/// treat the unit as failed before invoking the target compiler.
pub struct Translation {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Derive the output class name from an input path's file stem. The target
/// grammar requires a valid Java identifier; this crate assumes the driver
/// is given a well-formed module name and does not sanitize stems that
/// aren't one.
fn class_name_from_path(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Parse `source` (attributed to `path` for diagnostics) and translate it
/// into one JVM-source translation unit. Intrinsics (`__pythonj_null__`,
/// `__pythonj_next__`) are disabled, as they are not valid Python and exist
/// only for hand-written interop shims exercised directly against
/// [`translate_with_intrinsics`].
pub fn translate(path: &str, source: &str) -> Result<Translation> {
    translate_with_intrinsics(path, source, false)
}

/// As [`translate`], but permitting the closed set of compiler-internal
/// intrinsic call forms described in the GLOSSARY.
pub fn translate_with_intrinsics(path: &str, source: &str, intrinsics_allowed: bool) -> Result<Translation> {
    let parsed = parse_module(source).map_err(|e| Error::Parse(format!("{path}: {e}")))?;
    let mut lowerer = lower::Lowerer::new(path, source, intrinsics_allowed);
    lowerer.lower_module(parsed.syntax());
    let (unit, diagnostics) = lowerer.into_parts(class_name_from_path(path));
    let source = emit::Emitter::emit(&unit);
    Ok(Translation { source, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_symbols_table_has_no_duplicates() {
        let mut sorted = RUNTIME_SYMBOLS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), RUNTIME_SYMBOLS.len());
    }

    #[test]
    fn translate_rejects_unparseable_source() {
        let err = translate("broken.py", "def f(:\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn translate_derives_class_name_from_stem() {
        let t = translate("tests/fib.py", "x = 1\n").unwrap();
        assert!(t.source.contains("public final class fib {"));
    }

    /// Every `Runtime.<x>(` call the emitter can produce must name a symbol
    /// in [`RUNTIME_SYMBOLS`] — a typo here would only otherwise surface at
    /// `javac` time, against a runtime library this crate doesn't own.
    #[test]
    fn every_emitted_runtime_call_is_a_known_symbol() {
        let src = "a, b = [*[1], 2]\nd = {**{1: 2}}\nprint(*[1], x=1)\nfor i in [1]:\n    pass\n";
        let t = translate("rt.py", src).unwrap();
        for m in t.source.match_indices("Runtime.") {
            let rest = &t.source[m.0 + "Runtime.".len()..];
            let name: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
            assert!(RUNTIME_SYMBOLS.contains(&name.as_str()), "unknown Runtime symbol: {name}");
        }
    }
}
