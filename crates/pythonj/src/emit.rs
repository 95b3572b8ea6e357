//! The emitter: writes the target class with deterministic ordering and
//! tracks indentation depth.

use std::collections::BTreeSet;

use crate::ir::Stmt;
use crate::pool::ConstantPool;

#[derive(Debug, Default)]
pub struct IndentedWriter {
    buf: String,
    indent: usize,
}

impl IndentedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blank `line` writes a blank output line without indentation.
    /// A line starting with `}` decrements depth before writing; a line
    /// ending with `{` increments depth after writing.
    pub fn write_line(&mut self, line: &str) {
        if line.is_empty() {
            self.buf.push('\n');
            return;
        }
        if line.starts_with('}') {
            self.indent = self.indent.saturating_sub(1);
        }
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(line);
        self.buf.push('\n');
        if line.ends_with('{') {
            self.indent += 1;
        }
    }

    /// Consume the writer, asserting the indentation returned to zero.
    pub fn finish(self) -> String {
        assert_eq!(self.indent, 0, "unbalanced braces in emitted source");
        self.buf
    }
}

/// A lowered `def`: the nested class's literal header lines (class/ctor/
/// `call` override signature), its body as IR, and the matching pair of
/// closing braces. Stored as IR rather than pre-rendered text so the whole
/// file still runs through one continuous [`IndentedWriter`], exactly like
/// every other part of the class body.
pub struct FunctionIr {
    pub header_lines: Vec<String>,
    pub body: Vec<Stmt>,
}

/// A translated unit's emitted artifacts, ready to be written in
/// deterministic order by [`Emitter::emit`].
pub struct TranslationUnit {
    pub class_name: String,
    pub pool: ConstantPool,
    pub functions: std::collections::BTreeMap<String, FunctionIr>,
    pub global_names: BTreeSet<String>,
    pub global_code: Vec<Stmt>,
}

pub struct Emitter;

impl Emitter {
    pub fn emit(unit: &TranslationUnit) -> String {
        let mut w = IndentedWriter::new();
        w.write_line(&format!("public final class {} {{", unit.class_name));
        unit.pool.emit(&mut w);
        w.write_line("");
        for func in unit.functions.values() {
            for line in &func.header_lines {
                w.write_line(line);
            }
            for stmt in &func.body {
                stmt.render(&mut w);
            }
            w.write_line("}");
            w.write_line("}");
            w.write_line("");
        }
        for name in &unit.global_names {
            w.write_line(&format!("private static PyObject pyglobal_{name} = PyNone.singleton;"));
        }
        w.write_line("");
        w.write_line("public static void main(String[] args) {");
        for stmt in &unit.global_code {
            stmt.render(&mut w);
        }
        w.write_line("}");
        w.write_line("}");
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_not_indented() {
        let mut w = IndentedWriter::new();
        w.write_line("if (true) {");
        w.write_line("");
        w.write_line("}");
        assert_eq!(w.finish(), "if (true) {\n\n}\n");
    }

    #[test]
    fn nested_braces_indent_progressively() {
        let mut w = IndentedWriter::new();
        w.write_line("public final class Foo {");
        w.write_line("public static void main(String[] args) {");
        w.write_line("System.out.println();");
        w.write_line("}");
        w.write_line("}");
        let out = w.finish();
        assert_eq!(
            out,
            "public final class Foo {\n    public static void main(String[] args) {\n        System.out.println();\n    }\n}\n"
        );
    }

    #[test]
    #[should_panic]
    fn unbalanced_braces_panic_on_finish() {
        let mut w = IndentedWriter::new();
        w.write_line("if (true) {");
        w.finish();
    }

    #[test]
    fn emit_orders_globals_sorted_by_name() {
        let mut globals = BTreeSet::new();
        globals.insert("zebra".to_string());
        globals.insert("apple".to_string());
        let unit = TranslationUnit {
            class_name: "Foo".to_string(),
            pool: ConstantPool::new(),
            functions: std::collections::BTreeMap::new(),
            global_names: globals,
            global_code: vec![],
        };
        let out = Emitter::emit(&unit);
        assert!(out.find("pyglobal_apple").unwrap() < out.find("pyglobal_zebra").unwrap());
    }
}
