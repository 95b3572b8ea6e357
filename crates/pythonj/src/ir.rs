//! The target-language IR: a closed family of expression and statement
//! nodes that know how to render themselves as JVM source text.
//!
//! A closed sum type is the idiomatic shape here: every new variant is an
//! exhaustiveness obligation at compile time, rather than an abstract base
//! class with subclasses.

use crate::emit::IndentedWriter;
use crate::peephole;

/// A target-language expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An integer literal with an explicit suffix (`"L"` for the `long`
    /// literals the constant pool emits, `""` for plain `int` literals such
    /// as byte-array elements).
    IntLiteral { value: i64, suffix: &'static str },
    /// A string literal carrying the original text; escaped on render.
    StrLiteral(String),
    Ident(String),
    Field { obj: Box<Expr>, field: String },
    Index { obj: Box<Expr>, index: Box<Expr> },
    Unary { op: &'static str, operand: Box<Expr> },
    Binary { op: &'static str, lhs: Box<Expr>, rhs: Box<Expr> },
    Cond { cond: Box<Expr>, t: Box<Expr>, f: Box<Expr> },
    New { ty: String, args: Vec<Expr> },
    NewArray { ty: String, elts: Vec<Expr> },
    MethodCall { obj: Box<Expr>, method: String, args: Vec<Expr> },
    /// Assignment used as an expression (e.g. the single-evaluation temp
    /// caching chained comparisons and boolean operators rely on).
    Assign(Box<Expr>, Box<Expr>),
}

pub fn ident(name: impl Into<String>) -> Expr {
    Expr::Ident(name.into())
}

pub fn field(obj: Expr, name: impl Into<String>) -> Expr {
    Expr::Field { obj: Box::new(obj), field: name.into() }
}

pub fn index(obj: Expr, idx: Expr) -> Expr {
    Expr::Index { obj: Box::new(obj), index: Box::new(idx) }
}

pub fn unary(op: &'static str, operand: Expr) -> Expr {
    Expr::Unary { op, operand: Box::new(operand) }
}

pub fn binary(op: &'static str, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

pub fn cond(cond_: Expr, t: Expr, f: Expr) -> Expr {
    Expr::Cond { cond: Box::new(cond_), t: Box::new(t), f: Box::new(f) }
}

pub fn new_object(ty: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::New { ty: ty.into(), args }
}

pub fn new_array(ty: impl Into<String>, elts: Vec<Expr>) -> Expr {
    Expr::NewArray { ty: ty.into(), elts }
}

pub fn method_call(obj: Expr, method: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::MethodCall { obj: Box::new(obj), method: method.into(), args }
}

pub fn assign_expr(lhs: Expr, rhs: Expr) -> Expr {
    Expr::Assign(Box::new(lhs), Box::new(rhs))
}

pub fn py_none() -> Expr {
    field(ident("PyNone"), "singleton")
}

pub fn java_null() -> Expr {
    ident("null")
}

/// Fold `a op b op c ...` left-associatively. Requires at least one operand.
pub fn chained_binary_op(op: &'static str, mut exprs: Vec<Expr>) -> Expr {
    assert!(!exprs.is_empty());
    let mut expr = exprs.remove(0);
    for term in exprs {
        expr = binary(op, expr, term);
    }
    expr
}

const ESCAPES: &[(char, &str)] = &[
    ('"', "\\\""),
    ('\\', "\\\\"),
    ('\n', "\\n"),
    ('\r', "\\r"),
    ('\t', "\\t"),
    ('\u{8}', "\\b"),
    ('\u{c}', "\\f"),
];

/// Escape a source string into a JVM string literal. Surrogate code points
/// are rejected outright; only the BMP is supported (astral code points are
/// a diagnosed error at the call site, not here).
pub fn java_string_literal(s: &str) -> Result<String, String> {
    let mut out = String::from("\"");
    for c in s.chars() {
        if let Some((_, esc)) = ESCAPES.iter().find(|(ch, _)| *ch == c) {
            out.push_str(esc);
            continue;
        }
        let o = c as u32;
        if (0xD800..=0xDFFF).contains(&o) {
            return Err(format!("cannot encode string containing surrogate code points: {s:?}"));
        }
        if (0x20..=0x7E).contains(&o) {
            out.push(c);
        } else if o <= 0xFFFF {
            out.push_str(&format!("\\u{o:04x}"));
        } else {
            return Err(format!("astral code point U+{o:06X} is unimplemented"));
        }
    }
    out.push('"');
    Ok(out)
}

impl Expr {
    pub fn render(&self) -> String {
        match self {
            Expr::IntLiteral { value, suffix } => format!("{value}{suffix}"),
            Expr::StrLiteral(s) => java_string_literal(s).unwrap_or_else(|_| "\"\"".to_string()),
            Expr::Ident(name) => name.clone(),
            Expr::Field { obj, field } => format!("{}.{field}", obj.render()),
            Expr::Index { obj, index } => format!("{}[{}]", obj.render(), index.render()),
            Expr::Unary { op, operand } => format!("({op}{})", operand.render()),
            Expr::Binary { op, lhs, rhs } => format!("({} {op} {})", lhs.render(), rhs.render()),
            Expr::Cond { cond, t, f } => format!("({} ? {} : {})", cond.render(), t.render(), f.render()),
            Expr::New { ty, args } => {
                format!("new {ty}({})", render_args(args))
            }
            Expr::NewArray { ty, elts } => {
                format!("new {ty}[] {{{}}}", render_args(elts))
            }
            Expr::MethodCall { obj, method, args } => {
                format!("{}.{method}({})", obj.render(), render_args(args))
            }
            Expr::Assign(lhs, rhs) => format!("({} = {})", lhs.render(), rhs.render()),
        }
    }
}

fn render_args(args: &[Expr]) -> String {
    args.iter().map(Expr::render).collect::<Vec<_>>().join(", ")
}

/// A catch clause. The bound Java variable (`var`) is always a compiler-
/// generated temp; an `as name` in the source becomes an ordinary
/// assignment statement as the first statement of `body`, not a field here.
#[derive(Debug, Clone)]
pub struct Catch {
    pub exc_type: String,
    pub var: String,
    pub body: Vec<Stmt>,
}

/// A target-language statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl { ty: String, name: String, value: Option<Expr> },
    Assign { lhs: Expr, rhs: Expr },
    /// Restricted at construction time to constructor/method-call
    /// expressions, the only call-like forms the target grammar allows as
    /// statements.
    ExprStmt(Expr),
    Break(Option<String>),
    Continue,
    Return(Expr),
    Throw(Expr),
    If { cond: Expr, body: Vec<Stmt>, orelse: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    For {
        init_ty: String,
        init_name: String,
        init_value: Expr,
        cond: Expr,
        incr_name: String,
        incr_value: Expr,
        body: Vec<Stmt>,
    },
    Try { body: Vec<Stmt>, catch: Option<Catch>, finally_body: Vec<Stmt> },
    Labeled { label: String, body: Vec<Stmt> },
}

fn block_ends_control_flow(body: &[Stmt]) -> bool {
    body.last().is_some_and(Stmt::ends_control_flow)
}

/// Drop every statement following a control-flow terminator within `body`.
pub fn simplify_block(mut body: Vec<Stmt>) -> Vec<Stmt> {
    if let Some(pos) = body.iter().position(Stmt::ends_control_flow) {
        body.truncate(pos + 1);
    }
    body
}

impl Stmt {
    pub fn var_decl(ty: impl Into<String>, name: impl Into<String>, value: Option<Expr>) -> Stmt {
        Stmt::VarDecl { ty: ty.into(), name: name.into(), value }
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Stmt {
        Stmt::Assign { lhs, rhs }
    }

    /// `cond`/`body`/`orelse` must already have had `bool_value` applied to
    /// `cond` by the caller; this applies the constant-condition peephole
    /// and the block-simplification invariant.
    pub fn if_stmt(cond: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Vec<Stmt> {
        let body = simplify_block(body);
        let orelse = simplify_block(orelse);
        peephole::if_stmt(cond, body, orelse)
    }

    pub fn while_stmt(cond: Expr, body: Vec<Stmt>) -> Vec<Stmt> {
        let body = simplify_block(body);
        peephole::while_stmt(cond, body)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_stmt(
        init_ty: impl Into<String>,
        init_name: impl Into<String>,
        init_value: Expr,
        cond: Expr,
        incr_name: impl Into<String>,
        incr_value: Expr,
        body: Vec<Stmt>,
    ) -> Stmt {
        Stmt::For {
            init_ty: init_ty.into(),
            init_name: init_name.into(),
            init_value,
            cond,
            incr_name: incr_name.into(),
            incr_value,
            body: simplify_block(body),
        }
    }

    pub fn try_stmt(body: Vec<Stmt>, catch: Option<Catch>, finally_body: Vec<Stmt>) -> Stmt {
        let body = simplify_block(body);
        let catch = catch.map(|c| Catch { body: simplify_block(c.body), ..c });
        let finally_body = simplify_block(finally_body);
        Stmt::Try { body, catch, finally_body }
    }

    pub fn labeled(label: impl Into<String>, body: Vec<Stmt>) -> Stmt {
        Stmt::Labeled { label: label.into(), body: simplify_block(body) }
    }

    pub fn ends_control_flow(&self) -> bool {
        match self {
            Stmt::Return(_) | Stmt::Throw(_) | Stmt::Break(_) | Stmt::Continue => true,
            Stmt::If { body, orelse, .. } => {
                !orelse.is_empty() && block_ends_control_flow(body) && block_ends_control_flow(orelse)
            }
            Stmt::Try { body, catch, finally_body } => {
                if block_ends_control_flow(finally_body) {
                    true
                } else if let Some(catch) = catch {
                    block_ends_control_flow(body) && block_ends_control_flow(&catch.body)
                } else {
                    false
                }
            }
            Stmt::VarDecl { .. }
            | Stmt::Assign { .. }
            | Stmt::ExprStmt(_)
            | Stmt::While { .. }
            | Stmt::For { .. }
            | Stmt::Labeled { .. } => false,
        }
    }

    pub fn render(&self, w: &mut IndentedWriter) {
        match self {
            Stmt::VarDecl { ty, name, value } => match value {
                Some(v) => w.write_line(&format!("{ty} {name} = {};", v.render())),
                None => w.write_line(&format!("{ty} {name};")),
            },
            Stmt::Assign { lhs, rhs } => w.write_line(&format!("{} = {};", lhs.render(), rhs.render())),
            Stmt::ExprStmt(e) => w.write_line(&format!("{};", e.render())),
            Stmt::Break(None) => w.write_line("break;"),
            Stmt::Break(Some(label)) => w.write_line(&format!("break {label};")),
            Stmt::Continue => w.write_line("continue;"),
            Stmt::Return(e) => w.write_line(&format!("return {};", e.render())),
            Stmt::Throw(e) => w.write_line(&format!("throw {};", e.render())),
            Stmt::If { cond, body, orelse } => {
                w.write_line(&format!("if ({}) {{", cond.render()));
                for s in body {
                    s.render(w);
                }
                if !orelse.is_empty() {
                    w.write_line("} else {");
                    for s in orelse {
                        s.render(w);
                    }
                }
                w.write_line("}");
            }
            Stmt::While { cond, body } => {
                w.write_line(&format!("while ({}) {{", cond.render()));
                for s in body {
                    s.render(w);
                }
                w.write_line("}");
            }
            Stmt::For { init_ty, init_name, init_value, cond, incr_name, incr_value, body } => {
                w.write_line(&format!(
                    "for ({init_ty} {init_name} = {}; {}; {incr_name} = {}) {{",
                    init_value.render(),
                    cond.render(),
                    incr_value.render()
                ));
                for s in body {
                    s.render(w);
                }
                w.write_line("}");
            }
            Stmt::Try { body, catch, finally_body } => {
                w.write_line("try {");
                for s in body {
                    s.render(w);
                }
                if let Some(catch) = catch {
                    w.write_line(&format!("}} catch ({} {}) {{", catch.exc_type, catch.var));
                    for s in &catch.body {
                        s.render(w);
                    }
                }
                if !finally_body.is_empty() {
                    w.write_line("} finally {");
                    for s in finally_body {
                        s.render(w);
                    }
                }
                w.write_line("}");
            }
            Stmt::Labeled { label, body } => {
                w.write_line(&format!("{label}: {{"));
                for s in body {
                    s.render(w);
                }
                w.write_line("}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_escaping_matches_char_escape_table() {
        assert_eq!(java_string_literal("a\nb").unwrap(), "\"a\\nb\"");
        assert_eq!(java_string_literal("\"\\").unwrap(), "\"\\\"\\\\\"");
    }

    #[test]
    fn non_ascii_bmp_is_escaped_as_unicode() {
        assert_eq!(java_string_literal("\u{00e9}").unwrap(), "\"\\u00e9\"");
    }

    #[test]
    fn block_simplification_truncates_after_terminator() {
        let body = vec![Stmt::Return(py_none()), Stmt::Continue];
        assert_eq!(simplify_block(body).len(), 1);
    }

    #[test]
    fn if_with_non_terminating_else_does_not_end_control_flow() {
        let if_stmt = Stmt::If {
            cond: ident("true"),
            body: vec![Stmt::Return(py_none())],
            orelse: vec![],
        };
        assert!(!if_stmt.ends_control_flow());
    }

    #[test]
    fn if_with_both_arms_terminating_ends_control_flow() {
        let if_stmt = Stmt::If {
            cond: ident("true"),
            body: vec![Stmt::Return(py_none())],
            orelse: vec![Stmt::Throw(py_none())],
        };
        assert!(if_stmt.ends_control_flow());
    }

    #[test]
    fn try_with_terminating_finally_ends_control_flow() {
        let t = Stmt::Try {
            body: vec![Stmt::ExprStmt(ident("x"))],
            catch: None,
            finally_body: vec![Stmt::Return(py_none())],
        };
        assert!(t.ends_control_flow());
    }

    #[test]
    fn chained_binary_op_folds_left_associatively() {
        let e = chained_binary_op("&&", vec![ident("a"), ident("b"), ident("c")]);
        assert_eq!(e.render(), "((a && b) && c)");
    }
}
