//! The lowering visitor: walks a parsed Python module and accumulates a
//! [`crate::emit::TranslationUnit`].
//!
//! Function scopes save and restore their own `names`/`code`/
//! `explicit_globals` on entry and exit rather than aliasing a pair of
//! mutable fields back and forth, which keeps every field singly owned
//! rather than rebound out from under whatever still holds a reference
//! to it.

use std::collections::{BTreeMap, BTreeSet};

use ruff_python_ast as ast;
use ruff_text_size::{Ranged, TextRange};

use crate::builtins;
use crate::diagnostic::{offset_to_line, Diagnostic};
use crate::emit::{FunctionIr, TranslationUnit};
use crate::ir::{self, assign_expr, binary, chained_binary_op, cond, field, ident, index, java_null,
    method_call, new_array, new_object, py_none, unary, Catch, Expr, Stmt};
use crate::peephole;
use crate::pool::ConstantPool;

/// Names resolvable without a `Runtime.pyglobal_` indirection: raw `null`
/// and the sole supported `.next()` shortcut. Only active when the caller
/// opts into intrinsics (disabled by default, since these identifiers are
/// not valid Python and only appear in hand-written interop shims).
const INTRINSIC_NULL: &str = "__pythonj_null__";
const INTRINSIC_NEXT: &str = "__pythonj_next__";

fn binop_method(op: ast::Operator) -> &'static str {
    use ast::Operator::*;
    match op {
        Add => "add",
        Sub => "sub",
        Mult => "mul",
        Div => "truediv",
        FloorDiv => "floordiv",
        Mod => "mod",
        Pow => "pow",
        LShift => "lshift",
        RShift => "rshift",
        BitAnd => "and",
        BitOr => "or",
        BitXor => "xor",
        MatMult => "matmul",
    }
}

pub struct Lowerer {
    path: String,
    source: String,
    intrinsics_allowed: bool,

    pool: ConstantPool,
    diagnostics: Vec<Diagnostic>,

    temp_counter: u32,
    label_counter: u32,

    in_function: bool,
    names: BTreeSet<String>,
    explicit_globals: BTreeSet<String>,
    used_expr_discard: bool,
    break_label: Option<String>,

    global_names: BTreeSet<String>,
    code: Vec<Stmt>,

    functions: BTreeMap<String, FunctionIr>,
}

impl Lowerer {
    pub fn new(path: impl Into<String>, source: impl Into<String>, intrinsics_allowed: bool) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            intrinsics_allowed,
            pool: ConstantPool::new(),
            diagnostics: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
            in_function: false,
            names: BTreeSet::new(),
            explicit_globals: BTreeSet::new(),
            used_expr_discard: false,
            break_label: None,
            global_names: BTreeSet::new(),
            code: vec![Stmt::var_decl("PyObject", "expr_discard", None)],
            functions: BTreeMap::new(),
        }
    }

    pub fn lower_module(&mut self, module: &ast::ModModule) {
        for stmt in &module.body {
            self.lower_stmt(stmt);
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn into_parts(self, class_name: String) -> (TranslationUnit, Vec<Diagnostic>) {
        let unit = TranslationUnit {
            class_name,
            pool: self.pool,
            functions: self.functions,
            global_names: self.global_names,
            global_code: ir::simplify_block(self.code),
        };
        (unit, self.diagnostics)
    }

    // -- diagnostics ---------------------------------------------------

    fn error_at(&mut self, range: TextRange, message: impl Into<String>) {
        let line = offset_to_line(&self.source, range.start().to_u32());
        self.diagnostics.push(Diagnostic::new(self.path.clone(), Some(line), message));
    }

    fn error_expr(&mut self, range: TextRange, message: impl Into<String>) -> Expr {
        self.error_at(range, message);
        ident("__cannot_translate_expr__")
    }

    // -- scope helpers ---------------------------------------------------

    fn make_temp(&mut self) -> String {
        let name = format!("pytemp_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    fn make_label(&mut self) -> String {
        let name = format!("pyloop_{}", self.label_counter);
        self.label_counter += 1;
        name
    }

    fn declare_name(&mut self, name: &str) {
        if self.in_function && !self.explicit_globals.contains(name) {
            self.names.insert(name.to_string());
        } else {
            self.global_names.insert(name.to_string());
        }
    }

    /// Run `f` against a fresh statement buffer and return it, simplified.
    /// A scoped block swap: swap `code` out, let `f` push into the fresh
    /// one, then swap the saved buffer back.
    fn with_block(&mut self, f: impl FnOnce(&mut Self)) -> Vec<Stmt> {
        let saved = std::mem::take(&mut self.code);
        f(self);
        let block = std::mem::replace(&mut self.code, saved);
        ir::simplify_block(block)
    }

    /// Identifier resolution: intrinsics, then the closed builtin set, then
    /// function-local vs. module-global.
    fn ident_expr(&self, name: &str) -> Expr {
        if self.intrinsics_allowed && name == INTRINSIC_NULL {
            return java_null();
        }
        if builtins::is_builtin(name) {
            return field(ident("Runtime"), format!("pyglobal_{name}"));
        }
        if self.in_function && !self.global_names.contains(name) && !self.explicit_globals.contains(name) {
            ident(format!("pylocal_{name}"))
        } else {
            ident(format!("pyglobal_{name}"))
        }
    }

    // -- expressions ------------------------------------------------------

    fn lower_expr(&mut self, expr: &ast::Expr) -> Expr {
        match expr {
            ast::Expr::NoneLiteral(_) => py_none(),
            ast::Expr::BooleanLiteral(b) => {
                field(ident("PyBool"), if b.value { "true_singleton" } else { "false_singleton" })
            }
            ast::Expr::NumberLiteral(n) => self.lower_number(expr.range(), n),
            ast::Expr::StringLiteral(s) => self.pool.record_str(&s.value.to_string()),
            ast::Expr::BytesLiteral(b) => {
                let bytes: Vec<u8> = b.value.bytes().collect();
                self.pool.record_bytes(&bytes)
            }
            ast::Expr::EllipsisLiteral(_) => self.error_expr(expr.range(), "the ellipsis literal is unsupported"),
            ast::Expr::FString(f) => self.lower_fstring(f),
            ast::Expr::Name(n) => self.ident_expr(n.id.as_str()),
            ast::Expr::Attribute(a) => {
                let obj = self.lower_expr(&a.value);
                method_call(obj, "getAttr", vec![Expr::StrLiteral(a.attr.to_string())])
            }
            ast::Expr::Subscript(s) => {
                let obj = self.lower_expr(&s.value);
                let idx = self.lower_expr(&s.slice);
                method_call(obj, "getItem", vec![idx])
            }
            ast::Expr::Slice(s) => {
                let lo = s.lower.as_ref().map(|e| self.lower_expr(e)).unwrap_or_else(py_none);
                let hi = s.upper.as_ref().map(|e| self.lower_expr(e)).unwrap_or_else(py_none);
                let step = s.step.as_ref().map(|e| self.lower_expr(e)).unwrap_or_else(py_none);
                new_object("PySlice", vec![lo, hi, step])
            }
            ast::Expr::UnaryOp(u) => {
                let operand = self.lower_expr(&u.operand);
                match u.op {
                    ast::UnaryOp::Not => {
                        method_call(ident("PyBool"), "create", vec![peephole::unary_not(peephole::bool_value(operand))])
                    }
                    ast::UnaryOp::USub => method_call(operand, "neg", vec![]),
                    ast::UnaryOp::UAdd => method_call(operand, "pos", vec![]),
                    ast::UnaryOp::Invert => method_call(operand, "invert", vec![]),
                }
            }
            ast::Expr::BinOp(b) => {
                let lhs = self.lower_expr(&b.left);
                let rhs = self.lower_expr(&b.right);
                method_call(lhs, binop_method(b.op), vec![rhs])
            }
            ast::Expr::BoolOp(b) => self.lower_bool_op(b.op, &b.values),
            ast::Expr::Compare(c) => self.lower_compare(c),
            ast::Expr::If(i) => {
                let test = peephole::bool_value(self.lower_expr(&i.test));
                let body = self.lower_expr(&i.body);
                let orelse = self.lower_expr(&i.orelse);
                cond(test, body, orelse)
            }
            ast::Expr::Tuple(t) => self.lower_collection("PyTuple", &t.elts),
            ast::Expr::List(l) => self.lower_collection("PyList", &l.elts),
            ast::Expr::Set(s) => self.lower_collection("PySet", &s.elts),
            ast::Expr::Dict(d) => self.lower_dict(d),
            ast::Expr::Call(c) => self.lower_call(c),
            ast::Expr::Starred(s) => {
                self.error_expr(s.range(), "a starred expression is only supported inside a call, list, tuple, or set")
            }
            _ => self.error_expr(expr.range(), "unsupported Python expression"),
        }
    }

    fn lower_number(&mut self, range: TextRange, n: &ast::ExprNumberLiteral) -> Expr {
        match &n.value {
            ast::Number::Int(i) => match i.as_i64() {
                Some(v) => self.pool.record_int(v),
                None => self.error_expr(range, "integer literal is too large to represent"),
            },
            ast::Number::Float(_) => self.error_expr(range, "floating point literals are unsupported"),
            ast::Number::Complex { .. } => self.error_expr(range, "complex literals are unsupported"),
        }
    }

    fn lower_fstring(&mut self, f: &ast::ExprFString) -> Expr {
        let mut segments = Vec::new();
        for part in f.value.iter() {
            match part {
                ast::FStringPart::Literal(lit) => segments.push(Expr::StrLiteral(lit.value.to_string())),
                ast::FStringPart::FString(fs) => {
                    for element in &fs.elements {
                        match element {
                            ast::InterpolatedStringElement::Literal(lit) => {
                                segments.push(Expr::StrLiteral(lit.value.to_string()));
                            }
                            ast::InterpolatedStringElement::Interpolation(interp) => {
                                segments.push(self.lower_fstring_interpolation(interp));
                            }
                        }
                    }
                }
            }
        }
        if segments.is_empty() {
            return field(ident("PyString"), "empty_singleton");
        }
        chained_binary_op("+", segments)
    }

    fn lower_fstring_interpolation(&mut self, interp: &ast::InterpolatedElement) -> Expr {
        let mut value = self.lower_expr(&interp.expression);
        match interp.conversion {
            ast::ConversionFlag::None => {}
            ast::ConversionFlag::Str => value = new_object("PyString", vec![method_call(value, "str", vec![])]),
            ast::ConversionFlag::Repr => value = new_object("PyString", vec![method_call(value, "repr", vec![])]),
            ast::ConversionFlag::Ascii => {
                self.error_at(interp.range(), "the '!a' conversion is unsupported");
            }
        }
        let spec = match &interp.format_spec {
            None => Expr::StrLiteral(String::new()),
            Some(spec) => {
                let lowered = self.lower_fstring_format_spec(spec);
                field(lowered, "value")
            }
        };
        method_call(value, "format", vec![spec])
    }

    fn lower_fstring_format_spec(&mut self, spec: &ast::InterpolatedStringFormatSpec) -> Expr {
        let mut segments = Vec::new();
        for element in &spec.elements {
            match element {
                ast::InterpolatedStringElement::Literal(lit) => segments.push(Expr::StrLiteral(lit.value.to_string())),
                ast::InterpolatedStringElement::Interpolation(interp) => {
                    segments.push(self.lower_fstring_interpolation(interp));
                }
            }
        }
        if segments.is_empty() {
            return field(ident("PyString"), "empty_singleton");
        }
        new_object("PyString", vec![chained_binary_op("+", segments)])
    }

    /// Build the args for a list/tuple/set/call's positional arguments,
    /// handling star-expansion. Returns an array expression directly when
    /// no element is starred, else the built-up `ArrayList`, optionally
    /// converted back to an array via `Runtime.arrayListToArray`.
    fn lower_star_expanded(&mut self, elts: &[ast::Expr], as_array: bool) -> Expr {
        if !elts.iter().any(|e| matches!(e, ast::Expr::Starred(_))) {
            let rendered: Vec<Expr> = elts.iter().map(|e| self.lower_expr(e)).collect();
            return new_array("PyObject", rendered);
        }
        let mut list_expr = new_object("java.util.ArrayList<PyObject>", vec![]);
        for e in elts {
            list_expr = match e {
                ast::Expr::Starred(s) => {
                    let v = self.lower_expr(&s.value);
                    method_call(ident("Runtime"), "addStarToArrayList", vec![list_expr, v])
                }
                other => {
                    let v = self.lower_expr(other);
                    method_call(ident("Runtime"), "addPyObjectToArrayList", vec![list_expr, v])
                }
            };
        }
        if as_array {
            method_call(ident("Runtime"), "arrayListToArray", vec![list_expr])
        } else {
            list_expr
        }
    }

    fn lower_collection(&mut self, ty: &str, elts: &[ast::Expr]) -> Expr {
        let args = self.lower_star_expanded(elts, true);
        new_object(ty, vec![args])
    }

    fn lower_dict(&mut self, d: &ast::ExprDict) -> Expr {
        let mut args = Vec::new();
        for item in &d.items {
            match &item.key {
                Some(k) => args.push(self.lower_expr(k)),
                None => args.push(java_null()),
            }
            args.push(self.lower_expr(&item.value));
        }
        new_object("PyDict", args)
    }

    fn lower_call(&mut self, c: &ast::ExprCall) -> Expr {
        if self.intrinsics_allowed {
            if let ast::Expr::Name(n) = c.func.as_ref() {
                if n.id.as_str() == INTRINSIC_NEXT
                    && c.arguments.args.len() == 1
                    && c.arguments.keywords.is_empty()
                {
                    let x = self.lower_expr(&c.arguments.args[0]);
                    return method_call(x, "next", vec![]);
                }
            }
        }
        let func = self.lower_expr(&c.func);
        let pos = self.lower_star_expanded(&c.arguments.args, false);
        let kwargs = if c.arguments.keywords.is_empty() {
            java_null()
        } else {
            let mut kv = Vec::new();
            for kw in &c.arguments.keywords {
                match &kw.arg {
                    Some(name) => {
                        kv.push(new_object("PyString", vec![Expr::StrLiteral(name.to_string())]));
                        kv.push(self.lower_expr(&kw.value));
                    }
                    None => {
                        kv.push(java_null());
                        kv.push(self.lower_expr(&kw.value));
                    }
                }
            }
            let dict = new_object("PyDict", kv);
            method_call(ident("Runtime"), "requireKwStrings", vec![dict])
        };
        method_call(func, "call", vec![pos, kwargs])
    }

    fn lower_bool_op(&mut self, op: ast::BoolOp, values: &[ast::Expr]) -> Expr {
        if values.len() == 1 {
            return self.lower_expr(&values[0]);
        }
        let temp = self.make_temp();
        self.code.push(Stmt::var_decl("PyObject", temp.clone(), None));
        let lhs = self.lower_expr(&values[0]);
        let assigned = assign_expr(ident(temp.clone()), lhs);
        let rest = self.lower_bool_op(op, &values[1..]);
        match op {
            ast::BoolOp::And => cond(peephole::bool_value(assigned), rest, ident(temp)),
            ast::BoolOp::Or => cond(peephole::bool_value(assigned), ident(temp), rest),
        }
    }

    fn lower_compare(&mut self, c: &ast::ExprCompare) -> Expr {
        let n = c.ops.len();
        let mut lhs = self.lower_expr(&c.left);
        let mut terms = Vec::with_capacity(n);
        for (i, (op, comparator)) in c.ops.iter().zip(c.comparators.iter()).enumerate() {
            let mut rhs = self.lower_expr(comparator);
            let is_last = i + 1 == n;
            let next_lhs = if is_last {
                None
            } else {
                let temp = self.make_temp();
                self.code.push(Stmt::var_decl("PyObject", temp.clone(), None));
                rhs = assign_expr(ident(temp.clone()), rhs);
                Some(temp)
            };
            let term = match op {
                ast::CmpOp::Is => binary("==", lhs, rhs),
                ast::CmpOp::IsNot => binary("!=", lhs, rhs),
                ast::CmpOp::In => method_call(lhs, "in", vec![rhs]),
                ast::CmpOp::NotIn => unary("!", method_call(lhs, "in", vec![rhs])),
                ast::CmpOp::Eq => method_call(lhs, "equals", vec![rhs]),
                ast::CmpOp::NotEq => unary("!", method_call(lhs, "equals", vec![rhs])),
                ast::CmpOp::Lt => method_call(lhs, "lt", vec![rhs]),
                ast::CmpOp::LtE => method_call(lhs, "le", vec![rhs]),
                ast::CmpOp::Gt => method_call(lhs, "gt", vec![rhs]),
                ast::CmpOp::GtE => method_call(lhs, "ge", vec![rhs]),
            };
            terms.push(term);
            if let Some(temp) = next_lhs {
                lhs = ident(temp);
            }
        }
        method_call(ident("PyBool"), "create", vec![chained_binary_op("&&", terms)])
    }

    // -- assignment targets ------------------------------------------------

    fn lower_assign_target(&mut self, target: &ast::Expr, value: Expr) {
        match target {
            ast::Expr::Name(n) => {
                self.declare_name(n.id.as_str());
                let lhs = self.ident_expr(n.id.as_str());
                self.code.push(Stmt::assign(lhs, value));
            }
            ast::Expr::Attribute(a) => {
                let recv = self.lower_expr(&a.value);
                self.code.push(Stmt::ExprStmt(method_call(recv, "setAttr", vec![Expr::StrLiteral(a.attr.to_string()), value])));
            }
            ast::Expr::Subscript(s) => {
                let recv = self.lower_expr(&s.value);
                let idx = self.lower_expr(&s.slice);
                self.code.push(Stmt::ExprStmt(method_call(recv, "setItem", vec![idx, value])));
            }
            ast::Expr::Tuple(t) => self.bind_unpack(&t.elts, value),
            ast::Expr::List(l) => self.bind_unpack(&l.elts, value),
            _ => self.error_at(target.range(), "unsupported assignment target"),
        }
    }

    /// Non-atomic sequence unpacking: evaluates `value.iter()` into a temp,
    /// pulls one element per target via `Runtime.nextRequireNonNull`, then
    /// asserts the iterator is exhausted via `Runtime.nextRequireNull`.
    fn bind_unpack(&mut self, targets: &[ast::Expr], value: Expr) {
        let iter_temp = self.make_temp();
        self.code.push(Stmt::var_decl("var", iter_temp.clone(), Some(method_call(value, "iter", vec![]))));
        for target in targets {
            let elt_temp = self.make_temp();
            self.code.push(Stmt::var_decl(
                "PyObject",
                elt_temp.clone(),
                Some(method_call(ident("Runtime"), "nextRequireNonNull", vec![ident(iter_temp.clone())])),
            ));
            self.lower_assign_target(target, ident(elt_temp));
        }
        self.code.push(Stmt::ExprStmt(method_call(ident("Runtime"), "nextRequireNull", vec![ident(iter_temp)])));
    }

    // -- statements ---------------------------------------------------------

    fn lower_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::Expr(e) => self.lower_expr_stmt(&e.value),
            ast::Stmt::Assign(a) => self.lower_assign(a),
            ast::Stmt::AugAssign(a) => self.lower_aug_assign(a),
            ast::Stmt::Assert(a) => self.lower_assert(a),
            ast::Stmt::Delete(d) => self.lower_delete(d),
            ast::Stmt::Return(r) => self.lower_return(r),
            ast::Stmt::Pass(_) => {}
            ast::Stmt::Global(g) => self.lower_global(g),
            ast::Stmt::If(i) => self.lower_if(i),
            ast::Stmt::While(w) => self.lower_while(w),
            ast::Stmt::For(f) => self.lower_for(f),
            ast::Stmt::With(w) => self.lower_with(w),
            ast::Stmt::Try(t) => self.lower_try(t),
            ast::Stmt::Break(_) => {
                self.code.push(Stmt::Break(self.break_label.clone()));
            }
            ast::Stmt::Continue(_) => self.code.push(Stmt::Continue),
            ast::Stmt::Raise(r) => self.lower_raise(r),
            ast::Stmt::FunctionDef(f) => self.lower_function_def(f),
            _ => self.error_at(stmt.range(), "unsupported Python statement"),
        }
    }

    fn lower_expr_stmt(&mut self, value: &ast::Expr) {
        let e = self.lower_expr(value);
        match &e {
            Expr::MethodCall { .. } | Expr::New { .. } => self.code.push(Stmt::ExprStmt(e)),
            _ => {
                self.used_expr_discard = true;
                self.code.push(Stmt::assign(ident("expr_discard"), e));
            }
        }
    }

    fn lower_assign(&mut self, a: &ast::StmtAssign) {
        if a.targets.len() != 1 {
            self.error_at(a.range(), "chained assignment is unsupported");
            self.lower_expr(&a.value);
            return;
        }
        let value = self.lower_expr(&a.value);
        self.lower_assign_target(&a.targets[0], value);
    }

    fn lower_aug_assign(&mut self, a: &ast::StmtAugAssign) {
        let method = format!("{}InPlace", binop_method(a.op));
        match a.target.as_ref() {
            ast::Expr::Name(n) => {
                let lhs = self.ident_expr(n.id.as_str());
                let rhs = self.lower_expr(&a.value);
                self.code.push(Stmt::assign(lhs.clone(), method_call(lhs, method, vec![rhs])));
            }
            ast::Expr::Attribute(attr) => {
                let temp = self.make_temp();
                let recv = self.lower_expr(&attr.value);
                self.code.push(Stmt::var_decl("var", temp.clone(), Some(recv)));
                let attr_lit = Expr::StrLiteral(attr.attr.to_string());
                let getter = method_call(ident(temp.clone()), "getAttr", vec![attr_lit.clone()]);
                let rhs = self.lower_expr(&a.value);
                let newval = method_call(getter, method, vec![rhs]);
                self.code.push(Stmt::ExprStmt(method_call(ident(temp), "setAttr", vec![attr_lit, newval])));
            }
            ast::Expr::Subscript(sub) => {
                let recv_temp = self.make_temp();
                let idx_temp = self.make_temp();
                let recv = self.lower_expr(&sub.value);
                self.code.push(Stmt::var_decl("var", recv_temp.clone(), Some(recv)));
                let idx = self.lower_expr(&sub.slice);
                self.code.push(Stmt::var_decl("var", idx_temp.clone(), Some(idx)));
                let getter = method_call(ident(recv_temp.clone()), "getItem", vec![ident(idx_temp.clone())]);
                let rhs = self.lower_expr(&a.value);
                let newval = method_call(getter, method, vec![rhs]);
                self.code.push(Stmt::ExprStmt(method_call(ident(recv_temp), "setItem", vec![ident(idx_temp), newval])));
            }
            _ => {
                self.error_at(a.target.range(), "unsupported augmented assignment target");
                self.lower_expr(&a.value);
            }
        }
    }

    fn lower_assert(&mut self, a: &ast::StmtAssert) {
        let line = offset_to_line(&self.source, a.range().start().to_u32());
        let cond_expr = unary("!", peephole::bool_value(self.lower_expr(&a.test)));
        let msg_expr = match &a.msg {
            None => Expr::StrLiteral(format!("{}:{}: assertion failure", self.path, line)),
            Some(msg) => {
                let prefix = Expr::StrLiteral(format!("{}:{}: assertion failure: ", self.path, line));
                let msg_val = self.lower_expr(msg);
                binary("+", prefix, method_call(msg_val, "repr", vec![]))
            }
        };
        let throw = Stmt::Throw(method_call(ident("PyAssertionError"), "raise", vec![msg_expr]));
        self.code.extend(Stmt::if_stmt(cond_expr, vec![throw], vec![]));
    }

    fn lower_delete(&mut self, d: &ast::StmtDelete) {
        for target in &d.targets {
            match target {
                ast::Expr::Attribute(a) => {
                    let recv = self.lower_expr(&a.value);
                    self.code.push(Stmt::ExprStmt(method_call(recv, "delAttr", vec![Expr::StrLiteral(a.attr.to_string())])));
                }
                ast::Expr::Subscript(s) => {
                    let recv = self.lower_expr(&s.value);
                    let idx = self.lower_expr(&s.slice);
                    self.code.push(Stmt::ExprStmt(method_call(recv, "delItem", vec![idx])));
                }
                _ => self.error_at(target.range(), "'del' of this target form is unsupported"),
            }
        }
    }

    fn lower_return(&mut self, r: &ast::StmtReturn) {
        if !self.in_function {
            self.error_at(r.range(), "'return' outside a function is unsupported");
            if let Some(v) = &r.value {
                self.lower_expr(v);
            }
            return;
        }
        let value = r.value.as_ref().map(|v| self.lower_expr(v)).unwrap_or_else(py_none);
        self.code.push(Stmt::Return(value));
    }

    fn lower_global(&mut self, g: &ast::StmtGlobal) {
        if !self.in_function {
            self.error_at(g.range(), "'global' outside a function is unsupported");
            return;
        }
        for name in &g.names {
            self.explicit_globals.insert(name.to_string());
        }
    }

    fn lower_raise(&mut self, r: &ast::StmtRaise) {
        if r.cause.is_some() {
            self.error_at(r.range(), "'raise ... from ...' is unsupported");
        }
        match &r.exc {
            Some(exc) => {
                let value = self.lower_expr(exc);
                self.code.push(Stmt::Throw(value));
            }
            None => self.error_at(r.range(), "a bare 'raise' (re-raise) is unsupported"),
        }
    }

    fn clauses_to_stmts(&mut self, clauses: &[ast::ElifElseClause]) -> Vec<Stmt> {
        let Some((first, rest)) = clauses.split_first() else {
            return vec![];
        };
        match &first.test {
            Some(test) => {
                let cond_expr = peephole::bool_value(self.lower_expr(test));
                let body = self.with_block(|slf| {
                    for s in &first.body {
                        slf.lower_stmt(s);
                    }
                });
                let orelse = self.clauses_to_stmts(rest);
                Stmt::if_stmt(cond_expr, body, orelse)
            }
            None => self.with_block(|slf| {
                for s in &first.body {
                    slf.lower_stmt(s);
                }
            }),
        }
    }

    fn lower_if(&mut self, i: &ast::StmtIf) {
        let cond_expr = peephole::bool_value(self.lower_expr(&i.test));
        let body = self.with_block(|slf| {
            for s in &i.body {
                slf.lower_stmt(s);
            }
        });
        let orelse = self.clauses_to_stmts(&i.elif_else_clauses);
        self.code.extend(Stmt::if_stmt(cond_expr, body, orelse));
    }

    fn lower_while(&mut self, w: &ast::StmtWhile) {
        let cond_expr = peephole::bool_value(self.lower_expr(&w.test));
        if w.orelse.is_empty() {
            let body = self.with_block(|slf| {
                for s in &w.body {
                    slf.lower_stmt(s);
                }
            });
            self.code.extend(Stmt::while_stmt(cond_expr, body));
        } else {
            let label = self.make_label();
            let saved = self.break_label.replace(label.clone());
            let body = self.with_block(|slf| {
                for s in &w.body {
                    slf.lower_stmt(s);
                }
            });
            self.break_label = saved;
            let mut labeled = Stmt::while_stmt(cond_expr, body);
            let else_body = self.with_block(|slf| {
                for s in &w.orelse {
                    slf.lower_stmt(s);
                }
            });
            labeled.extend(else_body);
            self.code.push(Stmt::labeled(label, labeled));
        }
    }

    fn lower_for(&mut self, f: &ast::StmtFor) {
        if f.is_async {
            self.error_at(f.range(), "'async for' is unsupported");
        }
        let iter_val = self.lower_expr(&f.iter);
        let t0 = self.make_temp();
        self.code.push(Stmt::var_decl("var", t0.clone(), Some(method_call(iter_val, "iter", vec![]))));
        let t1 = self.make_temp();

        let break_label = if f.orelse.is_empty() { None } else { Some(self.make_label()) };
        let saved = self.break_label.clone();
        self.break_label = break_label.clone();
        let body = self.with_block(|slf| {
            slf.lower_assign_target(&f.target, ident(t1.clone()));
            for s in &f.body {
                slf.lower_stmt(s);
            }
        });
        self.break_label = saved;

        let for_node = Stmt::for_stmt(
            "PyObject",
            t1.clone(),
            method_call(ident(t0.clone()), "next", vec![]),
            binary("!=", ident(t1.clone()), java_null()),
            t1.clone(),
            method_call(ident(t0), "next", vec![]),
            body,
        );

        match break_label {
            Some(label) => {
                let else_body = self.with_block(|slf| {
                    for s in &f.orelse {
                        slf.lower_stmt(s);
                    }
                });
                let mut labeled = vec![for_node];
                labeled.extend(else_body);
                self.code.push(Stmt::labeled(label, labeled));
            }
            None => self.code.push(for_node),
        }
    }

    fn lower_with(&mut self, w: &ast::StmtWith) {
        if w.is_async {
            self.error_at(w.range(), "'async with' is unsupported");
        }
        if w.items.len() != 1 {
            self.error_at(w.range(), "a 'with' statement with more than one item is unsupported");
            for item in &w.items {
                self.lower_expr(&item.context_expr);
            }
            return;
        }
        let item = &w.items[0];
        let cm = self.lower_expr(&item.context_expr);
        let t = self.make_temp();
        self.code.push(Stmt::var_decl("var", t.clone(), Some(cm)));
        let enter_result = method_call(ident(t.clone()), "enter", vec![]);
        match &item.optional_vars {
            Some(target) => self.lower_assign_target(target, enter_result),
            None => self.code.push(Stmt::ExprStmt(enter_result)),
        }
        let body = self.with_block(|slf| {
            for s in &w.body {
                slf.lower_stmt(s);
            }
        });
        let finally_body = vec![Stmt::ExprStmt(method_call(ident(t), "exit", vec![]))];
        self.code.push(Stmt::try_stmt(body, None, finally_body));
    }

    fn lower_try(&mut self, t: &ast::StmtTry) {
        if t.is_star {
            self.error_at(t.range(), "'try*' exception groups are unsupported");
        }
        if t.handlers.len() > 1 {
            self.error_at(t.range(), "more than one exception handler is unsupported");
            for h in &t.handlers[1..] {
                let ast::ExceptHandler::ExceptHandler(handler) = h;
                if let Some(type_expr) = &handler.type_ {
                    self.lower_expr(type_expr);
                }
                self.with_block(|slf| {
                    for s in &handler.body {
                        slf.lower_stmt(s);
                    }
                });
            }
        }
        if !t.orelse.is_empty() {
            self.error_at(t.range(), "'try'/'else' is unsupported");
        }
        let body = self.with_block(|slf| {
            for s in &t.body {
                slf.lower_stmt(s);
            }
        });
        let catch = t.handlers.first().map(|h| {
            let ast::ExceptHandler::ExceptHandler(handler) = h;
            if let Some(type_expr) = &handler.type_ {
                match type_expr.as_ref() {
                    ast::Expr::Name(n) if n.id.as_str() == "BaseException" => {}
                    _ => self.error_at(
                        type_expr.range(),
                        "only a bare 'except' or 'except BaseException' is supported",
                    ),
                }
            }
            let var = self.make_temp();
            let name = handler.name.clone();
            let var_for_closure = var.clone();
            let body = self.with_block(|slf| {
                if let Some(name) = &name {
                    slf.declare_name(name.as_str());
                    let lhs = slf.ident_expr(name.as_str());
                    slf.code.push(Stmt::assign(lhs, field(ident(var_for_closure), "exc")));
                }
                for s in &handler.body {
                    slf.lower_stmt(s);
                }
            });
            Catch { exc_type: "PyRaise".to_string(), var, body }
        });
        let finally_body = self.with_block(|slf| {
            for s in &t.finalbody {
                slf.lower_stmt(s);
            }
        });
        self.code.push(Stmt::try_stmt(body, catch, finally_body));
    }

    // -- function definitions -----------------------------------------------

    fn lower_function_def(&mut self, f: &ast::StmtFunctionDef) {
        if self.in_function {
            self.error_at(f.range(), "nested function definitions are unsupported");
            return;
        }
        if !f.decorator_list.is_empty() {
            self.error_at(f.range(), "function decorators are unsupported");
        }
        if f.returns.is_some() {
            self.error_at(f.range(), "function return type annotations are unsupported");
        }
        if f.type_params.is_some() {
            self.error_at(f.range(), "function type parameters are unsupported");
        }
        let params = &f.parameters;
        if !params.posonlyargs.is_empty() {
            self.error_at(f.range(), "position-only parameters are unsupported");
        }
        if params.vararg.is_some() {
            self.error_at(f.range(), "'*args' is unsupported");
        }
        if !params.kwonlyargs.is_empty() {
            self.error_at(f.range(), "keyword-only parameters are unsupported");
        }
        if params.kwarg.is_some() {
            self.error_at(f.range(), "'**kwargs' is unsupported");
        }
        for arg in &params.args {
            if arg.default.is_some() {
                self.error_at(f.range(), "argument default values are unsupported");
            }
            if arg.parameter.annotation.is_some() {
                self.error_at(f.range(), "argument type annotations are unsupported");
            }
        }

        let arg_names: Vec<String> = params.args.iter().map(|a| a.parameter.name.to_string()).collect();
        let n_args = arg_names.len();
        let fname = f.name.to_string();

        self.global_names.insert(fname.clone());
        self.code.push(Stmt::assign(
            ident(format!("pyglobal_{fname}")),
            new_object(format!("pyfunc_{fname}"), vec![]),
        ));

        let saved_names = std::mem::take(&mut self.names);
        let saved_explicit_globals = std::mem::take(&mut self.explicit_globals);
        let saved_used_expr_discard = std::mem::replace(&mut self.used_expr_discard, false);
        let saved_temp_counter = std::mem::replace(&mut self.temp_counter, 0);
        let saved_break_label = self.break_label.take();
        self.in_function = true;

        let body = self.with_block(|slf| {
            for s in &f.body {
                slf.lower_stmt(s);
            }
        });

        let local_names = std::mem::replace(&mut self.names, saved_names);
        let used_expr_discard = std::mem::replace(&mut self.used_expr_discard, saved_used_expr_discard);
        self.temp_counter = saved_temp_counter;
        self.in_function = false;
        self.explicit_globals = saved_explicit_globals;
        self.break_label = saved_break_label;

        let mut method_body = Vec::new();
        method_body.extend(Stmt::if_stmt(
            binary("&&", binary("!=", ident("kwargs"), java_null()), peephole::bool_value(ident("kwargs"))),
            vec![Stmt::Throw(new_object(
                "RuntimeException",
                vec![Expr::StrLiteral(format!("{fname}() does not accept keyword arguments"))],
            ))],
            vec![],
        ));
        method_body.extend(Stmt::if_stmt(
            binary("!=", field(ident("args"), "length"), Expr::IntLiteral { value: n_args as i64, suffix: "" }),
            vec![Stmt::Throw(method_call(ident("Runtime"), "raiseUserExactArgs", {
                let mut call_args = vec![ident("args"), Expr::IntLiteral { value: n_args as i64, suffix: "" }, Expr::StrLiteral(fname.clone())];
                call_args.extend(arg_names.iter().map(|n| Expr::StrLiteral(n.clone())));
                call_args
            }))],
            vec![],
        ));
        for (i, name) in arg_names.iter().enumerate() {
            method_body.push(Stmt::var_decl(
                "PyObject",
                format!("pylocal_{name}"),
                Some(index(ident("args"), Expr::IntLiteral { value: i as i64, suffix: "" })),
            ));
        }
        if used_expr_discard {
            method_body.push(Stmt::var_decl("PyObject", "expr_discard", None));
        }
        let param_set: BTreeSet<String> = arg_names.iter().cloned().collect();
        for name in local_names.difference(&param_set) {
            method_body.push(Stmt::var_decl("PyObject", format!("pylocal_{name}"), None));
        }
        method_body.extend(body);
        method_body.push(Stmt::Return(py_none()));
        let method_body = ir::simplify_block(method_body);

        self.functions.insert(
            fname.clone(),
            FunctionIr {
                header_lines: vec![
                    format!("private static final class pyfunc_{fname} extends PyUserFunction {{"),
                    format!("pyfunc_{fname}() {{ super(\"{fname}\"); }}"),
                    "@Override public PyObject call(PyObject[] args, PyDict kwargs) {".to_string(),
                ],
                body: method_body,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruff_python_parser::parse_module;

    fn lower(src: &str) -> (Lowerer, Vec<Diagnostic>) {
        let parsed = parse_module(src).expect("parses");
        let mut lowerer = Lowerer::new("test.py", src, false);
        lowerer.lower_module(parsed.syntax());
        let diags = lowerer.diagnostics.clone();
        (lowerer, diags)
    }

    #[test]
    fn assigns_module_scope_global() {
        let (lowerer, diags) = lower("x = 1\n");
        assert!(diags.is_empty());
        assert!(lowerer.global_names.contains("x"));
    }

    #[test]
    fn function_params_become_locals_not_globals() {
        let (lowerer, diags) = lower("def f(x):\n    return x\n");
        assert!(diags.is_empty());
        assert!(lowerer.global_names.contains("f"));
        assert!(lowerer.functions.contains_key("f"));
    }

    #[test]
    fn chained_assignment_is_diagnosed() {
        let (_lowerer, diags) = lower("x = y = 1\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("chained assignment"));
    }

    #[test]
    fn nested_function_is_diagnosed() {
        let (_lowerer, diags) = lower("def outer():\n    def inner():\n        pass\n");
        assert!(diags.iter().any(|d| d.message.contains("nested function")));
    }

    #[test]
    fn global_outside_function_is_diagnosed() {
        let (_lowerer, diags) = lower("global x\n");
        assert!(diags.iter().any(|d| d.message.contains("'global' outside")));
    }

    #[test]
    fn return_outside_function_is_diagnosed() {
        let (_lowerer, diags) = lower("return 1\n");
        assert!(diags.iter().any(|d| d.message.contains("'return' outside")));
    }

    #[test]
    fn while_else_installs_a_break_label() {
        let (lowerer, diags) = lower("while True:\n    break\nelse:\n    pass\n");
        assert!(diags.is_empty());
        assert!(matches!(lowerer.code.last(), Some(Stmt::Labeled { .. })));
    }
}
