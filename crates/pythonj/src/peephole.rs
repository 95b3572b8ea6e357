//! Tiny structural rewrites applied at IR construction time. These only
//! fold already-built IR nodes into simpler ones; they never reorder or
//! drop a side-effecting expression.

use crate::ir::{self, Expr, Stmt};

fn is_true(e: &Expr) -> bool {
    matches!(e, Expr::Ident(name) if name == "true")
}

fn is_false(e: &Expr) -> bool {
    matches!(e, Expr::Ident(name) if name == "false")
}

/// `!true -> false`, `!false -> true`, else a plain `!e`.
pub fn unary_not(e: Expr) -> Expr {
    if is_true(&e) {
        ir::ident("false")
    } else if is_false(&e) {
        ir::ident("true")
    } else {
        ir::unary("!", e)
    }
}

/// Unwrap the common `PyBool` boxings rather than re-boxing and immediately
/// calling `.boolValue()` on the result.
pub fn bool_value(e: Expr) -> Expr {
    match &e {
        Expr::MethodCall { obj, method, args } if method == "create" && args.len() == 1 => {
            if matches!(obj.as_ref(), Expr::Ident(name) if name == "PyBool") {
                return args[0].clone();
            }
            ir::method_call(e, "boolValue", vec![])
        }
        Expr::Field { obj, field } if matches!(obj.as_ref(), Expr::Ident(name) if name == "PyBool") => {
            if field == "false_singleton" {
                ir::ident("false")
            } else if field == "true_singleton" {
                ir::ident("true")
            } else {
                ir::method_call(e, "boolValue", vec![])
            }
        }
        _ => ir::method_call(e, "boolValue", vec![]),
    }
}

/// Inline a statically-known branch rather than emitting a dead `if`/`else`.
pub fn if_stmt(cond: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Vec<Stmt> {
    if is_true(&cond) {
        body
    } else if is_false(&cond) {
        orelse
    } else {
        vec![Stmt::If { cond, body, orelse }]
    }
}

/// Drop a loop whose condition is statically `false`.
pub fn while_stmt(cond: Expr, body: Vec<Stmt>) -> Vec<Stmt> {
    if is_false(&cond) {
        vec![]
    } else {
        vec![Stmt::While { cond, body }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_not_folds_literal_booleans() {
        assert_eq!(unary_not(ir::ident("true")), ir::ident("false"));
        assert_eq!(unary_not(ir::ident("false")), ir::ident("true"));
        assert_eq!(unary_not(ir::ident("x")), ir::unary("!", ir::ident("x")));
    }

    #[test]
    fn bool_value_unwraps_pybool_create() {
        let e = ir::method_call(ir::ident("PyBool"), "create", vec![ir::ident("x")]);
        assert_eq!(bool_value(e), ir::ident("x"));
    }

    #[test]
    fn bool_value_unwraps_singletons() {
        let t = ir::field(ir::ident("PyBool"), "true_singleton");
        let f = ir::field(ir::ident("PyBool"), "false_singleton");
        assert_eq!(bool_value(t), ir::ident("true"));
        assert_eq!(bool_value(f), ir::ident("false"));
    }

    #[test]
    fn bool_value_falls_back_to_method_call() {
        let e = bool_value(ir::ident("x"));
        assert_eq!(e.render(), "x.boolValue()");
    }

    #[test]
    fn if_stmt_inlines_constant_conditions() {
        let body = vec![Stmt::Continue];
        let orelse = vec![Stmt::Break(None)];
        assert_eq!(if_stmt(ir::ident("true"), body.clone(), orelse.clone()).len(), 1);
        assert_eq!(if_stmt(ir::ident("false"), body, orelse).len(), 1);
    }

    #[test]
    fn while_stmt_drops_statically_false_loop() {
        assert!(while_stmt(ir::ident("false"), vec![Stmt::Continue]).is_empty());
        assert_eq!(while_stmt(ir::ident("true"), vec![Stmt::Continue]).len(), 1);
    }
}
