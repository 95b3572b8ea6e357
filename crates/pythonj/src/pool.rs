//! The constant pool: deduplicates integer, string, and bytes literals
//! across a translation unit and assigns each a stable singleton name.
//!
//! Generalizes `compiler.rs`'s `add_const`/`add_name` dedup pattern into a
//! single owner type the lowering visitor holds alongside its other
//! per-unit state.

use std::collections::{BTreeSet, HashMap};

use crate::emit::IndentedWriter;
use crate::ir::{self, Expr};

#[derive(Debug, Default)]
pub struct ConstantPool {
    ints: BTreeSet<i64>,
    strings: HashMap<String, u32>,
    bytes: HashMap<Vec<u8>, u32>,
}

pub fn int_singleton_name(i: i64) -> String {
    if i < 0 {
        format!("int_singleton_neg{}", i.unsigned_abs())
    } else {
        format!("int_singleton_{i}")
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// `0` and `1` never enter the pool; they use runtime-provided
    /// singletons instead.
    pub fn record_int(&mut self, i: i64) -> Expr {
        match i {
            0 => ir::field(ir::ident("PyInt"), "singleton_0"),
            1 => ir::field(ir::ident("PyInt"), "singleton_1"),
            _ => {
                self.ints.insert(i);
                ir::ident(int_singleton_name(i))
            }
        }
    }

    /// The empty string never enters the pool; it uses the runtime's
    /// empty-string singleton.
    pub fn record_str(&mut self, s: &str) -> Expr {
        if s.is_empty() {
            return ir::field(ir::ident("PyString"), "empty_singleton");
        }
        let next = self.strings.len() as u32;
        let idx = *self.strings.entry(s.to_string()).or_insert(next);
        ir::ident(format!("str_singleton_{idx}"))
    }

    pub fn record_bytes(&mut self, b: &[u8]) -> Expr {
        let next = self.bytes.len() as u32;
        let idx = *self.bytes.entry(b.to_vec()).or_insert(next);
        ir::ident(format!("bytes_singleton_{idx}"))
    }

    /// Write one `private static final` declaration per pool entry, in
    /// deterministic order (integers numerically, strings and bytes by
    /// literal value).
    pub fn emit(&self, w: &mut IndentedWriter) {
        for i in &self.ints {
            let name = int_singleton_name(*i);
            let value = ir::new_object("PyInt", vec![Expr::IntLiteral { value: *i, suffix: "L" }]);
            w.write_line(&format!("private static final PyInt {name} = {};", value.render()));
        }
        let mut strings: Vec<_> = self.strings.iter().collect();
        strings.sort_by(|a, b| a.0.cmp(b.0));
        for (s, idx) in strings {
            let value = ir::new_object("PyString", vec![Expr::StrLiteral(s.clone())]);
            w.write_line(&format!("private static final PyString str_singleton_{idx} = {};", value.render()));
        }
        let mut byte_entries: Vec<_> = self.bytes.iter().collect();
        byte_entries.sort_by(|a, b| a.0.cmp(b.0));
        for (b, idx) in byte_entries {
            let elts = b
                .iter()
                .map(|&x| Expr::IntLiteral { value: (((x as i32) + 0x80) & 0xFF) - 0x80, suffix: "" })
                .collect();
            let value = ir::new_object("PyBytes", vec![ir::new_array("byte", elts)]);
            w.write_line(&format!("private static final PyBytes bytes_singleton_{idx} = {};", value.render()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ints.is_empty() && self.strings.is_empty() && self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_one_are_never_pooled() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.record_int(0).render(), "PyInt.singleton_0");
        assert_eq!(pool.record_int(1).render(), "PyInt.singleton_1");
        assert!(pool.is_empty());
    }

    #[test]
    fn empty_string_is_never_pooled() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.record_str("").render(), "PyString.empty_singleton");
        assert!(pool.is_empty());
    }

    #[test]
    fn duplicate_literals_share_one_entry() {
        let mut pool = ConstantPool::new();
        let a = pool.record_str("hello");
        let b = pool.record_str("hello");
        assert_eq!(a, b);
        assert_eq!(pool.strings.len(), 1);
    }

    #[test]
    fn negative_integers_pool_with_neg_prefixed_names() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.record_int(-5).render(), "int_singleton_neg5");
    }

    #[test]
    fn pool_entries_emit_in_sorted_order() {
        let mut pool = ConstantPool::new();
        pool.record_int(42);
        pool.record_int(-3);
        pool.record_int(7);
        pool.record_str("zebra");
        pool.record_str("apple");
        let mut w = IndentedWriter::new();
        pool.emit(&mut w);
        let out = w.finish();
        let neg_pos = out.find("int_singleton_neg3").unwrap();
        let seven_pos = out.find("int_singleton_7").unwrap();
        let forty_two_pos = out.find("int_singleton_42").unwrap();
        assert!(neg_pos < seven_pos && seven_pos < forty_two_pos);
        assert!(out.find("apple").unwrap() < out.find("zebra").unwrap());
    }
}
