//! The closed set of built-in names the lowering visitor recognizes.
//!
//! Modeled on `littrs::builtins::try_builtin`'s flat-match dispatch shape,
//! but as a static table rather than a dispatcher, since resolving a
//! built-in here only ever produces one thing: a `Runtime.pyglobal_<name>`
//! field reference.

pub const BUILTINS: &[&str] = &[
    "abs",
    "all",
    "any",
    "bool",
    "bytearray",
    "bytes",
    "chr",
    "dict",
    "enumerate",
    "getattr",
    "hash",
    "hex",
    "int",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "list",
    "max",
    "min",
    "next",
    "object",
    "open",
    "ord",
    "print",
    "range",
    "repr",
    "reversed",
    "set",
    "slice",
    "sorted",
    "str",
    "sum",
    "tuple",
    "type",
    "zip",
    "ArithmeticError",
    "AssertionError",
    "IndexError",
    "KeyError",
    "LookupError",
    "StopIteration",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_core_builtins() {
        assert!(is_builtin("print"));
        assert!(is_builtin("ValueError"));
        assert!(!is_builtin("__pythonj_next__"));
        assert!(!is_builtin("my_function"));
    }

    #[test]
    fn table_has_no_duplicates() {
        let mut sorted = BUILTINS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), BUILTINS.len());
    }
}
