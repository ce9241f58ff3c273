//! Class and subroutine scoped symbol tables.
use crate::vm::Segment;

use smol_str::SmolStr;
use std::collections::HashMap;

/// Declaration category of a variable, determining its storage segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SymbolKind {
    Static,
    Field,
    Arg,
    Var,
}

impl SymbolKind {
    /// The VM memory segment that holds variables of this kind.
    ///
    /// Fields live on the current object, addressed through `this`.
    #[rustfmt::skip]
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field  => Segment::This,
            SymbolKind::Arg    => Segment::Argument,
            SymbolKind::Var    => Segment::Local,
        }
    }
}

/// One declared variable's type, kind and running index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: SmolStr,
    pub kind: SymbolKind,
    pub index: u16,
}

/// Running index counters, one per kind, owned by the table instance.
#[derive(Debug, Default)]
struct Counters {
    statics: u16,
    fields: u16,
    args: u16,
    vars: u16,
}

/// Maps identifier names to [`Symbol`] records across two nested
/// lexical scopes.
///
/// The class scope (`static`, `field`) persists for the whole class.
/// The subroutine scope (`arg`, `var`) is reset at the start of every
/// subroutine. Lookup checks the subroutine scope first, so local
/// declarations shadow class-level ones of the same name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<SmolStr, Symbol>,
    subroutine_scope: HashMap<SmolStr, Symbol>,
    counters: Counters,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the subroutine scope and reset its counters.
    ///
    /// Must be called before compiling each subroutine's parameters
    /// and body.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters.args = 0;
        self.counters.vars = 0;
    }

    /// Reserve an argument slot without binding a name.
    ///
    /// Used for the implicit receiver parameter of instance methods.
    pub fn reserve_arg(&mut self) {
        self.counters.args += 1;
    }

    /// Insert a new symbol at the current index for its kind, then
    /// advance that kind's counter.
    ///
    /// Defining the same name twice in the same scope overwrites the
    /// earlier entry. Last write wins; the stale entry's index is not
    /// reused.
    pub fn define(&mut self, name: impl Into<SmolStr>, ty: impl Into<SmolStr>, kind: SymbolKind) {
        let (scope, counter) = match kind {
            SymbolKind::Static => (&mut self.class_scope, &mut self.counters.statics),
            SymbolKind::Field => (&mut self.class_scope, &mut self.counters.fields),
            SymbolKind::Arg => (&mut self.subroutine_scope, &mut self.counters.args),
            SymbolKind::Var => (&mut self.subroutine_scope, &mut self.counters.vars),
        };

        let symbol = Symbol {
            ty: ty.into(),
            kind,
            index: *counter,
        };
        scope.insert(name.into(), symbol);
        *counter += 1;
    }

    /// Number of variables of the given kind defined so far.
    #[rustfmt::skip]
    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        match kind {
            SymbolKind::Static => self.counters.statics,
            SymbolKind::Field  => self.counters.fields,
            SymbolKind::Arg    => self.counters.args,
            SymbolKind::Var    => self.counters.vars,
        }
    }

    /// Look up a name, subroutine scope first, then class scope.
    ///
    /// `None` is not a fatal condition at the table level. The caller
    /// decides whether an unresolved name is a class name, a subroutine
    /// name, or an error.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_index_assignment_is_stable() {
        let mut table = SymbolTable::new();

        table.define("a", "int", SymbolKind::Var);
        table.define("b", "int", SymbolKind::Var);
        table.define("c", "boolean", SymbolKind::Var);
        // Another kind keeps its own counter.
        table.define("x", "int", SymbolKind::Field);

        assert_eq!(table.resolve("a").map(|s| s.index), Some(0));
        assert_eq!(table.resolve("b").map(|s| s.index), Some(1));
        assert_eq!(table.resolve("c").map(|s| s.index), Some(2));
        assert_eq!(table.resolve("x").map(|s| s.index), Some(0));

        assert_eq!(table.var_count(SymbolKind::Var), 3);
        assert_eq!(table.var_count(SymbolKind::Field), 1);
        assert_eq!(table.var_count(SymbolKind::Static), 0);
    }

    #[test]
    fn test_subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", "int", SymbolKind::Field);

        table.start_subroutine();
        table.define("x", "boolean", SymbolKind::Var);

        let local = table.resolve("x").expect("shadowed");
        assert_eq!(local.kind, SymbolKind::Var);
        assert_eq!(local.ty, "boolean");
        assert_eq!(local.index, 0);

        // The next subroutine sees the field again.
        table.start_subroutine();
        let field = table.resolve("x").expect("field");
        assert_eq!(field.kind, SymbolKind::Field);
        assert_eq!(field.ty, "int");
        assert_eq!(field.index, 0);
    }

    #[test]
    fn test_start_subroutine_resets_counters() {
        let mut table = SymbolTable::new();

        table.reserve_arg(); // implicit receiver
        table.define("other", "Point", SymbolKind::Arg);
        assert_eq!(table.var_count(SymbolKind::Arg), 2);
        assert_eq!(table.resolve("other").map(|s| s.index), Some(1));

        table.start_subroutine();
        assert_eq!(table.var_count(SymbolKind::Arg), 0);
        assert_eq!(table.var_count(SymbolKind::Var), 0);
        assert!(table.resolve("other").is_none());
    }

    #[test]
    fn test_duplicate_define_overwrites() {
        let mut table = SymbolTable::new();

        table.define("n", "int", SymbolKind::Var);
        table.define("n", "char", SymbolKind::Var);

        // Last write wins, and the counter keeps running.
        let symbol = table.resolve("n").expect("defined");
        assert_eq!(symbol.ty, "char");
        assert_eq!(symbol.index, 1);
        assert_eq!(table.var_count(SymbolKind::Var), 2);
    }

    #[test]
    fn test_segment_mapping() {
        use crate::vm::Segment;

        assert_eq!(SymbolKind::Static.segment(), Segment::Static);
        assert_eq!(SymbolKind::Field.segment(), Segment::This);
        assert_eq!(SymbolKind::Arg.segment(), Segment::Argument);
        assert_eq!(SymbolKind::Var.segment(), Segment::Local);
    }
}
