mod context;

use crate::{
    common::Text,
    index_map::IndexMap,
    syntax::{self, Node, NodeId},
    HashMap,
};

use self::context::NamingContext;

/// The result of resolving every name in a file.
#[derive(Debug, Default)]
pub struct Resolution {
    /// For each name which references something, the symbol it references. Names which introduce
    /// a binding reference themselves.
    pub symbols: HashMap<NodeId, Symbol>,

    /// Every binding introduced in the file, keyed by the node that introduces it.
    pub bindings: HashMap<NodeId, Binding>,

    /// All package-level declarations, keyed by name. Methods are not included.
    pub package_scope: IndexMap<Text, NodeId>,

    /// For every declared type in the package scope (keyed by its binding), the method
    /// declarations with that type as receiver base.
    pub methods: HashMap<NodeId, Vec<NodeId>>,
}

impl Resolution {
    pub fn symbol(&self, node: NodeId) -> Option<Symbol> {
        self.symbols.get(&node).copied()
    }

    pub fn binding(&self, node: NodeId) -> Option<&Binding> {
        self.bindings.get(&node)
    }

    /// If the node refers to a binding, returns that binding.
    pub fn referenced_binding(&self, node: NodeId) -> Option<(NodeId, &Binding)> {
        match self.symbol(node)? {
            Symbol::Binding(binder) => Some((binder, self.binding(binder)?)),
            Symbol::Builtin(_) | Symbol::Package(_) => None,
        }
    }

    /// Determines if the node is the name introduced by a binding.
    pub fn is_binder(&self, node: NodeId) -> bool {
        self.symbol(node) == Some(Symbol::Binding(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Refers to a binding introduced somewhere in the file.
    Binding(NodeId),
    /// Refers to a predeclared identifier (eg. `int`, `true`, `nil`, `len`, etc.).
    Builtin(Builtin),
    /// Refers to an imported package.
    Package(Text),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub name: Text,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A `TypeSpec` node.
    Type(NodeId),
    /// The name at `index` in a `ConstSpec`.
    Const { spec: NodeId, index: usize },
    /// The name at `index` in a `VarSpec`.
    Var { spec: NodeId, index: usize },
    /// A function or method declaration.
    Func(NodeId),
    /// A function parameter or named result.
    Param { typ: NodeId, variadic: bool },
    /// The receiver of a method.
    Receiver { typ: NodeId, method: NodeId },
    /// The name at `index` on the left hand side of `:=`.
    Define { stmt: NodeId, index: usize },
    /// The key (0) or value (1) of a `for range` loop.
    Range { stmt: NodeId, index: usize },
    /// The variable bound by a type switch within one of its clauses.
    TypeSwitch { stmt: NodeId, clause: NodeId },
}

macro_rules! define_builtin {
    ($(
        $ident:ident = $string:literal
    ),* $(,)?) => {
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($ident),*
        }

        impl std::fmt::Display for Builtin {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.ident().fmt(f)
            }
        }

        impl Builtin {
            const IDENTS: &[&'static str] = &[ $($string),* ];

            pub fn ident(self) -> &'static str {
                let index = self as u8 as usize;
                Self::IDENTS[index]
            }

            pub fn lookup(name: &str) -> Option<Self> {
                match name {
                    $( $string => Some(Self::$ident), )*
                    _ => None,
                }
            }
        }
    }
}

define_builtin! {
    Bool = "bool",
    Byte = "byte",
    Complex64 = "complex64",
    Complex128 = "complex128",
    Error = "error",
    Float32 = "float32",
    Float64 = "float64",
    Int = "int",
    Int8 = "int8",
    Int16 = "int16",
    Int32 = "int32",
    Int64 = "int64",
    Uint = "uint",
    Uint8 = "uint8",
    Uint16 = "uint16",
    Uint32 = "uint32",
    Uint64 = "uint64",
    Uintptr = "uintptr",
    Rune = "rune",
    String = "string",
    Any = "any",

    True = "true",
    False = "false",
    Iota = "iota",
    Nil = "nil",

    Append = "append",
    Cap = "cap",
    Close = "close",
    Complex = "complex",
    Copy = "copy",
    Delete = "delete",
    Imag = "imag",
    Len = "len",
    Make = "make",
    New = "new",
    Panic = "panic",
    Print = "print",
    Println = "println",
    Real = "real",
    Recover = "recover",
}

/// Resolves every name in the file to the symbol it references.
pub fn resolve(file: &syntax::File) -> Resolution {
    let mut context = NamingContext::new(file);

    for import in &file.imports {
        if let Some(name) = import.name {
            context.add_import(name);
        }
    }

    for &decl in &file.declarations {
        context.declare_global(decl);
    }

    for &decl in &file.declarations {
        context.resolve_global(decl);
    }

    let resolution = context.finish();
    tracing::debug!(
        symbols = resolution.symbols.len(),
        bindings = resolution.bindings.len(),
        "resolved names"
    );
    resolution
}

/// Finds the name of the receiver base type in `func (x *T) f()`.
pub(crate) fn receiver_base(nodes: &syntax::NodeStorage, mut typ: NodeId) -> Option<Text> {
    loop {
        match nodes.kind(typ) {
            Node::Pointer(inner) | Node::Paren(inner) => typ = inner,
            Node::Name(name) => return Some(name),
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn resolve_source(source: &str) -> (syntax::File, Resolution) {
        let file = syntax::parse(source).unwrap();
        let resolution = resolve(&file);
        (file, resolution)
    }

    /// Finds the `Name` nodes whose text is `name`, in source order.
    fn names<'a>(file: &'a syntax::File, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        file.nodes
            .kinds
            .iter()
            .filter(move |(_, kind)| matches!(kind, Node::Name(text) if file.name(*text) == name))
            .map(|(node, _)| node)
    }

    #[test]
    fn package_scope_is_order_independent() {
        let (file, resolution) = resolve_source(
            "package p\nfunc f() int { return g() }\nfunc g() int { return 1 }\n",
        );
        let g: Vec<_> = names(&file, "g").collect();
        assert_eq!(g.len(), 2);
        let use_site = g.iter().copied().find(|&node| !resolution.is_binder(node)).unwrap();
        let binder = resolution.package_scope.get(&file.names.find("g").unwrap()).copied();
        assert_eq!(resolution.symbol(use_site), binder.map(Symbol::Binding));
    }

    #[test]
    fn define_only_binds_new_names() {
        let (file, resolution) = resolve_source(
            "package p\nfunc f() {\n\ta := 1\n\ta, b := 2, 3\n\t_, _ = a, b\n}\n",
        );
        let a: Vec<_> = names(&file, "a").collect();
        assert_eq!(a.len(), 3);
        assert!(resolution.is_binder(a[0]));
        assert_eq!(resolution.symbol(a[1]), Some(Symbol::Binding(a[0])));
        assert_eq!(resolution.symbol(a[2]), Some(Symbol::Binding(a[0])));

        let b: Vec<_> = names(&file, "b").collect();
        assert!(resolution.is_binder(b[0]));
        assert!(matches!(
            resolution.binding(b[0]).unwrap().kind,
            BindingKind::Define { index: 1, .. }
        ));
    }

    #[test]
    fn inner_scopes_shadow() {
        let (file, resolution) = resolve_source(
            "package p\nvar x int\nfunc f() {\n\t{\n\t\tx := \"\"\n\t\t_ = x\n\t}\n\t_ = x\n}\n",
        );
        let x: Vec<_> = names(&file, "x").collect();
        assert_eq!(x.len(), 4);
        assert_eq!(resolution.symbol(x[2]), Some(Symbol::Binding(x[1])));
        assert_eq!(resolution.symbol(x[3]), Some(Symbol::Binding(x[0])));
    }

    #[test]
    fn builtins_and_imports() {
        let (file, resolution) =
            resolve_source("package p\nimport \"fmt\"\nvar x = len(\"a\")\nvar y = fmt.Sprint\n");
        let len = names(&file, "len").next().unwrap();
        assert_eq!(resolution.symbol(len), Some(Symbol::Builtin(Builtin::Len)));
        let fmt = names(&file, "fmt").next().unwrap();
        assert!(matches!(resolution.symbol(fmt), Some(Symbol::Package(_))));
    }

    #[test]
    fn methods_are_grouped_by_receiver() {
        let (file, resolution) = resolve_source(
            "package p\ntype T int\nfunc (t T) A() {}\nfunc (t *T) B() {}\nfunc A() {}\n",
        );
        let t = resolution.package_scope.get(&file.names.find("T").unwrap()).copied().unwrap();
        assert_eq!(resolution.methods[&t].len(), 2);

        let a = file.names.find("A").unwrap();
        let func = resolution.package_scope.get(&a).copied().unwrap();
        assert!(matches!(resolution.binding(func).unwrap().kind, BindingKind::Func(_)));
    }

    #[test]
    fn type_switch_binds_per_clause() {
        let (file, resolution) = resolve_source(
            "package p\nfunc f(x interface{}) {\n\tswitch v := x.(type) {\n\tcase int:\n\t\t_ = v\n\tcase string:\n\t\t_ = v\n\t}\n}\n",
        );
        let v: Vec<_> = names(&file, "v").collect();
        assert_eq!(v.len(), 3);
        let first = resolution.referenced_binding(v[1]).unwrap();
        let second = resolution.referenced_binding(v[2]).unwrap();
        assert_ne!(first.0, second.0);
        assert!(matches!(first.1.kind, BindingKind::TypeSwitch { .. }));
    }
}
