mod arity;
mod assign;
mod context;
mod eval;
mod methods;
mod operator;

use std::fmt::Formatter;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    common::{Interner, Text},
    naming::{BindingKind, Builtin, Resolution, Symbol},
    syntax::{self, ChannelKind, Node, NodeId},
    util::{display_fn, write_separated},
    Diagnostic, HashMap, HashSet,
};

use self::assign::Verdict;
use self::context::{Checker, Operand};
use self::methods::Selection;

/// A handle to an interned type. Two handles are equal iff their kinds are structurally equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Type {
    id: u32,
}

impl Type {
    /// Always the first type in every table.
    pub const INVALID: Type = Type { id: 0 };

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Type({})", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The result of an erroneous expression. Compatible with everything.
    Invalid,

    Untyped(ConstantKind),

    Builtin(Builtin),

    Bool,

    Int,
    Int8,
    Int16,
    Int32,
    Int64,

    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,

    Uintptr,

    Float32,
    Float64,

    Complex64,
    Complex128,

    String,

    // aliases of `uint8` and `int32` which keep their name when displayed
    Byte,
    Rune,

    Error,

    Pointer(Type),
    Slice(Type),
    Array(u64, Type),
    Map(Type, Type),
    Channel(ChannelKind, Type),

    Function(FunctionType),
    Struct(StructType),
    Interface(InterfaceType),

    /// A declared type `type Foo <type>`, identified by the `Name` node which binds it.
    Declared(NodeId),
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeClass: u16 {
        const UNTYPED = 0x01;
        const STRING = 0x02;
        const INTEGER = 0x04;
        const RUNE = 0x08;
        const FLOAT = 0x10;
        const COMPLEX = 0x20;
        const NILLABLE = 0x40;
        const SIGNED = 0x80;
        const BOOLEAN = 0x400;

        const TRIVIALLY_COMPARABLE = 0x100;
        const TRIVIALLY_ORDERED = 0x200 | Self::TRIVIALLY_COMPARABLE.bits();

        const NUMERIC = Self::INTEGER.bits() | Self::FLOAT.bits() | Self::COMPLEX.bits();
    }
}

impl TypeClass {
    pub fn is_untyped(self) -> bool {
        self.contains(Self::UNTYPED)
    }

    pub fn is_integer(self) -> bool {
        self.contains(Self::INTEGER)
    }

    pub fn is_signed(self) -> bool {
        self.contains(Self::SIGNED)
    }

    pub fn is_numeric(self) -> bool {
        self.intersects(Self::NUMERIC)
    }

    pub fn is_string(self) -> bool {
        self.contains(Self::STRING)
    }

    pub fn is_boolean(self) -> bool {
        self.contains(Self::BOOLEAN)
    }
}

impl TypeKind {
    pub fn class(&self) -> TypeClass {
        let untyped = TypeClass::UNTYPED;
        let comparable = TypeClass::TRIVIALLY_COMPARABLE;
        let ordered = TypeClass::TRIVIALLY_ORDERED;
        let nillable = TypeClass::NILLABLE;
        let signed = TypeClass::SIGNED;

        match self {
            TypeKind::Untyped(kind) => match kind {
                ConstantKind::Boolean => TypeClass::BOOLEAN | untyped | comparable,
                ConstantKind::Rune => TypeClass::RUNE | TypeClass::INTEGER | untyped | ordered,
                ConstantKind::Integer => TypeClass::INTEGER | untyped | ordered | signed,
                ConstantKind::Float => TypeClass::FLOAT | untyped | ordered | signed,
                ConstantKind::Complex => TypeClass::COMPLEX | untyped | comparable | signed,
                ConstantKind::String => TypeClass::STRING | untyped | ordered,
                ConstantKind::Nil => nillable | untyped | comparable,
            },

            TypeKind::Invalid | TypeKind::Builtin(_) => TypeClass::empty(),
            TypeKind::Bool => TypeClass::BOOLEAN | comparable,

            TypeKind::Int
            | TypeKind::Int8
            | TypeKind::Int16
            | TypeKind::Int32
            | TypeKind::Int64 => TypeClass::INTEGER | ordered | signed,
            TypeKind::Rune => TypeClass::RUNE | TypeClass::INTEGER | ordered | signed,

            TypeKind::Uint
            | TypeKind::Uint8
            | TypeKind::Uint16
            | TypeKind::Uint32
            | TypeKind::Uint64
            | TypeKind::Uintptr
            | TypeKind::Byte => TypeClass::INTEGER | ordered,

            TypeKind::Float32 | TypeKind::Float64 => TypeClass::FLOAT | ordered | signed,
            TypeKind::Complex64 | TypeKind::Complex128 => TypeClass::COMPLEX | comparable | signed,

            TypeKind::Error => nillable | comparable,
            TypeKind::String => TypeClass::STRING | ordered,

            TypeKind::Pointer(_) => nillable | comparable,
            TypeKind::Slice(_) => nillable,
            TypeKind::Map(_, _) => nillable,
            TypeKind::Channel(_, _) => nillable | comparable,
            TypeKind::Function(_) => nillable,

            TypeKind::Struct(_) => TypeClass::empty(),
            TypeKind::Array(_, _) => TypeClass::empty(),

            TypeKind::Interface(_) => nillable | comparable,

            TypeKind::Declared(_) => TypeClass::empty(),
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Self::Untyped(_))
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, Self::Declared(_))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Error)
    }

    /// Can hold the value `nil`.
    pub fn is_nillable(&self) -> bool {
        matches!(
            self,
            Self::Pointer(_)
                | Self::Slice(_)
                | Self::Map(_, _)
                | Self::Channel(_, _)
                | Self::Function(_)
                | Self::Interface(_)
                | Self::Error
        )
    }
}

/// The kind of an untyped constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstantKind {
    Boolean,
    Integer,
    Rune,
    Float,
    Complex,
    String,
    Nil,
}

impl ConstantKind {
    pub fn default_type(self) -> Option<TypeKind> {
        match self {
            ConstantKind::Boolean => Some(TypeKind::Bool),
            ConstantKind::Rune => Some(TypeKind::Rune),
            ConstantKind::Integer => Some(TypeKind::Int),
            ConstantKind::Float => Some(TypeKind::Float64),
            ConstantKind::Complex => Some(TypeKind::Complex128),
            ConstantKind::String => Some(TypeKind::String),
            ConstantKind::Nil => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ConstantKind::Integer | ConstantKind::Rune | ConstantKind::Float | ConstantKind::Complex
        )
    }
}

pub type TypeList = SmallVec<[Type; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// The inputs followed by the outputs. A variadic input is stored as a slice.
    types: Arc<[Type]>,
    inputs: usize,
    variadic: bool,
}

impl FunctionType {
    pub fn new(inputs: &[Type], outputs: &[Type], variadic: bool) -> Self {
        let types = inputs.iter().chain(outputs).copied().collect();
        Self {
            types,
            inputs: inputs.len(),
            variadic,
        }
    }

    pub fn inputs(&self) -> &[Type] {
        &self.types[..self.inputs]
    }

    pub fn outputs(&self) -> &[Type] {
        &self.types[self.inputs..]
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Inputs which must always be given an argument.
    pub fn required_inputs(&self) -> &[Type] {
        &self.types[..self.inputs - self.variadic as usize]
    }

    /// The same function with `receiver` as its first input.
    pub fn with_receiver(&self, receiver: Type) -> Self {
        let mut inputs = Vec::with_capacity(self.inputs + 1);
        inputs.push(receiver);
        inputs.extend_from_slice(self.inputs());
        Self::new(&inputs, self.outputs(), self.variadic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructType {
    pub fields: Arc<[Field]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Embedded fields are named after their type.
    pub name: Text,
    pub typ: Type,
    pub embedded: bool,
}

impl StructType {
    pub fn get_field(&self, name: Text) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    /// Methods declared directly in the interface, sorted by name.
    pub methods: Arc<[InterfaceMethod]>,
    /// Embedded interfaces, in declaration order.
    pub embedded: Arc<[Type]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceMethod {
    pub name: Text,
    pub signature: FunctionType,
}

/// Interns types so that they can be compared by handle.
pub struct TypeTable {
    kinds: Vec<TypeKind>,
    lookup: HashMap<TypeKind, Type>,
}

impl Default for TypeTable {
    fn default() -> Self {
        let mut table = Self {
            kinds: Vec::new(),
            lookup: HashMap::default(),
        };
        let invalid = table.intern(TypeKind::Invalid);
        debug_assert_eq!(invalid, Type::INVALID);
        table
    }
}

impl TypeTable {
    pub fn intern(&mut self, kind: TypeKind) -> Type {
        if let Some(&existing) = self.lookup.get(&kind) {
            return existing;
        }

        let typ = Type {
            id: self.kinds.len() as u32,
        };
        self.kinds.push(kind.clone());
        self.lookup.insert(kind, typ);
        typ
    }

    pub fn get(&self, typ: Type) -> &TypeKind {
        &self.kinds[typ.id as usize]
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

/// Holds the types computed so far while checking a single file.
pub struct Session<'a> {
    pub file: &'a syntax::File,
    pub resolution: &'a Resolution,

    /// Identifiers of the file, extended with the names the checker needs on its own.
    names: Interner,
    error_method: Text,

    types: TypeTable,

    /// The type of every binding computed so far.
    binding_types: HashMap<NodeId, Type>,
    /// For every declared type, its underlying type.
    underlying: HashMap<NodeId, Type>,
    /// Bindings whose type is currently being computed.
    in_progress: HashSet<NodeId>,

    signatures: HashMap<NodeId, FunctionType>,
    selections: HashMap<(Type, Text), Option<Selection>>,
    interface_methods: HashMap<Type, Arc<[InterfaceMethod]>>,
}

impl<'a> Session<'a> {
    pub fn new(file: &'a syntax::File, resolution: &'a Resolution) -> Self {
        let mut names = file.names.clone();
        let error_method = names.intern("Error");

        Self {
            file,
            resolution,
            names,
            error_method,
            types: TypeTable::default(),
            binding_types: HashMap::default(),
            underlying: HashMap::default(),
            in_progress: HashSet::default(),
            signatures: HashMap::default(),
            selections: HashMap::default(),
            interface_methods: HashMap::default(),
        }
    }

    pub fn intern(&mut self, kind: TypeKind) -> Type {
        self.types.intern(kind)
    }

    pub fn lookup(&self, typ: Type) -> &TypeKind {
        self.types.get(typ)
    }

    pub fn untyped(&mut self, kind: ConstantKind) -> Type {
        self.intern(TypeKind::Untyped(kind))
    }

    pub fn name(&self, text: Text) -> &str {
        self.names.get(text)
    }

    pub fn span(&self, node: NodeId) -> crate::span::FileRange {
        self.file.nodes.span(node)
    }

    pub fn text(&self, node: NodeId) -> &'a str {
        self.file.text(node)
    }

    pub fn class(&mut self, typ: Type) -> TypeClass {
        let underlying = self.underlying(typ);
        self.lookup(underlying).class()
    }

    /// The type of an untyped constant when it is used as a value.
    pub fn default_type(&mut self, typ: Type) -> Type {
        match self.lookup(typ) {
            TypeKind::Untyped(kind) => match kind.default_type() {
                Some(kind) => self.intern(kind),
                None => Type::INVALID,
            },
            _ => typ,
        }
    }

    /// Follows declared types until reaching a type literal or predeclared type.
    pub fn underlying(&mut self, typ: Type) -> Type {
        let TypeKind::Declared(binder) = *self.lookup(typ) else { return typ };

        if let Some(&underlying) = self.underlying.get(&binder) {
            return underlying;
        }

        if !self.in_progress.insert(binder) {
            tracing::debug!(binder = ?binder, "cyclic type declaration");
            return Type::INVALID;
        }

        let underlying = match self.type_spec(binder) {
            Some(spec) => {
                let inner = self.resolve_type(spec.typ);
                self.underlying(inner)
            }
            None => Type::INVALID,
        };

        self.in_progress.remove(&binder);
        self.underlying.insert(binder, underlying);
        underlying
    }

    fn type_spec(&self, binder: NodeId) -> Option<syntax::TypeSpec> {
        let binding = self.resolution.binding(binder)?;
        let BindingKind::Type(spec) = binding.kind else { return None };
        match self.file.nodes.kind(spec) {
            Node::TypeSpec(spec) => Some(spec),
            _ => None,
        }
    }

    /// The type introduced by the type declaration bound by `binder`.
    pub fn declared_type(&mut self, binder: NodeId) -> Type {
        let Some(spec) = self.type_spec(binder) else { return Type::INVALID };

        if !spec.alias {
            return self.intern(TypeKind::Declared(binder));
        }

        if let Some(&typ) = self.binding_types.get(&binder) {
            return typ;
        }

        if !self.in_progress.insert(binder) {
            tracing::debug!(binder = ?binder, "cyclic type alias");
            return Type::INVALID;
        }
        let typ = self.resolve_type(spec.typ);
        self.in_progress.remove(&binder);
        self.binding_types.insert(binder, typ);
        typ
    }

    pub fn builtin_type(&mut self, builtin: Builtin) -> Option<Type> {
        let kind = match builtin {
            Builtin::Bool => TypeKind::Bool,
            Builtin::Byte => TypeKind::Byte,
            Builtin::Complex64 => TypeKind::Complex64,
            Builtin::Complex128 => TypeKind::Complex128,
            Builtin::Error => TypeKind::Error,
            Builtin::Float32 => TypeKind::Float32,
            Builtin::Float64 => TypeKind::Float64,
            Builtin::Int => TypeKind::Int,
            Builtin::Int8 => TypeKind::Int8,
            Builtin::Int16 => TypeKind::Int16,
            Builtin::Int32 => TypeKind::Int32,
            Builtin::Int64 => TypeKind::Int64,
            Builtin::Uint => TypeKind::Uint,
            Builtin::Uint8 => TypeKind::Uint8,
            Builtin::Uint16 => TypeKind::Uint16,
            Builtin::Uint32 => TypeKind::Uint32,
            Builtin::Uint64 => TypeKind::Uint64,
            Builtin::Uintptr => TypeKind::Uintptr,
            Builtin::Rune => TypeKind::Rune,
            Builtin::String => TypeKind::String,
            Builtin::Any => TypeKind::Interface(InterfaceType {
                methods: Arc::new([]),
                embedded: Arc::new([]),
            }),
            _ => return None,
        };
        Some(self.intern(kind))
    }

    /// Get the type represented by the given syntax tree.
    pub fn resolve_type(&mut self, node: NodeId) -> Type {
        let file = self.file;
        let nodes = &file.nodes;
        match nodes.kind(node) {
            Node::Name(_) => match self.resolution.symbol(node) {
                Some(Symbol::Binding(binder)) => self.declared_type(binder),
                Some(Symbol::Builtin(builtin)) => {
                    self.builtin_type(builtin).unwrap_or(Type::INVALID)
                }
                Some(Symbol::Package(_)) | None => Type::INVALID,
            },
            // types from other packages are not known
            Node::Selector(_, _) => Type::INVALID,
            Node::Paren(inner) => self.resolve_type(inner),
            Node::Pointer(inner) => {
                let inner = self.resolve_type(inner);
                self.intern(TypeKind::Pointer(inner))
            }
            Node::Array(len, inner) => {
                let len = match len {
                    Some(len) => match eval::const_integer(self, len) {
                        Some(len) if len >= 0 => len as u64,
                        _ => {
                            tracing::debug!(node = ?len, "array length is not a known constant");
                            return Type::INVALID;
                        }
                    },
                    None => {
                        tracing::debug!(node = ?node, "array length must be inferred from a literal");
                        return Type::INVALID;
                    }
                };
                let inner = self.resolve_type(inner);
                self.intern(TypeKind::Array(len, inner))
            }
            Node::Slice(inner) => {
                let inner = self.resolve_type(inner);
                self.intern(TypeKind::Slice(inner))
            }
            Node::Map(key, value) => {
                let key = self.resolve_type(key);
                let value = self.resolve_type(value);
                self.intern(TypeKind::Map(key, value))
            }
            Node::Channel(kind, inner) => {
                let inner = self.resolve_type(inner);
                self.intern(TypeKind::Channel(kind, inner))
            }
            Node::FunctionType(signature) => {
                let func = self.resolve_signature(signature);
                self.intern(TypeKind::Function(func))
            }
            Node::Struct(field_nodes) => {
                let mut fields = Vec::with_capacity(field_nodes.len());
                for &field in nodes.indirect(field_nodes) {
                    let Node::Field(field) = nodes.kind(field) else { continue };
                    let name = match field.name {
                        Some(name) => name.text,
                        None => embedded_name(nodes, field.typ).unwrap_or(Text::BLANK),
                    };
                    let typ = self.resolve_type(field.typ);
                    fields.push(Field {
                        name,
                        typ,
                        embedded: field.embedded,
                    });
                }
                self.intern(TypeKind::Struct(StructType {
                    fields: fields.into(),
                }))
            }
            Node::Interface(elements) => {
                let mut methods = Vec::with_capacity(elements.len());
                let mut embedded = Vec::new();
                for &element in nodes.indirect(elements) {
                    match nodes.kind(element) {
                        Node::MethodElement(name, signature) => {
                            let signature = self.resolve_signature(signature);
                            methods.push(InterfaceMethod {
                                name: name.text,
                                signature,
                            });
                        }
                        Node::EmbeddedElement(typ) => embedded.push(self.resolve_type(typ)),
                        _ => {}
                    }
                }
                methods.sort_by(|a, b| self.names.get(a.name).cmp(self.names.get(b.name)));
                self.intern(TypeKind::Interface(InterfaceType {
                    methods: methods.into(),
                    embedded: embedded.into(),
                }))
            }
            kind => {
                tracing::trace!(?kind, "not a type");
                Type::INVALID
            }
        }
    }

    pub fn resolve_signature(&mut self, signature: syntax::Signature) -> FunctionType {
        let file = self.file;
        let nodes = &file.nodes;
        let inputs = signature.inputs();
        let mut types = TypeList::with_capacity(signature.parameters.len());

        for (i, &node) in nodes.indirect(signature.parameters).iter().enumerate() {
            let param = nodes.parameter(node);
            let mut typ = self.resolve_type(param.typ);
            if signature.variadic && i + 1 == inputs.len() {
                typ = self.intern(TypeKind::Slice(typ));
            }
            types.push(typ);
        }

        let (inputs, outputs) = types.split_at(inputs.len());
        FunctionType::new(inputs, outputs, signature.variadic)
    }

    /// The signature of a function or method declaration, without its receiver.
    pub fn function_signature(&mut self, decl: NodeId) -> FunctionType {
        if let Some(signature) = self.signatures.get(&decl) {
            return signature.clone();
        }

        let signature = match self.file.nodes.kind(decl) {
            Node::Function(func) => self.resolve_signature(func.signature),
            _ => FunctionType::new(&[], &[], false),
        };
        self.signatures.insert(decl, signature.clone());
        signature
    }

    pub fn display(&self, typ: Type) -> impl std::fmt::Display + '_ {
        display_fn(move |f| self.fmt_type(f, typ))
    }

    fn fmt_type(&self, f: &mut Formatter<'_>, typ: Type) -> std::fmt::Result {
        match self.lookup(typ) {
            TypeKind::Invalid => write!(f, "invalid type"),
            TypeKind::Untyped(kind) => match kind {
                ConstantKind::Nil => write!(f, "nil"),
                ConstantKind::Boolean => write!(f, "bool"),
                ConstantKind::String => write!(f, "string"),
                ConstantKind::Integer => write!(f, "untyped int"),
                ConstantKind::Rune => write!(f, "untyped rune"),
                ConstantKind::Float => write!(f, "untyped float64"),
                ConstantKind::Complex => write!(f, "untyped complex128"),
            },
            TypeKind::Builtin(builtin) => write!(f, "{builtin}"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::Int8 => write!(f, "int8"),
            TypeKind::Int16 => write!(f, "int16"),
            TypeKind::Int32 => write!(f, "int32"),
            TypeKind::Int64 => write!(f, "int64"),
            TypeKind::Uint => write!(f, "uint"),
            TypeKind::Uint8 => write!(f, "uint8"),
            TypeKind::Uint16 => write!(f, "uint16"),
            TypeKind::Uint32 => write!(f, "uint32"),
            TypeKind::Uint64 => write!(f, "uint64"),
            TypeKind::Uintptr => write!(f, "uintptr"),
            TypeKind::Float32 => write!(f, "float32"),
            TypeKind::Float64 => write!(f, "float64"),
            TypeKind::Complex64 => write!(f, "complex64"),
            TypeKind::Complex128 => write!(f, "complex128"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Byte => write!(f, "byte"),
            TypeKind::Rune => write!(f, "rune"),
            TypeKind::Error => write!(f, "error"),
            TypeKind::Pointer(inner) => write!(f, "*{}", self.display(*inner)),
            TypeKind::Slice(inner) => write!(f, "[]{}", self.display(*inner)),
            TypeKind::Array(len, inner) => write!(f, "[{len}]{}", self.display(*inner)),
            TypeKind::Map(key, value) => {
                write!(f, "map[{}]{}", self.display(*key), self.display(*value))
            }
            TypeKind::Channel(ChannelKind::SendRecv, inner) => {
                write!(f, "chan {}", self.display(*inner))
            }
            TypeKind::Channel(ChannelKind::Send, inner) => {
                write!(f, "chan<- {}", self.display(*inner))
            }
            TypeKind::Channel(ChannelKind::Recv, inner) => {
                write!(f, "<-chan {}", self.display(*inner))
            }
            TypeKind::Function(func) => {
                write!(f, "func")?;
                self.fmt_signature(f, func)
            }
            TypeKind::Struct(strukt) => {
                write!(f, "struct{{")?;
                write_separated(f, strukt.fields.iter(), "; ", |f, field| {
                    if field.embedded {
                        write!(f, "{}", self.display(field.typ))
                    } else {
                        write!(f, "{} {}", self.name(field.name), self.display(field.typ))
                    }
                })?;
                write!(f, "}}")
            }
            TypeKind::Interface(interface) => {
                write!(f, "interface{{")?;
                let methods = interface.methods.iter().map(Ok);
                let embedded = interface.embedded.iter().map(Err);
                write_separated(f, methods.chain(embedded), "; ", |f, element| match element {
                    Ok(method) => {
                        write!(f, "{}", self.name(method.name))?;
                        self.fmt_signature(f, &method.signature)
                    }
                    Err(embedded) => write!(f, "{}", self.display(*embedded)),
                })?;
                write!(f, "}}")
            }
            TypeKind::Declared(binder) => match self.file.nodes.kind(*binder) {
                Node::Name(name) => write!(f, "{}", self.name(name)),
                _ => write!(f, "invalid type"),
            },
        }
    }

    fn fmt_signature(&self, f: &mut Formatter<'_>, func: &FunctionType) -> std::fmt::Result {
        write!(f, "(")?;
        let inputs = func.inputs();
        write_separated(f, inputs.iter().enumerate(), ", ", |f, (i, &input)| {
            if func.variadic && i + 1 == inputs.len() {
                if let TypeKind::Slice(inner) = self.lookup(input) {
                    return write!(f, "...{}", self.display(*inner));
                }
            }
            write!(f, "{}", self.display(input))
        })?;
        write!(f, ")")?;

        match func.outputs() {
            [] => Ok(()),
            [single] => write!(f, " {}", self.display(*single)),
            outputs => {
                write!(f, " (")?;
                write_separated(f, outputs, ", ", |f, output| {
                    write!(f, "{}", self.display(*output))
                })?;
                write!(f, ")")
            }
        }
    }
}

/// Embedded fields are named after the type name, without any package qualifier or pointer.
fn embedded_name(nodes: &syntax::NodeStorage, mut typ: NodeId) -> Option<Text> {
    loop {
        match nodes.kind(typ) {
            Node::Pointer(inner) | Node::Paren(inner) => typ = inner,
            Node::Name(name) => return Some(name),
            Node::Selector(_, member) => return Some(member.text),
            _ => return None,
        }
    }
}

/// Type checks every declaration in the file.
pub fn check(session: &mut Session) -> Vec<Diagnostic> {
    let file = session.file;
    let mut diagnostics = Vec::new();

    for &decl in &file.declarations {
        let mut checker = Checker::new(session);
        checker.check_declaration(decl);
        diagnostics.extend(checker.finish());
    }

    tracing::debug!(
        types = session.types.len(),
        diagnostics = diagnostics.len(),
        "type checked file"
    );
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::naming;

    pub(super) struct Fixture {
        pub file: syntax::File,
        pub resolution: Resolution,
    }

    impl Fixture {
        pub fn new(source: &str) -> Self {
            let file = syntax::parse(source).unwrap();
            let resolution = naming::resolve(&file);
            Self { file, resolution }
        }

        pub fn session(&self) -> Session<'_> {
            Session::new(&self.file, &self.resolution)
        }

        /// The package-level binding with the given name.
        pub fn global(&self, name: &str) -> NodeId {
            let text = self.file.names.find(name).unwrap();
            self.resolution.package_scope.get(&text).copied().unwrap()
        }

        pub fn diagnostics(&self) -> Vec<Diagnostic> {
            let mut session = self.session();
            let mut diagnostics = check(&mut session);
            diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            diagnostics
        }

        pub fn messages(&self) -> Vec<String> {
            self.diagnostics()
                .into_iter()
                .map(|diagnostic| diagnostic.message)
                .collect()
        }
    }

    #[test]
    fn interning_is_structural() {
        let mut table = TypeTable::default();
        let int = table.intern(TypeKind::Int);
        let a = table.intern(TypeKind::Slice(int));
        let b = table.intern(TypeKind::Slice(int));
        assert_eq!(a, b);
        assert_ne!(a, int);
        assert_eq!(table.get(a), &TypeKind::Slice(int));
        assert!(table.intern(TypeKind::Invalid).is_invalid());
    }

    #[test]
    fn display_type_literals() {
        let fixture = Fixture::new(
            "package p
            type I interface { g(a int) string; f(); error }
            type S struct { a, b int; I; c *S }
            type F func(x int, rest ...string) (int, error)
            type C <-chan []map[string]bool
            type A [2 * 4]byte
            ",
        );
        let mut session = fixture.session();

        let mut underlying = |name: &str| {
            let typ = session.declared_type(fixture.global(name));
            let underlying = session.underlying(typ);
            session.display(underlying).to_string()
        };

        assert_eq!(underlying("I"), "interface{f(); g(int) string; error}");
        assert_eq!(underlying("S"), "struct{a int; b int; I; c *S}");
        assert_eq!(underlying("F"), "func(int, ...string) (int, error)");
        assert_eq!(underlying("C"), "<-chan []map[string]bool");
        assert_eq!(underlying("A"), "[8]byte");
    }

    #[test]
    fn display_untyped_constants() {
        let fixture = Fixture::new("package p\n");
        let mut session = fixture.session();
        let mut display = |kind| {
            let typ = session.untyped(kind);
            session.display(typ).to_string()
        };
        assert_eq!(display(ConstantKind::Integer), "untyped int");
        assert_eq!(display(ConstantKind::Rune), "untyped rune");
        assert_eq!(display(ConstantKind::Float), "untyped float64");
        assert_eq!(display(ConstantKind::Complex), "untyped complex128");
        assert_eq!(display(ConstantKind::String), "string");
        assert_eq!(display(ConstantKind::Nil), "nil");
    }

    #[test]
    fn aliases_and_declared_types() {
        let fixture = Fixture::new(
            "package p
            type A = []B
            type B C
            type C int
            type Loop Loop
            ",
        );
        let mut session = fixture.session();

        let a = session.declared_type(fixture.global("A"));
        assert_eq!(session.display(a).to_string(), "[]B");

        let b = session.declared_type(fixture.global("B"));
        let int = session.intern(TypeKind::Int);
        assert_eq!(session.underlying(b), int);

        let looping = session.declared_type(fixture.global("Loop"));
        assert!(session.underlying(looping).is_invalid());
    }

    #[test]
    fn variadic_inputs_are_slices() {
        let fixture = Fixture::new("package p\nfunc f(a int, b ...string) {}\n");
        let mut session = fixture.session();
        let signature = session.function_signature(fixture.global("f"));
        assert!(signature.is_variadic());
        assert_eq!(signature.inputs().len(), 2);
        assert_eq!(signature.required_inputs().len(), 1);
        assert_eq!(session.display(signature.inputs()[1]).to_string(), "[]string");
    }
}
