mod parse;

use crate::{
    common::{Interner, Text},
    key::{Key, KeyVec},
    span::FileRange,
};

pub use self::parse::parse;

#[derive(Debug, Clone)]
pub struct File {
    /// The source text the file was parsed from
    pub source: Box<str>,

    /// The name of the package this file is part of
    pub package: Identifier,

    /// List of all imports in the current file
    pub imports: Vec<Import>,

    /// Top-level declarations in source order: functions, methods and one node per spec in
    /// `type`, `var` and `const` declarations.
    pub declarations: Vec<NodeId>,

    /// All syntax nodes in the file
    pub nodes: NodeStorage,

    /// Owns the text of every identifier
    pub names: Interner,
}

impl File {
    pub fn text(&self, node: NodeId) -> &str {
        &self.source[self.nodes.span(node).slice_range()]
    }

    pub fn name(&self, text: Text) -> &str {
        self.names.get(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    /// Name under which the package is referenced (`None` for `_` and `.` imports)
    pub name: Option<Text>,
    pub path: Box<str>,
    pub range: FileRange,
}

/// Contains information about all syntax nodes in a file.
#[derive(Debug, Clone, Default)]
pub struct NodeStorage {
    /// For each node, its kind
    pub kinds: KeyVec<NodeId, Node>,

    /// For each node, its location in the source file
    pub spans: KeyVec<NodeId, FileRange>,

    /// Nodes may refer to multiple child nodes by referencing a range of children here.
    pub indirect: Vec<NodeId>,
}

impl NodeStorage {
    pub fn kind(&self, node: NodeId) -> Node {
        self.kinds[node]
    }

    pub fn span(&self, node: NodeId) -> FileRange {
        self.spans[node]
    }

    pub fn indirect(&self, range: NodeRange) -> &[NodeId] {
        let start = range.start as usize;
        &self.indirect[start..start + range.length as usize]
    }

    pub fn parameter(&self, node: NodeId) -> Parameter {
        match self.kind(node) {
            Node::Parameter(parameter) => parameter,
            kind => unreachable!("not a parameter: {kind:?}"),
        }
    }

    /// Strips any number of parentheses around an expression.
    pub fn unparen(&self, mut node: NodeId) -> NodeId {
        while let Node::Paren(inner) = self.kind(node) {
            node = inner;
        }
        node
    }

    /// Calls `f` with every direct child of `node`.
    pub fn for_each_child(&self, node: NodeId, mut f: impl FnMut(NodeId)) {
        macro_rules! each {
            ($range:expr) => {
                self.indirect($range).iter().copied().for_each(&mut f)
            };
        }

        match self.kind(node) {
            Node::Name(_)
            | Node::Integer(_)
            | Node::Float
            | Node::Imaginary
            | Node::Rune
            | Node::String
            | Node::Empty
            | Node::Branch(_, _) => {}

            Node::Selector(inner, _)
            | Node::Pointer(inner)
            | Node::Slice(inner)
            | Node::Channel(_, inner)
            | Node::EmbeddedElement(inner)
            | Node::Paren(inner)
            | Node::Unary(_, inner)
            | Node::Increment(inner)
            | Node::Decrement(inner)
            | Node::Go(inner)
            | Node::Defer(inner)
            | Node::Labeled(_, inner) => f(inner),

            Node::Array(len, elem) => {
                len.into_iter().for_each(&mut f);
                f(elem);
            }
            Node::Map(a, b)
            | Node::KeyedElement(a, b)
            | Node::Index(a, b)
            | Node::Binary(a, _, b)
            | Node::AssignOp(a, _, b)
            | Node::Send(a, b) => {
                f(a);
                f(b);
            }

            Node::FunctionType(signature) | Node::MethodElement(_, signature) => {
                each!(signature.parameters)
            }
            Node::FunctionLiteral(signature, body) => {
                each!(signature.parameters);
                f(body);
            }
            Node::Parameter(parameter) => {
                parameter.name.into_iter().for_each(&mut f);
                f(parameter.typ);
            }
            Node::Field(field) => f(field.typ),

            Node::Struct(range)
            | Node::Interface(range)
            | Node::Block(range)
            | Node::Return(range)
            | Node::Select(range)
            | Node::DeclStmt(range) => each!(range),

            Node::Composite(typ, elements) => {
                typ.into_iter().for_each(&mut f);
                each!(elements);
            }
            Node::Call(callee, args, _) => {
                f(callee);
                each!(args);
            }
            Node::SliceExpr(base, bounds) => {
                f(base);
                [bounds.low, bounds.high, bounds.max]
                    .into_iter()
                    .flatten()
                    .for_each(&mut f);
            }
            Node::TypeAssertion(base, typ) => {
                f(base);
                typ.into_iter().for_each(&mut f);
            }

            Node::Assign(range) | Node::Define(range) => each!(range.full),

            Node::If(stmt) => {
                stmt.init.into_iter().for_each(&mut f);
                f(stmt.cond);
                f(stmt.then);
                stmt.els.into_iter().for_each(&mut f);
            }
            Node::For(stmt) => {
                [stmt.init, stmt.cond, stmt.post]
                    .into_iter()
                    .flatten()
                    .for_each(&mut f);
                f(stmt.body);
            }
            Node::ForRange(stmt) => {
                [stmt.key, stmt.value].into_iter().flatten().for_each(&mut f);
                f(stmt.expr);
                f(stmt.body);
            }
            Node::Switch(stmt) => {
                [stmt.init, stmt.tag].into_iter().flatten().for_each(&mut f);
                each!(stmt.clauses);
            }
            Node::TypeSwitch(stmt) => {
                [stmt.init, stmt.binding]
                    .into_iter()
                    .flatten()
                    .for_each(&mut f);
                f(stmt.subject);
                each!(stmt.clauses);
            }
            Node::CaseClause(clause) => {
                each!(clause.exprs);
                each!(clause.body);
            }
            Node::CommClause(comm, body) => {
                comm.into_iter().for_each(&mut f);
                each!(body);
            }

            Node::Function(func) => {
                func.receiver.into_iter().for_each(&mut f);
                f(func.name);
                each!(func.signature.parameters);
                func.body.into_iter().for_each(&mut f);
            }
            Node::TypeSpec(spec) => {
                f(spec.name);
                f(spec.typ);
            }
            Node::VarSpec(spec) | Node::ConstSpec(spec) => {
                each!(spec.names);
                spec.typ.into_iter().for_each(&mut f);
                each!(spec.values);
            }
        }
    }
}

/// References a node in the current file.
pub type NodeId = Key<Node>;

/// Refers to a range of nodes in the `indirect` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeRange {
    pub start: u32,
    pub length: u32,
}

impl NodeRange {
    pub fn len(self) -> usize {
        self.length as usize
    }

    pub fn is_empty(self) -> bool {
        self.length == 0
    }

    /// Splits the range into the first `count` nodes and the rest.
    pub fn split_at(self, count: usize) -> (NodeRange, NodeRange) {
        let count = count as u32;
        assert!(count <= self.length);
        let head = NodeRange {
            start: self.start,
            length: count,
        };
        let tail = NodeRange {
            start: self.start + count,
            length: self.length - count,
        };
        (head, tail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub text: Text,
    pub range: FileRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// A generic name that could reference a type or variable depending on context. Also used as
    /// the binding site of names introduced by declarations.
    Name(Text),
    /// References an item within the inner node (could be a field, method or package member)
    Selector(NodeId, Identifier),

    // === Types === //
    Pointer(NodeId),
    /// An array with a given length, or `[...]T` if the length is omitted
    Array(Option<NodeId>, NodeId),
    Slice(NodeId),
    Map(NodeId, NodeId),
    Channel(ChannelKind, NodeId),
    FunctionType(Signature),
    /// A list of `Field` nodes
    Struct(NodeRange),
    Field(Field),
    /// A list of `MethodElement` and `EmbeddedElement` nodes
    Interface(NodeRange),
    MethodElement(Identifier, Signature),
    EmbeddedElement(NodeId),
    Parameter(Parameter),

    // === Expressions === //
    /// An integer literal; values which do not fit are saturated.
    Integer(u64),
    Float,
    Imaginary,
    Rune,
    String,
    /// A composite literal. The type is omitted for elements nested in another literal.
    Composite(Option<NodeId>, NodeRange),
    KeyedElement(NodeId, NodeId),
    FunctionLiteral(Signature, NodeId),
    Paren(NodeId),
    /// A call with its arguments, and whether the last argument is spread with `...`
    Call(NodeId, NodeRange, bool),
    Index(NodeId, NodeId),
    SliceExpr(NodeId, SliceBounds),
    /// `x.(T)`, or `x.(type)` in a type switch
    TypeAssertion(NodeId, Option<NodeId>),
    Unary(UnaryOperator, NodeId),
    Binary(NodeId, BinaryOperator, NodeId),

    // === Statements === //
    Block(NodeRange),
    Empty,
    Assign(AssignRange),
    Define(AssignRange),
    AssignOp(NodeId, BinaryOperator, NodeId),
    Increment(NodeId),
    Decrement(NodeId),
    Send(NodeId, NodeId),
    Return(NodeRange),
    Go(NodeId),
    Defer(NodeId),
    Branch(BranchKind, Option<Identifier>),
    Labeled(Identifier, NodeId),
    If(IfStmt),
    For(ForStmt),
    ForRange(RangeStmt),
    Switch(SwitchStmt),
    TypeSwitch(TypeSwitchStmt),
    CaseClause(CaseClause),
    /// A list of `CommClause`s
    Select(NodeRange),
    /// A communication clause; `None` for `default`
    CommClause(Option<NodeId>, NodeRange),
    /// A list of `TypeSpec`, `VarSpec` or `ConstSpec` nodes
    DeclStmt(NodeRange),

    // === Declarations === //
    Function(FuncDecl),
    TypeSpec(TypeSpec),
    VarSpec(ValueSpec),
    ConstSpec(ValueSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// All parameters in the signature of the function.
    ///
    /// First comes the input arguments, followed by the function outputs. For example, given the
    /// signature `func(a, b int) int` we would have:
    ///
    /// ```text
    /// parameters: [{a int} {b int} {_ int}]
    /// outputs: 1
    /// variadic: false
    /// ```
    pub parameters: NodeRange,

    /// Number of outputs from the function
    pub outputs: u16,

    /// Determines if the last input is declared as `...T`
    pub variadic: bool,
}

impl Signature {
    pub fn inputs(self) -> NodeRange {
        self.parameters
            .split_at(self.parameters.len() - self.outputs as usize)
            .0
    }

    pub fn outputs(self) -> NodeRange {
        self.parameters
            .split_at(self.parameters.len() - self.outputs as usize)
            .1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parameter {
    /// The name of the parameter as a `Name` node, if any
    pub name: Option<NodeId>,
    /// The type of the parameter. The same type node may be reused for multiple parameters.
    pub typ: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// `None` for embedded fields, which are named after their type
    pub name: Option<Identifier>,
    pub typ: NodeId,
    pub embedded: bool,
    pub tag: Option<FileRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceBounds {
    pub low: Option<NodeId>,
    pub high: Option<NodeId>,
    pub max: Option<NodeId>,
}

/// The left and right hand sides of an assignment, stored back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssignRange {
    pub full: NodeRange,
    pub lhs_count: u32,
}

impl AssignRange {
    pub fn lhs(self) -> NodeRange {
        self.full.split_at(self.lhs_count as usize).0
    }

    pub fn rhs(self) -> NodeRange {
        self.full.split_at(self.lhs_count as usize).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfStmt {
    pub init: Option<NodeId>,
    pub cond: NodeId,
    pub then: NodeId,
    pub els: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForStmt {
    pub init: Option<NodeId>,
    pub cond: Option<NodeId>,
    pub post: Option<NodeId>,
    pub body: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeStmt {
    pub key: Option<NodeId>,
    pub value: Option<NodeId>,
    /// `:=` instead of `=`
    pub define: bool,
    pub expr: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchStmt {
    pub init: Option<NodeId>,
    pub tag: Option<NodeId>,
    pub clauses: NodeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSwitchStmt {
    pub init: Option<NodeId>,
    /// The `Name` node bound in `switch x := y.(type)`
    pub binding: Option<NodeId>,
    pub subject: NodeId,
    pub clauses: NodeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseClause {
    /// Expressions, or types in a type switch. Empty for `default`.
    pub exprs: NodeRange,
    pub body: NodeRange,
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncDecl {
    /// A `Parameter` node
    pub receiver: Option<NodeId>,
    /// A `Name` node
    pub name: NodeId,
    pub signature: Signature,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    /// A `Name` node
    pub name: NodeId,
    pub typ: NodeId,
    /// `type A = B`
    pub alias: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueSpec {
    /// `Name` nodes
    pub names: NodeRange,
    pub typ: Option<NodeId>,
    pub values: NodeRange,
    /// The value of `iota` for this spec
    pub iota: u32,
    /// A constant spec which repeats the type and values of the previous spec
    pub implicit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    SendRecv,
    Send,
    Recv,
}

impl ChannelKind {
    pub fn is_send(self) -> bool {
        matches!(self, Self::SendRecv | Self::Send)
    }

    pub fn is_recv(self) -> bool {
        matches!(self, Self::SendRecv | Self::Recv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    Xor,
    Deref,
    Ref,
    Recv,
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::Xor => "^",
            UnaryOperator::Deref => "*",
            UnaryOperator::Ref => "&",
            UnaryOperator::Recv => "<-",
        };
        f.write_str(text)
    }
}

/// All binary operators, listed in order of ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    LogicalOr,
    LogicalAnd,

    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    Add,
    Sub,
    BitOr,
    BitXor,

    Mul,
    Div,
    Rem,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitNand,
}

impl BinaryOperator {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::LogicalOr => 1,
            BinaryOperator::LogicalAnd => 2,

            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => 3,

            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::BitOr
            | BinaryOperator::BitXor => 4,

            BinaryOperator::Mul
            | BinaryOperator::Div
            | BinaryOperator::Rem
            | BinaryOperator::ShiftLeft
            | BinaryOperator::ShiftRight
            | BinaryOperator::BitAnd
            | BinaryOperator::BitNand => 5,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::LogicalOr | BinaryOperator::LogicalAnd)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight)
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitNand => "&^",
        };
        f.write_str(text)
    }
}
