//! Type inference for expressions, and checking of statements within a declaration.

use smallvec::smallvec;

use crate::{
    common::Text,
    diagnostic::ProblemKind,
    naming::{BindingKind, Builtin, Symbol},
    span::FileRange,
    syntax::{self, Node, NodeId, NodeRange},
    Diagnostic,
};

use super::{
    eval, ConstantKind, FunctionType, Selection, Session, Type, TypeKind, TypeList, Verdict,
};

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// The expression is erroneous or its type cannot be known. Never reported again.
    Invalid,
    Value(Type),
    /// A single value which produces an additional untyped boolean when assigned to two
    /// targets: map indices, channel receives and type assertions.
    CommaOk(Type),
    /// The results of a call which does not return exactly one value.
    Tuple(TypeList),
    /// The expression denotes a type.
    Type(Type),
    Builtin(Builtin),
    Package,
}

impl Operand {
    /// The values produced when used on its own, if known.
    pub fn values(&self) -> Option<TypeList> {
        match self {
            Operand::Value(typ) | Operand::CommaOk(typ) => Some(smallvec![*typ]),
            Operand::Tuple(types) => Some(types.clone()),
            Operand::Invalid | Operand::Type(_) | Operand::Builtin(_) | Operand::Package => None,
        }
    }
}

/// The number of values expected where an expression is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Unconstrained,
    /// Exactly one value, optionally assignable to a known type.
    Single(Option<Type>),
    Multi(usize),
}

/// Checks the expressions and statements of a single declaration.
pub struct Checker<'s, 'a> {
    pub(super) session: &'s mut Session<'a>,
    diagnostics: Vec<Diagnostic>,
    /// The signatures of the enclosing functions, innermost last.
    pub(super) results: Vec<FunctionType>,
    /// Used while computing the types of bindings, which are checked where they are declared.
    silent: bool,
}

impl<'s, 'a> Checker<'s, 'a> {
    pub fn new(session: &'s mut Session<'a>) -> Self {
        Self {
            session,
            diagnostics: Vec::new(),
            results: Vec::new(),
            silent: false,
        }
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub(super) fn emit(&mut self, diagnostic: Diagnostic) {
        if !self.silent {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Runs `f` in a checker which does not report anything.
    fn silently<T>(&mut self, f: impl FnOnce(&mut Checker<'_, 'a>) -> T) -> T {
        let mut checker = Checker {
            session: &mut *self.session,
            diagnostics: Vec::new(),
            results: Vec::new(),
            silent: true,
        };
        f(&mut checker)
    }

    pub(super) fn nodes(&self) -> &'a syntax::NodeStorage {
        let file: &'a syntax::File = self.session.file;
        &file.nodes
    }

    pub(super) fn span(&self, node: NodeId) -> FileRange {
        self.session.span(node)
    }

    pub(super) fn text(&self, node: NodeId) -> &'a str {
        self.session.text(node)
    }

    pub fn check_declaration(&mut self, decl: NodeId) {
        tracing::debug!(?decl, "checking declaration");
        match self.nodes().kind(decl) {
            Node::Function(func) => {
                if let Some(body) = func.body {
                    let signature = self.session.function_signature(decl);
                    self.check_body(signature, body);
                }
            }
            Node::VarSpec(_) | Node::ConstSpec(_) => self.check_value_spec(decl),
            Node::TypeSpec(spec) => {
                self.session.resolve_type(spec.typ);
            }
            kind => tracing::trace!(?kind, "not a declaration"),
        }
    }

    fn check_body(&mut self, signature: FunctionType, body: NodeId) {
        self.results.push(signature);
        self.check_statement(body);
        self.results.pop();
    }

    fn check_block(&mut self, statements: NodeRange) {
        for &statement in self.nodes().indirect(statements) {
            self.check_statement(statement);
        }
    }

    pub fn check_statement(&mut self, stmt: NodeId) {
        let nodes = self.nodes();
        match nodes.kind(stmt) {
            Node::Block(statements) => self.check_block(statements),
            Node::Empty | Node::Branch(..) => {}
            Node::Labeled(_, inner) => self.check_statement(inner),

            Node::Assign(assign) => self.check_assignment(stmt, assign),
            Node::Define(assign) => self.check_define(stmt, assign),
            Node::AssignOp(lhs, op, rhs) => self.check_assign_op(stmt, lhs, op, rhs),
            Node::Increment(target) | Node::Decrement(target) => {
                self.check_increment(stmt, target)
            }
            Node::Send(channel, value) => self.check_send(stmt, channel, value),
            Node::Return(values) => self.check_return(stmt, values),

            Node::Go(call) | Node::Defer(call) => {
                self.infer(call);
            }

            Node::If(stmt) => {
                if let Some(init) = stmt.init {
                    self.check_statement(init);
                }
                self.check_condition(stmt.cond);
                self.check_statement(stmt.then);
                if let Some(els) = stmt.els {
                    self.check_statement(els);
                }
            }
            Node::For(stmt) => {
                if let Some(init) = stmt.init {
                    self.check_statement(init);
                }
                if let Some(cond) = stmt.cond {
                    self.check_condition(cond);
                }
                if let Some(post) = stmt.post {
                    self.check_statement(post);
                }
                self.check_statement(stmt.body);
            }
            Node::ForRange(range) => self.check_range(range),

            Node::Switch(switch) => {
                if let Some(init) = switch.init {
                    self.check_statement(init);
                }
                let tag = switch.tag.map(|tag| (tag, self.value(tag)));
                for &clause in nodes.indirect(switch.clauses) {
                    let Node::CaseClause(clause) = nodes.kind(clause) else { continue };
                    for &expr in nodes.indirect(clause.exprs) {
                        match tag {
                            Some((tag, tag_type)) => self.check_case(expr, tag, tag_type),
                            None => self.check_condition(expr),
                        }
                    }
                    self.check_block(clause.body);
                }
            }
            Node::TypeSwitch(switch) => {
                if let Some(init) = switch.init {
                    self.check_statement(init);
                }
                self.value(switch.subject);
                for &clause in nodes.indirect(switch.clauses) {
                    let Node::CaseClause(clause) = nodes.kind(clause) else { continue };
                    self.check_block(clause.body);
                }
            }
            Node::Select(clauses) => {
                for &clause in nodes.indirect(clauses) {
                    let Node::CommClause(comm, body) = nodes.kind(clause) else { continue };
                    if let Some(comm) = comm {
                        self.check_statement(comm);
                    }
                    self.check_block(body);
                }
            }

            Node::DeclStmt(specs) => {
                for &spec in nodes.indirect(specs) {
                    self.check_declaration(spec);
                }
            }

            // expression statement
            _ => {
                self.infer(stmt);
            }
        }
    }

    fn check_condition(&mut self, cond: NodeId) {
        let bool = self.session.intern(TypeKind::Bool);
        self.expect(cond, bool);
    }

    fn check_case(&mut self, expr: NodeId, tag: NodeId, tag_type: Type) {
        let typ = self.value(expr);
        if self.session.assignable(typ, tag_type).is_assignable()
            || self.session.assignable(tag_type, typ).is_assignable()
        {
            return;
        }
        let diagnostic = problem!(
            ProblemKind::OperatorTypeMismatch,
            self.span(expr),
            "invalid case {} in switch on {} (mismatched types {} and {})",
            self.text(expr),
            self.text(tag),
            self.session.display(typ),
            self.session.display(tag_type),
        );
        self.emit(diagnostic);
    }

    /// Evaluates an expression in the given context, reporting any misuse of multiple values.
    pub fn evaluate(&mut self, expr: NodeId, context: Context) -> Operand {
        match context {
            Context::Unconstrained => self.infer(expr),
            Context::Single(expected) => {
                let operand = self.infer(expr);
                let typ = self.single_value(expr, &operand);
                if let Some(expected) = expected {
                    self.check_assignable(expr, typ, expected);
                }
                Operand::Value(typ)
            }
            Context::Multi(count) => {
                let operand = self.infer(expr);
                match self.spread_values(&operand, count) {
                    Some(values) => Operand::Tuple(values),
                    None => Operand::Invalid,
                }
            }
        }
    }

    /// The type of an expression used as a single value.
    pub(super) fn value(&mut self, expr: NodeId) -> Type {
        match self.evaluate(expr, Context::Single(None)) {
            Operand::Value(typ) => typ,
            _ => Type::INVALID,
        }
    }

    /// Checks that the expression is a single value assignable to `expected`.
    pub(super) fn expect(&mut self, expr: NodeId, expected: Type) -> Type {
        match self.evaluate(expr, Context::Single(Some(expected))) {
            Operand::Value(typ) => typ,
            _ => Type::INVALID,
        }
    }

    pub(super) fn single_value(&mut self, expr: NodeId, operand: &Operand) -> Type {
        match operand {
            Operand::Value(typ) | Operand::CommaOk(typ) => *typ,
            Operand::Tuple(types) => match types.as_slice() {
                [single] => *single,
                [] => {
                    let diagnostic = problem!(
                        ProblemKind::VoidUsedAsValue,
                        self.span(expr),
                        "{} doesn't return a value",
                        self.text(expr)
                    );
                    self.emit(diagnostic);
                    Type::INVALID
                }
                _ => {
                    let name = self.multi_value_name(expr);
                    let diagnostic = problem!(
                        ProblemKind::MultipleValueInSingleValueContext,
                        self.span(expr),
                        "Multiple-value {name} in single-value context"
                    );
                    self.emit(diagnostic);
                    Type::INVALID
                }
            },
            Operand::Invalid | Operand::Type(_) | Operand::Builtin(_) | Operand::Package => {
                Type::INVALID
            }
        }
    }

    /// Calls of function literals are named after the type of the literal.
    fn multi_value_name(&mut self, expr: NodeId) -> String {
        let nodes = self.nodes();
        if let Node::Call(callee, _, _) = nodes.kind(nodes.unparen(expr)) {
            if let Node::FunctionLiteral(signature, _) = nodes.kind(nodes.unparen(callee)) {
                let func = self.session.resolve_signature(signature);
                let typ = self.session.intern(TypeKind::Function(func));
                return self.session.display(typ).to_string();
            }
        }
        self.text(expr).to_owned()
    }

    /// The values an operand produces when assigned to `count` targets.
    pub(super) fn spread_values(&mut self, operand: &Operand, count: usize) -> Option<TypeList> {
        match operand {
            Operand::Tuple(types) if types.len() == count => Some(types.clone()),
            Operand::CommaOk(typ) if count == 2 => {
                let ok = self.session.untyped(ConstantKind::Boolean);
                Some(smallvec![*typ, ok])
            }
            Operand::Value(typ) | Operand::CommaOk(typ) if count == 1 => Some(smallvec![*typ]),
            _ => None,
        }
    }

    pub(super) fn check_assignable(&mut self, expr: NodeId, value: Type, target: Type) {
        let Verdict::NotAssignable(reason) = self.session.assignable(value, target) else {
            return;
        };
        let diagnostic = problem!(
            reason.kind(),
            self.span(expr),
            "Cannot use {} (type {}) as type {}",
            self.text(expr),
            self.session.display(value),
            self.session.display(target),
        );
        self.emit(diagnostic);
    }

    /// Infers the type of an expression without any expectations on the number of values.
    pub fn infer(&mut self, expr: NodeId) -> Operand {
        let nodes = self.nodes();
        match nodes.kind(expr) {
            Node::Name(_) => self.infer_name(expr),

            Node::Integer(_) => Operand::Value(self.session.untyped(ConstantKind::Integer)),
            Node::Float => Operand::Value(self.session.untyped(ConstantKind::Float)),
            Node::Imaginary => Operand::Value(self.session.untyped(ConstantKind::Complex)),
            Node::Rune => Operand::Value(self.session.untyped(ConstantKind::Rune)),
            Node::String => Operand::Value(self.session.untyped(ConstantKind::String)),

            Node::Paren(inner) => self.infer(inner),
            Node::Selector(base, member) => self.infer_selector(base, member.text),
            Node::Call(callee, args, spread) => self.check_call(expr, callee, args, spread),
            Node::Index(base, index) => self.infer_index(base, index),
            Node::SliceExpr(base, bounds) => {
                for bound in [bounds.low, bounds.high, bounds.max].into_iter().flatten() {
                    self.value(bound);
                }
                self.infer_slice(base)
            }
            Node::TypeAssertion(base, typ) => {
                let value = self.value(base);
                let underlying = self.session.underlying(value);
                if !underlying.is_invalid() && !self.session.lookup(underlying).is_interface() {
                    let diagnostic = problem!(
                        ProblemKind::OperatorTypeMismatch,
                        self.span(base),
                        "invalid operation: {} (type {}) is not an interface",
                        self.text(base),
                        self.session.display(value),
                    );
                    self.emit(diagnostic);
                }
                match typ {
                    Some(typ) => Operand::CommaOk(self.session.resolve_type(typ)),
                    None => Operand::Invalid,
                }
            }
            Node::Unary(op, inner) => self.check_unary(expr, op, inner),
            Node::Binary(lhs, op, rhs) => self.check_binary(expr, lhs, op, rhs),

            Node::Composite(Some(typ), elements) => {
                let typ = self.composite_type(typ, elements);
                self.check_composite(typ, elements);
                Operand::Value(typ)
            }
            Node::Composite(None, elements) => {
                tracing::trace!(?expr, "composite literal without a type");
                for &element in nodes.indirect(elements) {
                    self.infer(element);
                }
                Operand::Invalid
            }

            Node::FunctionLiteral(signature, body) => {
                let func = self.session.resolve_signature(signature);
                if !self.silent {
                    self.check_body(func.clone(), body);
                }
                Operand::Value(self.session.intern(TypeKind::Function(func)))
            }

            Node::Pointer(_)
            | Node::Array(_, _)
            | Node::Slice(_)
            | Node::Map(_, _)
            | Node::Channel(_, _)
            | Node::FunctionType(_)
            | Node::Struct(_)
            | Node::Interface(_) => Operand::Type(self.session.resolve_type(expr)),

            kind => {
                tracing::trace!(?kind, "not an expression");
                Operand::Invalid
            }
        }
    }

    fn infer_name(&mut self, name: NodeId) -> Operand {
        let resolution = self.session.resolution;
        match resolution.symbol(name) {
            None => Operand::Invalid,
            Some(Symbol::Package(_)) => Operand::Package,
            Some(Symbol::Builtin(builtin)) => match builtin {
                Builtin::True | Builtin::False => {
                    Operand::Value(self.session.untyped(ConstantKind::Boolean))
                }
                Builtin::Nil => Operand::Value(self.session.untyped(ConstantKind::Nil)),
                Builtin::Iota => Operand::Value(self.session.untyped(ConstantKind::Integer)),
                _ => match self.session.builtin_type(builtin) {
                    Some(typ) => Operand::Type(typ),
                    None => Operand::Builtin(builtin),
                },
            },
            Some(Symbol::Binding(binder)) => match resolution.binding(binder).map(|b| b.kind) {
                Some(BindingKind::Type(_)) => Operand::Type(self.session.declared_type(binder)),
                Some(_) => Operand::Value(self.binding_type(binder)),
                None => Operand::Invalid,
            },
        }
    }

    fn infer_selector(&mut self, base: NodeId, name: Text) -> Operand {
        match self.infer(base) {
            Operand::Type(typ) => {
                // method expression: the receiver becomes the first parameter
                let signature = match self.session.select(typ, name) {
                    Some(Selection::Method { signature, .. })
                    | Some(Selection::InterfaceMethod { signature }) => signature,
                    Some(Selection::Field { .. }) | None => return Operand::Invalid,
                };
                let func = signature.with_receiver(typ);
                Operand::Value(self.session.intern(TypeKind::Function(func)))
            }
            Operand::Invalid | Operand::Package | Operand::Builtin(_) => Operand::Invalid,
            operand => {
                let typ = self.single_value(base, &operand);
                match self.session.select(typ, name) {
                    Some(selection) => Operand::Value(selection.value_type(self.session)),
                    None => Operand::Invalid,
                }
            }
        }
    }

    fn infer_index(&mut self, base: NodeId, index: NodeId) -> Operand {
        let operand = self.infer(base);
        if let Operand::Type(_) = operand {
            tracing::trace!(?base, "type parameters are not supported");
            return Operand::Invalid;
        }

        let typ = self.single_value(base, &operand);
        let underlying = self.session.underlying(typ);
        match self.session.lookup(underlying).clone() {
            TypeKind::Map(key, value) => {
                self.expect(index, key);
                Operand::CommaOk(value)
            }
            TypeKind::String | TypeKind::Untyped(ConstantKind::String) => {
                self.value(index);
                Operand::Value(self.session.intern(TypeKind::Byte))
            }
            TypeKind::Slice(elem) | TypeKind::Array(_, elem) => {
                self.value(index);
                Operand::Value(elem)
            }
            TypeKind::Pointer(inner) => {
                self.value(index);
                let inner = self.session.underlying(inner);
                match self.session.lookup(inner) {
                    TypeKind::Array(_, elem) => Operand::Value(*elem),
                    _ => Operand::Invalid,
                }
            }
            _ => {
                self.value(index);
                Operand::Invalid
            }
        }
    }

    fn infer_slice(&mut self, base: NodeId) -> Operand {
        let typ = self.value(base);
        let underlying = self.session.underlying(typ);
        let elem = match self.session.lookup(underlying).clone() {
            TypeKind::String | TypeKind::Slice(_) => return Operand::Value(typ),
            TypeKind::Untyped(ConstantKind::String) => {
                return Operand::Value(self.session.intern(TypeKind::String))
            }
            TypeKind::Array(_, elem) => elem,
            TypeKind::Pointer(inner) => {
                let inner = self.session.underlying(inner);
                match self.session.lookup(inner) {
                    TypeKind::Array(_, elem) => *elem,
                    _ => return Operand::Invalid,
                }
            }
            _ => return Operand::Invalid,
        };
        Operand::Value(self.session.intern(TypeKind::Slice(elem)))
    }

    /// The type of a composite literal, inferring the length of `[...]T` from its elements.
    fn composite_type(&mut self, typ: NodeId, elements: NodeRange) -> Type {
        let nodes = self.nodes();
        let Node::Array(None, elem) = nodes.kind(typ) else {
            return self.session.resolve_type(typ);
        };

        let mut length = 0u64;
        let mut position = 0u64;
        for &element in nodes.indirect(elements) {
            if let Node::KeyedElement(key, _) = nodes.kind(element) {
                match eval::const_integer(self.session, key) {
                    Some(index) if index >= 0 => position = index as u64,
                    _ => return Type::INVALID,
                }
            }
            position += 1;
            length = length.max(position);
        }

        let elem = self.session.resolve_type(elem);
        self.session.intern(TypeKind::Array(length, elem))
    }

    fn check_composite(&mut self, typ: Type, elements: NodeRange) {
        let nodes = self.nodes();
        let elements = nodes.indirect(elements);
        let underlying = self.session.underlying(typ);

        match self.session.lookup(underlying).clone() {
            TypeKind::Struct(strukt) => {
                let keyed = elements
                    .first()
                    .map_or(false, |&first| matches!(nodes.kind(first), Node::KeyedElement(..)));

                if keyed {
                    for &element in elements {
                        let Node::KeyedElement(key, value) = nodes.kind(element) else {
                            self.value(element);
                            continue;
                        };
                        let field = match nodes.kind(key) {
                            Node::Name(name) => strukt.get_field(name).map(|field| field.typ),
                            _ => None,
                        };
                        match field {
                            Some(field) => self.check_element(value, field),
                            None => {
                                self.value(value);
                            }
                        }
                    }
                } else {
                    for (i, &element) in elements.iter().enumerate() {
                        match strukt.fields.get(i) {
                            Some(field) => self.check_element(element, field.typ),
                            None => {
                                self.value(element);
                            }
                        }
                    }
                }
            }

            TypeKind::Array(_, elem) | TypeKind::Slice(elem) => {
                for &element in elements {
                    match nodes.kind(element) {
                        Node::KeyedElement(index, value) => {
                            self.value(index);
                            self.check_element(value, elem);
                        }
                        _ => self.check_element(element, elem),
                    }
                }
            }

            TypeKind::Map(key_type, value_type) => {
                for &element in elements {
                    match nodes.kind(element) {
                        Node::KeyedElement(key, value) => {
                            self.check_element(key, key_type);
                            self.check_element(value, value_type);
                        }
                        _ => {
                            self.value(element);
                        }
                    }
                }
            }

            _ => {
                for &element in elements {
                    match nodes.kind(element) {
                        Node::KeyedElement(_, value) => self.infer(value),
                        _ => self.infer(element),
                    };
                }
            }
        }
    }

    /// Checks an element of a composite literal, which may omit its type.
    fn check_element(&mut self, element: NodeId, expected: Type) {
        let Node::Composite(None, elements) = self.nodes().kind(element) else {
            self.expect(element, expected);
            return;
        };

        match *self.session.lookup(expected) {
            TypeKind::Pointer(inner) => self.check_composite(inner, elements),
            _ => self.check_composite(expected, elements),
        }
    }

    /// The type of a variable, parameter, constant or function. Computed where it is declared,
    /// so any problems are reported when checking the declaration.
    pub fn binding_type(&mut self, binder: NodeId) -> Type {
        if let Some(&typ) = self.session.binding_types.get(&binder) {
            return typ;
        }

        let Some(binding) = self.session.resolution.binding(binder) else {
            return Type::INVALID;
        };
        let kind = binding.kind;

        if let BindingKind::Type(_) = kind {
            return Type::INVALID;
        }

        if !self.session.in_progress.insert(binder) {
            tracing::debug!(?binder, "cyclic binding");
            return Type::INVALID;
        }

        let typ = self.silently(|checker| checker.compute_binding_type(kind));

        self.session.in_progress.remove(&binder);
        self.session.binding_types.insert(binder, typ);
        typ
    }

    fn compute_binding_type(&mut self, kind: BindingKind) -> Type {
        let nodes = self.nodes();
        match kind {
            BindingKind::Type(_) => Type::INVALID,

            BindingKind::Const { spec, index } => {
                let Node::ConstSpec(spec) = nodes.kind(spec) else { return Type::INVALID };
                if let Some(typ) = spec.typ {
                    return self.session.resolve_type(typ);
                }
                match nodes.indirect(spec.values).get(index) {
                    Some(&value) => self.value(value),
                    None => Type::INVALID,
                }
            }

            BindingKind::Var { spec, index } => {
                let Node::VarSpec(spec) = nodes.kind(spec) else { return Type::INVALID };
                if let Some(typ) = spec.typ {
                    return self.session.resolve_type(typ);
                }
                self.initialized_type(spec.names.len(), spec.values, index)
            }

            BindingKind::Define { stmt, index } => {
                let Node::Define(assign) = nodes.kind(stmt) else { return Type::INVALID };
                self.initialized_type(assign.lhs().len(), assign.rhs(), index)
            }

            BindingKind::Func(decl) => {
                let signature = self.session.function_signature(decl);
                self.session.intern(TypeKind::Function(signature))
            }

            BindingKind::Param { typ, variadic } => {
                let typ = self.session.resolve_type(typ);
                match variadic {
                    true => self.session.intern(TypeKind::Slice(typ)),
                    false => typ,
                }
            }

            BindingKind::Receiver { typ, .. } => self.session.resolve_type(typ),

            BindingKind::Range { stmt, index } => {
                let Node::ForRange(range) = nodes.kind(stmt) else { return Type::INVALID };
                let types = self.range_types(range.expr);
                types
                    .and_then(|types| types.get(index).copied())
                    .unwrap_or(Type::INVALID)
            }

            BindingKind::TypeSwitch { stmt, clause } => {
                let Node::TypeSwitch(switch) = nodes.kind(stmt) else { return Type::INVALID };
                let Node::CaseClause(clause) = nodes.kind(clause) else { return Type::INVALID };
                match nodes.indirect(clause.exprs) {
                    [single] if !self.is_nil(*single) => self.session.resolve_type(*single),
                    _ => self.value(switch.subject),
                }
            }
        }
    }

    fn is_nil(&self, node: NodeId) -> bool {
        self.session.resolution.symbol(node) == Some(Symbol::Builtin(Builtin::Nil))
    }

    /// The type of the `index`th of `count` names initialized by `values`.
    fn initialized_type(&mut self, count: usize, values: NodeRange, index: usize) -> Type {
        let values = self.nodes().indirect(values);
        let typ = if values.len() == count {
            self.value(values[index])
        } else if let [value] = values {
            match self.evaluate(*value, Context::Multi(count)) {
                Operand::Tuple(types) => types.get(index).copied().unwrap_or(Type::INVALID),
                _ => Type::INVALID,
            }
        } else {
            Type::INVALID
        };
        self.session.default_type(typ)
    }

    /// The types of the key and value produced by ranging over an expression.
    pub(super) fn range_types(&mut self, expr: NodeId) -> Option<TypeList> {
        let typ = self.value(expr);
        let underlying = self.session.underlying(typ);
        let int = self.session.intern(TypeKind::Int);

        let types = match self.session.lookup(underlying).clone() {
            TypeKind::String | TypeKind::Untyped(ConstantKind::String) => {
                smallvec![int, self.session.intern(TypeKind::Rune)]
            }
            TypeKind::Slice(elem) | TypeKind::Array(_, elem) => smallvec![int, elem],
            TypeKind::Pointer(inner) => {
                let inner = self.session.underlying(inner);
                match self.session.lookup(inner) {
                    TypeKind::Array(_, elem) => smallvec![int, *elem],
                    _ => return None,
                }
            }
            TypeKind::Map(key, value) => smallvec![key, value],
            TypeKind::Channel(_, elem) => smallvec![elem],
            _ => return None,
        };
        Some(types)
    }

    /// Checks a call of a builtin function, returning its result.
    pub(super) fn check_builtin(
        &mut self,
        builtin: Builtin,
        args: &[NodeId],
        spread: bool,
    ) -> Operand {
        match builtin {
            Builtin::Len | Builtin::Cap | Builtin::Copy => {
                for &arg in args {
                    self.value(arg);
                }
                Operand::Value(self.session.intern(TypeKind::Int))
            }

            Builtin::Append => {
                let Some((&first, rest)) = args.split_first() else { return Operand::Invalid };
                let slice = self.value(first);
                let underlying = self.session.underlying(slice);
                let elem = match *self.session.lookup(underlying) {
                    TypeKind::Slice(elem) => elem,
                    _ => {
                        for &arg in rest {
                            self.value(arg);
                        }
                        return Operand::Invalid;
                    }
                };

                for (i, &arg) in rest.iter().enumerate() {
                    if spread && i + 1 == rest.len() {
                        let typ = self.value(arg);
                        // `append(bytes, text...)`
                        let is_bytes = matches!(
                            self.session.lookup(elem),
                            TypeKind::Byte | TypeKind::Uint8
                        );
                        if is_bytes && self.session.class(typ).is_string() {
                            continue;
                        }
                        let elems = self.session.intern(TypeKind::Slice(elem));
                        self.check_assignable(arg, typ, elems);
                    } else {
                        self.expect(arg, elem);
                    }
                }
                Operand::Value(slice)
            }

            Builtin::Make | Builtin::New => {
                let Some((&first, rest)) = args.split_first() else { return Operand::Invalid };
                for &arg in rest {
                    self.value(arg);
                }
                let typ = match self.infer(first) {
                    Operand::Type(typ) => typ,
                    _ => return Operand::Invalid,
                };
                match builtin {
                    Builtin::New => Operand::Value(self.session.intern(TypeKind::Pointer(typ))),
                    _ => Operand::Value(typ),
                }
            }

            Builtin::Complex => {
                let parts: Vec<Type> = args.iter().map(|&arg| self.value(arg)).collect();
                let kinds: Vec<TypeKind> = parts
                    .iter()
                    .map(|&part| self.session.lookup(part).clone())
                    .collect();
                let typ = if kinds.iter().all(TypeKind::is_untyped) {
                    self.session.untyped(ConstantKind::Complex)
                } else if kinds.iter().any(|kind| *kind == TypeKind::Float32) {
                    self.session.intern(TypeKind::Complex64)
                } else {
                    self.session.intern(TypeKind::Complex128)
                };
                Operand::Value(typ)
            }

            Builtin::Real | Builtin::Imag => {
                let Some(&arg) = args.first() else { return Operand::Invalid };
                let typ = self.value(arg);
                let result = match self.session.lookup(typ) {
                    TypeKind::Untyped(_) => self.session.untyped(ConstantKind::Float),
                    TypeKind::Complex64 => self.session.intern(TypeKind::Float32),
                    _ => self.session.intern(TypeKind::Float64),
                };
                Operand::Value(result)
            }

            Builtin::Delete | Builtin::Close | Builtin::Panic | Builtin::Print | Builtin::Println => {
                for &arg in args {
                    self.value(arg);
                }
                Operand::Tuple(TypeList::new())
            }

            Builtin::Recover => match self.session.builtin_type(Builtin::Any) {
                Some(any) => Operand::Value(any),
                None => Operand::Invalid,
            },

            _ => {
                tracing::trace!(%builtin, "not a builtin function");
                Operand::Invalid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::typing::tests::Fixture;

    fn messages(source: &str) -> Vec<String> {
        Fixture::new(source).messages()
    }

    #[test]
    fn untyped_constants_default_when_declared() {
        let fixture = Fixture::new(
            "package p
            func f() {
                c := complex(2.0, 0)
                r := 'x'
                s := \"s\"
                var i int32 = c
                var j int64 = r
                var k string = s
            }
            ",
        );
        assert_eq!(
            fixture.messages(),
            [
                "Cannot use c (type complex128) as type int32",
                "Cannot use r (type rune) as type int64",
            ]
        );
    }

    #[test]
    fn method_values_and_expressions() {
        let source = "package p
            type T struct{}
            func (t *T) m(x int) T { return *t }
            func f(t *T) {
                var a func(int) T = t.m
                var b func(*T, int) T = (*T).m
                var c func(int) = t.m
            }
        ";
        assert_eq!(
            messages(source),
            ["Cannot use t.m (type func(int) T) as type func(int)"]
        );
    }

    #[test]
    fn composite_literals() {
        let source = "package p
            type P struct { x, y int }
            var ps = []*P{{1, 2}, {x: \"a\"}}
            var arr = [...]string{2: \"c\", \"d\"}
            var n [4]string = arr
            var m = map[string]P{\"a\": {y: 1}, 1: {}}
        ";
        assert_eq!(
            messages(source),
            [
                "Cannot use \"a\" (type string) as type int",
                "Cannot use 1 (type untyped int) as type string",
            ]
        );
    }

    #[test]
    fn comma_ok_forms() {
        let source = "package p
            func f(m map[string]int, c chan int, x interface{}) {
                v, ok := m[\"a\"]
                w, ok2 := <-c
                s, ok3 := x.(string)
                var b bool = ok && ok2 && ok3
                var i int = v + w
                var t string = s
            }
        ";
        assert_eq!(messages(source), Vec::<String>::new());
    }

    #[test]
    fn range_and_type_switch_bindings() {
        let source = "package p
            func f(s string, m map[string]bool, x interface{}) {
                for i, r := range s {
                    var a rune = r
                    var b string = i
                }
                for k := range m {
                    var c string = k
                }
                switch v := x.(type) {
                case []byte:
                    var d []byte = v
                case int, string:
                    var e int = v
                }
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Cannot use i (type int) as type string",
                "Cannot use v (type interface{}) as type int",
            ]
        );
    }

    #[test]
    fn builtins() {
        let source = "package p
            func f(b []byte, s string) {
                b = append(b, s...)
                b = append(b, 1, \"x\")
                var n string = len(s)
                p := new(int)
                var q *string = p
                var r interface{} = recover()
                close(make(chan int))
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Cannot use \"x\" (type string) as type byte",
                "Cannot use len(s) (type int) as type string",
                "Cannot use p (type *int) as type *string",
            ]
        );
    }

    #[test]
    fn function_literals_check_their_own_results() {
        let source = "package p
            func f() int {
                g := func() string { return 1 }
                _ = g
                return 0
            }
        ";
        assert_eq!(
            messages(source),
            ["Cannot use 1 (type untyped int) as type string"]
        );
    }

    #[test]
    fn void_and_multiple_values() {
        let source = "package p
            type validate interface {
                validate() (bool, error)
                void()
            }
            func f(s validate) {
                err := s.validate()
                v := s.void()
                _, _ = err, v
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Assignment count mismatch: 2 element(s) assigned to 1 element(s)",
                "Multiple-value s.validate() in single-value context",
                "Assignment count mismatch: 0 element(s) assigned to 1 element(s)",
                "s.void() doesn't return a value",
            ]
        );
    }
}
