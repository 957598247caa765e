use smallvec::SmallVec;

use crate::common::Text;
use crate::syntax::{self, Node, NodeId, NodeRange};
use crate::HashMap;

use super::{Binding, BindingKind, Builtin, Resolution, Symbol};

pub struct NamingContext<'a> {
    file: &'a syntax::File,
    nodes: &'a syntax::NodeStorage,

    local_scope: LocalScope,
    imports: HashMap<Text, Text>,

    /// Methods whose receiver type has not been declared yet.
    pending_methods: Vec<(Text, NodeId)>,

    resolution: Resolution,
}

impl<'a> NamingContext<'a> {
    pub fn new(file: &'a syntax::File) -> NamingContext<'a> {
        Self {
            file,
            nodes: &file.nodes,
            local_scope: LocalScope::with_capacity(file.nodes.kinds.len() / 8),
            imports: HashMap::default(),
            pending_methods: Vec::new(),
            resolution: Resolution::default(),
        }
    }

    pub fn finish(self) -> Resolution {
        self.resolution
    }

    pub fn add_import(&mut self, name: Text) {
        self.imports.insert(name, name);
    }

    /// Registers the names introduced by a top-level declaration in the package scope.
    pub fn declare_global(&mut self, decl: NodeId) {
        match self.nodes.kind(decl) {
            Node::Function(func) => {
                let Node::Name(name) = self.nodes.kind(func.name) else { return };
                self.bind(func.name, name, BindingKind::Func(decl));

                match func.receiver {
                    Some(receiver) => {
                        let typ = self.nodes.parameter(receiver).typ;
                        let Some(base) = super::receiver_base(self.nodes, typ) else { return };
                        if let Some(&binder) = self.resolution.package_scope.get(&base) {
                            self.resolution.methods.entry(binder).or_default().push(decl);
                        } else {
                            // the receiver type may be declared further down
                            self.pending_methods.push((base, decl));
                        }
                    }
                    None => self.declare_package_member(name, func.name),
                }
            }
            Node::TypeSpec(spec) => {
                let Node::Name(name) = self.nodes.kind(spec.name) else { return };
                self.bind(spec.name, name, BindingKind::Type(decl));
                self.declare_package_member(name, spec.name);
                self.attach_pending_methods(name, spec.name);
            }
            Node::VarSpec(spec) | Node::ConstSpec(spec) => {
                let is_const = matches!(self.nodes.kind(decl), Node::ConstSpec(_));
                for (index, &node) in self.nodes.indirect(spec.names).iter().enumerate() {
                    let Node::Name(name) = self.nodes.kind(node) else { continue };
                    let kind = if is_const {
                        BindingKind::Const { spec: decl, index }
                    } else {
                        BindingKind::Var { spec: decl, index }
                    };
                    self.bind(node, name, kind);
                    self.declare_package_member(name, node);
                }
            }
            kind => unreachable!("not a declaration: {kind:?}"),
        }
    }

    fn declare_package_member(&mut self, name: Text, binder: NodeId) {
        if !name.is_blank() {
            self.resolution.package_scope.insert(name, binder);
        }
    }

    fn attach_pending_methods(&mut self, name: Text, binder: NodeId) {
        let pending = std::mem::take(&mut self.pending_methods);
        let (matching, rest): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(base, _)| *base == name);
        self.pending_methods = rest;
        if !matching.is_empty() {
            let methods = self.resolution.methods.entry(binder).or_default();
            methods.extend(matching.into_iter().map(|(_, decl)| decl));
            methods.sort();
        }
    }

    /// Resolves the names used within a top-level declaration.
    pub fn resolve_global(&mut self, decl: NodeId) {
        match self.nodes.kind(decl) {
            Node::Function(func) => {
                self.local_scope.enter();
                if let Some(receiver) = func.receiver {
                    let parameter = self.nodes.parameter(receiver);
                    self.resolve_node(parameter.typ);
                    if let Some(name) = parameter.name {
                        let kind = BindingKind::Receiver {
                            typ: parameter.typ,
                            method: decl,
                        };
                        self.bind_local(name, kind);
                    }
                }
                self.resolve_func(func.signature, func.body);
                self.local_scope.exit();
            }
            Node::TypeSpec(spec) => self.resolve_node(spec.typ),
            Node::VarSpec(spec) | Node::ConstSpec(spec) => self.resolve_value_spec(spec),
            kind => unreachable!("not a declaration: {kind:?}"),
        }
    }

    fn resolve_func(&mut self, signature: syntax::Signature, body: Option<NodeId>) {
        self.local_scope.enter();

        let parameters = self.nodes.indirect(signature.parameters);
        for &node in parameters {
            let param = self.nodes.parameter(node);
            self.resolve_node(param.typ);
        }

        let inputs = signature.inputs().len();
        for (index, &node) in parameters.iter().enumerate() {
            let param = self.nodes.parameter(node);
            if let Some(name) = param.name {
                let variadic = signature.variadic && index + 1 == inputs;
                let kind = BindingKind::Param {
                    typ: param.typ,
                    variadic,
                };
                self.bind_local(name, kind);
            }
        }

        if let Some(body) = body {
            self.resolve_node(body);
        }

        self.local_scope.exit();
    }

    /// Resolves the parameter types of a function type, without binding any names.
    fn resolve_signature_types(&mut self, signature: syntax::Signature) {
        for &node in self.nodes.indirect(signature.parameters) {
            let param = self.nodes.parameter(node);
            self.resolve_node(param.typ);
        }
    }

    fn resolve_value_spec(&mut self, spec: syntax::ValueSpec) {
        if let Some(typ) = spec.typ {
            if !spec.implicit {
                self.resolve_node(typ);
            }
        }
        if !spec.implicit {
            self.resolve_range(spec.values);
        }
    }

    fn resolve_range(&mut self, nodes: NodeRange) {
        for &node in self.nodes.indirect(nodes) {
            self.resolve_node(node);
        }
    }

    fn resolve_block_scoped(&mut self, node: NodeId) {
        self.local_scope.enter();
        self.resolve_node(node);
        self.local_scope.exit();
    }

    fn resolve_node(&mut self, node: NodeId) {
        match self.nodes.kind(node) {
            Node::Name(name) => {
                if name.is_blank() {
                    return;
                }
                if let Some(symbol) = self.find_symbol(name) {
                    self.resolution.symbols.insert(node, symbol);
                }
            }
            Node::Selector(base, _) => self.resolve_node(base),

            Node::FunctionType(signature) | Node::MethodElement(_, signature) => {
                self.resolve_signature_types(signature)
            }
            Node::FunctionLiteral(signature, body) => self.resolve_func(signature, Some(body)),

            Node::Composite(typ, elements) => {
                if let Some(typ) = typ {
                    self.resolve_node(typ);
                }
                for &element in self.nodes.indirect(elements) {
                    match self.nodes.kind(element) {
                        Node::KeyedElement(key, value) => {
                            // the key might be the name of a field, so might not be in scope
                            self.resolve_node(key);
                            self.resolve_node(value);
                        }
                        _ => self.resolve_node(element),
                    }
                }
            }

            Node::Block(statements) => {
                self.local_scope.enter();
                self.resolve_range(statements);
                self.local_scope.exit();
            }

            Node::DeclStmt(specs) => {
                for &spec in self.nodes.indirect(specs) {
                    self.resolve_local_spec(spec);
                }
            }

            Node::Define(assign) => {
                self.resolve_range(assign.rhs());
                for (index, &target) in self.nodes.indirect(assign.lhs()).iter().enumerate() {
                    let Node::Name(name) = self.nodes.kind(target) else {
                        self.resolve_node(target);
                        continue;
                    };
                    if name.is_blank() {
                        continue;
                    }
                    if self.local_scope.in_current_scope(name) {
                        self.resolve_node(target);
                    } else {
                        self.bind_local(target, BindingKind::Define { stmt: node, index });
                    }
                }
            }

            Node::If(stmt) => {
                self.local_scope.enter();
                if let Some(init) = stmt.init {
                    self.resolve_node(init);
                }
                self.resolve_node(stmt.cond);
                self.resolve_node(stmt.then);
                if let Some(els) = stmt.els {
                    self.resolve_node(els);
                }
                self.local_scope.exit();
            }

            Node::For(stmt) => {
                self.local_scope.enter();
                for part in [stmt.init, stmt.cond, stmt.post].into_iter().flatten() {
                    self.resolve_node(part);
                }
                self.resolve_node(stmt.body);
                self.local_scope.exit();
            }

            Node::ForRange(stmt) => {
                self.resolve_node(stmt.expr);
                self.local_scope.enter();
                for (index, target) in [stmt.key, stmt.value].into_iter().enumerate() {
                    let Some(target) = target else { continue };
                    match self.nodes.kind(target) {
                        Node::Name(name) if stmt.define => {
                            if !name.is_blank() {
                                self.bind_local(target, BindingKind::Range { stmt: node, index });
                            }
                        }
                        _ => self.resolve_node(target),
                    }
                }
                self.resolve_node(stmt.body);
                self.local_scope.exit();
            }

            Node::Switch(stmt) => {
                self.local_scope.enter();
                if let Some(init) = stmt.init {
                    self.resolve_node(init);
                }
                if let Some(tag) = stmt.tag {
                    self.resolve_node(tag);
                }
                for &clause in self.nodes.indirect(stmt.clauses) {
                    self.resolve_block_scoped(clause);
                }
                self.local_scope.exit();
            }

            Node::TypeSwitch(stmt) => {
                self.local_scope.enter();
                if let Some(init) = stmt.init {
                    self.resolve_node(init);
                }
                self.resolve_node(stmt.subject);

                let binding = stmt.binding.and_then(|binding| match self.nodes.kind(binding) {
                    Node::Name(name) if !name.is_blank() => Some(name),
                    _ => None,
                });

                for &clause in self.nodes.indirect(stmt.clauses) {
                    let Node::CaseClause(case) = self.nodes.kind(clause) else { continue };
                    self.local_scope.enter();
                    self.resolve_range(case.exprs);
                    if let Some(name) = binding {
                        let kind = BindingKind::TypeSwitch { stmt: node, clause };
                        self.bind(clause, name, kind);
                        self.local_scope.insert_local(name, clause);
                    }
                    self.resolve_range(case.body);
                    self.local_scope.exit();
                }

                self.local_scope.exit();
            }

            Node::CommClause(..) => self.resolve_block_scoped_children(node),

            Node::Labeled(_, inner) => self.resolve_node(inner),
            Node::Branch(..) => {}

            // these would otherwise introduce bindings for the parameters
            Node::Function(_) | Node::TypeSpec(_) | Node::VarSpec(_) | Node::ConstSpec(_) => {
                unreachable!("declarations are resolved separately")
            }

            _ => self.resolve_children(node),
        }
    }

    fn resolve_children(&mut self, node: NodeId) {
        let mut children = SmallVec::<[NodeId; 8]>::new();
        self.nodes.for_each_child(node, |child| children.push(child));
        for child in children {
            self.resolve_node(child);
        }
    }

    fn resolve_block_scoped_children(&mut self, node: NodeId) {
        self.local_scope.enter();
        self.resolve_children(node);
        self.local_scope.exit();
    }

    fn resolve_local_spec(&mut self, spec_node: NodeId) {
        match self.nodes.kind(spec_node) {
            Node::TypeSpec(spec) => {
                // types may refer to themselves
                self.bind_local(spec.name, BindingKind::Type(spec_node));
                self.resolve_node(spec.typ);
            }
            Node::VarSpec(spec) | Node::ConstSpec(spec) => {
                self.resolve_value_spec(spec);
                let is_const = matches!(self.nodes.kind(spec_node), Node::ConstSpec(_));
                for (index, &name) in self.nodes.indirect(spec.names).iter().enumerate() {
                    let kind = if is_const {
                        BindingKind::Const {
                            spec: spec_node,
                            index,
                        }
                    } else {
                        BindingKind::Var {
                            spec: spec_node,
                            index,
                        }
                    };
                    self.bind_local(name, kind);
                }
            }
            kind => unreachable!("not a spec: {kind:?}"),
        }
    }

    /// Records a binding introduced by the `Name` node `binder`.
    fn bind(&mut self, binder: NodeId, name: Text, kind: BindingKind) {
        self.resolution.bindings.insert(binder, Binding { name, kind });
        if binder_is_name(self.nodes, binder) {
            self.resolution.symbols.insert(binder, Symbol::Binding(binder));
        }
    }

    /// Records a binding and brings it into the current local scope.
    fn bind_local(&mut self, binder: NodeId, kind: BindingKind) {
        let Node::Name(name) = self.nodes.kind(binder) else { return };
        self.bind(binder, name, kind);
        if !name.is_blank() {
            self.local_scope.insert_local(name, binder);
        }
    }

    fn find_symbol(&mut self, name: Text) -> Option<Symbol> {
        if let Some(node) = self.local_scope.get(name) {
            return Some(Symbol::Binding(node));
        }

        if let Some(&node) = self.resolution.package_scope.get(&name) {
            return Some(Symbol::Binding(node));
        }

        if let Some(&package) = self.imports.get(&name) {
            return Some(Symbol::Package(package));
        }

        Builtin::lookup(self.file.name(name)).map(Symbol::Builtin)
    }
}

fn binder_is_name(nodes: &syntax::NodeStorage, binder: NodeId) -> bool {
    matches!(nodes.kind(binder), Node::Name(_))
}

struct LocalScope {
    slots: HashMap<Text, LocalSlot>,
    /// List of scopes which are currently active
    active: SmallVec<[ScopeId; 32]>,
    /// The most recent scope.
    next: ScopeId,
}

type ScopeId = u32;

struct LocalSlot {
    /// Index of the scope this symbols belongs to.
    scope: ScopeId,
    /// The node that introduced the binding.
    binder: NodeId,
    /// A shadowed symbol (if any).
    shadowed: Option<Box<LocalSlot>>,
}

impl LocalScope {
    fn with_capacity(cap: usize) -> Self {
        let mut slots = HashMap::default();
        slots.reserve(cap);
        Self {
            slots,
            active: SmallVec::default(),
            next: 0,
        }
    }

    fn slot(&mut self, name: Text) -> Option<&LocalSlot> {
        let slot = self.slots.get_mut(&name)?;
        loop {
            if self.active.contains(&slot.scope) {
                return Some(slot);
            }

            *slot = *slot.shadowed.take()?;
        }
    }

    fn get(&mut self, name: Text) -> Option<NodeId> {
        self.slot(name).map(|slot| slot.binder)
    }

    fn in_current_scope(&mut self, name: Text) -> bool {
        let Some(&current) = self.active.last() else { return false };
        self.slot(name).map_or(false, |slot| slot.scope == current)
    }

    /// Register a symbol in the innermost scope.
    fn insert_local(&mut self, name: Text, binder: NodeId) {
        let Some(&scope) = self.active.last() else { return };

        let new = LocalSlot {
            scope,
            binder,
            shadowed: None,
        };

        match self.slots.entry(name) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(new);
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                let old = std::mem::replace(slot, new);
                // the old slot could come back into scope:
                slot.shadowed = Some(Box::new(old));
            }
        }
    }

    /// Start a new scope.
    fn enter(&mut self) {
        self.active.push(self.next);
        self.next += 1;
    }

    /// Exit the current scope.
    fn exit(&mut self) {
        self.active.pop();
    }
}
