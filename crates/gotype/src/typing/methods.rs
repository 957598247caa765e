//! Selectors and method sets.

use std::sync::Arc;

use crate::{
    common::Text,
    syntax::{Node, NodeId},
    HashSet,
};

use super::{FunctionType, InterfaceMethod, Session, Type, TypeKind};

/// The result of selecting a member `x.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    Field {
        typ: Type,
    },
    /// A method declared with a receiver of a declared type.
    Method {
        decl: NodeId,
        signature: FunctionType,
        /// The method was declared with a pointer receiver.
        pointer_receiver: bool,
        /// The path to the method went through a pointer.
        indirect: bool,
    },
    /// A method of an interface, possibly embedded in a struct.
    InterfaceMethod {
        signature: FunctionType,
    },
}

impl Selection {
    /// The type of the selector expression when used as a value.
    pub fn value_type(&self, session: &mut Session) -> Type {
        match self {
            Selection::Field { typ } => *typ,
            Selection::Method { signature, .. } | Selection::InterfaceMethod { signature } => {
                session.intern(TypeKind::Function(signature.clone()))
            }
        }
    }
}

impl Session<'_> {
    /// Finds the shallowest field or method with the given name, following embedded fields.
    pub fn select(&mut self, typ: Type, name: Text) -> Option<Selection> {
        if let Some(selection) = self.selections.get(&(typ, name)) {
            return selection.clone();
        }

        let selection = self.find_selection(typ, name);
        self.selections.insert((typ, name), selection.clone());
        selection
    }

    fn find_selection(&mut self, typ: Type, name: Text) -> Option<Selection> {
        let (base, indirect) = match *self.lookup(typ) {
            TypeKind::Pointer(inner) => (inner, true),
            _ => (typ, false),
        };

        let mut seen = HashSet::<Type>::default();
        let mut current = vec![(base, indirect)];

        while !current.is_empty() {
            let mut next = Vec::new();

            for (typ, indirect) in current {
                if let TypeKind::Declared(binder) = *self.lookup(typ) {
                    if !seen.insert(typ) {
                        continue;
                    }
                    if let Some(selection) = self.declared_method(binder, name, indirect) {
                        return Some(selection);
                    }
                }

                let underlying = self.underlying(typ);
                match self.lookup(underlying).clone() {
                    TypeKind::Struct(strukt) => {
                        for field in strukt.fields.iter() {
                            if field.name == name && !name.is_blank() {
                                return Some(Selection::Field { typ: field.typ });
                            }
                            if field.embedded {
                                match *self.lookup(field.typ) {
                                    TypeKind::Pointer(inner) => next.push((inner, true)),
                                    _ => next.push((field.typ, indirect)),
                                }
                            }
                        }
                    }
                    TypeKind::Interface(_) | TypeKind::Error => {
                        let methods = self.interface_methods(underlying);
                        if let Some(method) = methods.iter().find(|method| method.name == name) {
                            return Some(Selection::InterfaceMethod {
                                signature: method.signature.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }

            current = next;
        }

        None
    }

    fn declared_method(&mut self, binder: NodeId, name: Text, indirect: bool) -> Option<Selection> {
        let resolution = self.resolution;
        let file = self.file;

        for &decl in resolution.methods.get(&binder)? {
            let Node::Function(func) = file.nodes.kind(decl) else { continue };
            if file.nodes.kind(func.name) != Node::Name(name) {
                continue;
            }

            let pointer_receiver = func.receiver.map_or(false, |receiver| {
                let param = file.nodes.parameter(receiver);
                matches!(file.nodes.kind(file.nodes.unparen(param.typ)), Node::Pointer(_))
            });

            return Some(Selection::Method {
                decl,
                signature: self.function_signature(decl),
                pointer_receiver,
                indirect,
            });
        }

        None
    }

    /// All methods of an interface, including those of embedded interfaces, sorted by name.
    pub fn interface_methods(&mut self, typ: Type) -> Arc<[InterfaceMethod]> {
        if let Some(methods) = self.interface_methods.get(&typ) {
            return methods.clone();
        }

        let mut methods = Vec::new();
        let mut seen = HashSet::default();
        self.collect_interface_methods(typ, &mut methods, &mut seen);

        methods.sort_by(|a, b| self.name(a.name).cmp(self.name(b.name)));
        methods.dedup_by_key(|method| method.name);

        let methods: Arc<[InterfaceMethod]> = methods.into();
        self.interface_methods.insert(typ, methods.clone());
        methods
    }

    fn collect_interface_methods(
        &mut self,
        typ: Type,
        methods: &mut Vec<InterfaceMethod>,
        seen: &mut HashSet<Type>,
    ) {
        if !seen.insert(typ) {
            return;
        }

        let underlying = self.underlying(typ);
        match self.lookup(underlying).clone() {
            TypeKind::Interface(interface) => {
                methods.extend(interface.methods.iter().cloned());
                for &embedded in interface.embedded.iter() {
                    self.collect_interface_methods(embedded, methods, seen);
                }
            }
            TypeKind::Error => {
                let string = self.intern(TypeKind::String);
                methods.push(InterfaceMethod {
                    name: self.error_method,
                    signature: FunctionType::new(&[], &[string], false),
                });
            }
            _ => {}
        }
    }

    /// Checks that `typ` has every method of the interface `interface`. Returns the name of the
    /// first missing method otherwise.
    pub fn missing_method(&mut self, typ: Type, interface: Type) -> Option<Text> {
        let required = self.interface_methods(interface);
        if required.is_empty() {
            return None;
        }

        let underlying = self.underlying(typ);
        if self.lookup(underlying).is_interface() {
            let available = self.interface_methods(underlying);
            for method in required.iter() {
                let Some(candidate) = available.iter().find(|c| c.name == method.name) else {
                    return Some(method.name);
                };
                let found = self.intern_function(&candidate.signature);
                let expected = self.intern_function(&method.signature);
                if !self.identical(found, expected) {
                    return Some(method.name);
                }
            }
            return None;
        }

        let is_pointer = matches!(self.lookup(typ), TypeKind::Pointer(_));

        for method in required.iter() {
            let signature = match self.select(typ, method.name) {
                Some(Selection::Method {
                    signature,
                    pointer_receiver,
                    indirect,
                    ..
                }) => {
                    if pointer_receiver && !(is_pointer || indirect) {
                        return Some(method.name);
                    }
                    signature
                }
                Some(Selection::InterfaceMethod { signature }) => signature,
                Some(Selection::Field { .. }) | None => return Some(method.name),
            };

            let found = self.intern_function(&signature);
            let expected = self.intern_function(&method.signature);
            if !self.identical(found, expected) {
                return Some(method.name);
            }
        }

        None
    }

    fn intern_function(&mut self, signature: &FunctionType) -> Type {
        self.intern(TypeKind::Function(signature.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::typing::tests::Fixture;

    fn declared(fixture: &Fixture, session: &mut Session, name: &str) -> Type {
        session.declared_type(fixture.global(name))
    }

    fn text(fixture: &Fixture, name: &str) -> Text {
        fixture.file.names.find(name).unwrap()
    }

    const EMBEDDING: &str = "package p
        type I interface { f(); f2(); f3(); f4() }
        type T1 struct{ x int }
        type T struct { *T1 }
        func (t *T) f() {}
        func (t *T1) f2() {}
        func (t T) f3() {}
        func (t T1) f4() {}
        type AnotherT struct{}
        func (t *AnotherT) f() {}
        func (t *AnotherT) f2() {}
        func (t AnotherT) f3() {}
        type Wrapper struct { I }
    ";

    #[test]
    fn promoted_fields_and_methods() {
        let fixture = Fixture::new(EMBEDDING);
        let mut session = fixture.session();
        let t = declared(&fixture, &mut session, "T");

        let x = session.select(t, text(&fixture, "x"));
        let int = session.intern(TypeKind::Int);
        assert_eq!(x, Some(Selection::Field { typ: int }));

        let Some(Selection::Method { pointer_receiver, indirect, .. }) =
            session.select(t, text(&fixture, "f2"))
        else {
            panic!("expected a method");
        };
        assert!(pointer_receiver);
        assert!(indirect);

        assert_eq!(session.select(t, text(&fixture, "missing")), None);
    }

    #[test]
    fn method_sets_respect_receivers() {
        let fixture = Fixture::new(EMBEDDING);
        let mut session = fixture.session();
        let i = declared(&fixture, &mut session, "I");
        let t = declared(&fixture, &mut session, "T");
        let pointer_t = session.intern(TypeKind::Pointer(t));

        assert_eq!(session.missing_method(pointer_t, i), None);
        // `f` has a pointer receiver
        assert_eq!(session.missing_method(t, i), Some(text(&fixture, "f")));

        let another = declared(&fixture, &mut session, "AnotherT");
        let pointer_another = session.intern(TypeKind::Pointer(another));
        assert_eq!(
            session.missing_method(pointer_another, i),
            Some(text(&fixture, "f4"))
        );

        let wrapper = declared(&fixture, &mut session, "Wrapper");
        assert_eq!(session.missing_method(wrapper, i), None);
    }

    #[test]
    fn mutually_embedded_structs() {
        let fixture = Fixture::new(
            "package p
            type I interface { f() }
            type T struct { *T1 }
            type T1 struct { *T }
            type U struct { *U1 }
            type U1 struct { *U }
            func (u *U1) f() {}
            ",
        );
        let mut session = fixture.session();
        let i = declared(&fixture, &mut session, "I");
        let t = declared(&fixture, &mut session, "T");
        let u = declared(&fixture, &mut session, "U");

        assert_eq!(session.missing_method(t, i), Some(text(&fixture, "f")));
        assert_eq!(session.missing_method(u, i), None);
        assert!(session.select(u, text(&fixture, "f")).is_some());
    }

    #[test]
    fn self_embedding_interface() {
        let fixture = Fixture::new("package p\ntype I interface { I; f() }\n");
        let mut session = fixture.session();
        let i = declared(&fixture, &mut session, "I");
        let names: Vec<_> = session
            .interface_methods(i)
            .iter()
            .map(|method| session.name(method.name).to_owned())
            .collect();
        assert_eq!(names, ["f"]);
    }

    #[test]
    fn embedded_interfaces_are_flattened() {
        let fixture = Fixture::new(
            "package p\ntype A interface { a(); B }\ntype B interface { b(); error }\n",
        );
        let mut session = fixture.session();
        let a = declared(&fixture, &mut session, "A");
        let names: Vec<_> = session
            .interface_methods(a)
            .iter()
            .map(|method| session.name(method.name).to_owned())
            .collect();
        assert_eq!(names, ["Error", "a", "b"]);
    }
}
