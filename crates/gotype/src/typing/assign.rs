//! Assignability and type identity.

use crate::{common::Text, diagnostic::ProblemKind, HashSet};

use super::{ConstantKind, Session, Type, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Assignable,
    NotAssignable(Reason),
}

impl Verdict {
    pub fn is_assignable(self) -> bool {
        matches!(self, Verdict::Assignable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    TypeMismatch,
    NilToNonNilable,
    InterfaceNotSatisfied { missing: Text },
}

impl Reason {
    pub fn kind(self) -> ProblemKind {
        match self {
            Reason::TypeMismatch => ProblemKind::TypeMismatch,
            Reason::NilToNonNilable => ProblemKind::NilToNonNilable,
            Reason::InterfaceNotSatisfied { .. } => ProblemKind::InterfaceNotSatisfied,
        }
    }
}

impl Session<'_> {
    /// Determines if a value of type `value` may be assigned to a location of type `target`.
    pub fn assignable(&mut self, value: Type, target: Type) -> Verdict {
        if value.is_invalid() || target.is_invalid() || self.identical(value, target) {
            return Verdict::Assignable;
        }

        let value_kind = self.lookup(value).clone();
        let target_underlying = self.underlying(target);
        let target_kind = self.lookup(target_underlying).clone();

        if target_underlying.is_invalid() {
            return Verdict::Assignable;
        }

        if target_kind.is_interface() {
            return match value_kind {
                TypeKind::Untyped(ConstantKind::Nil) => Verdict::Assignable,
                TypeKind::Untyped(_) => match self.interface_methods(target).first() {
                    None => Verdict::Assignable,
                    Some(method) => Verdict::NotAssignable(Reason::InterfaceNotSatisfied {
                        missing: method.name,
                    }),
                },
                _ => match self.missing_method(value, target) {
                    None => Verdict::Assignable,
                    Some(missing) => {
                        Verdict::NotAssignable(Reason::InterfaceNotSatisfied { missing })
                    }
                },
            };
        }

        if let TypeKind::Untyped(kind) = value_kind {
            if kind == ConstantKind::Nil {
                return match target_kind.is_nillable() {
                    true => Verdict::Assignable,
                    false => Verdict::NotAssignable(Reason::NilToNonNilable),
                };
            }

            let fits = match self.lookup(target) {
                TypeKind::Untyped(target) => widens_to(kind, *target),
                _ => untyped_fits(kind, &target_kind),
            };
            return match fits {
                true => Verdict::Assignable,
                false => Verdict::NotAssignable(Reason::TypeMismatch),
            };
        }

        let value_underlying = self.underlying(value);
        if value_underlying.is_invalid() {
            return Verdict::Assignable;
        }

        let either_unnamed = !value_kind.is_declared() || !self.lookup(target).is_declared();
        if either_unnamed && self.identical(value_underlying, target_underlying) {
            return Verdict::Assignable;
        }

        if let (
            TypeKind::Channel(crate::syntax::ChannelKind::SendRecv, value_elem),
            TypeKind::Channel(_, target_elem),
        ) = (self.lookup(value_underlying).clone(), &target_kind)
        {
            if either_unnamed && self.identical(value_elem, *target_elem) {
                return Verdict::Assignable;
            }
        }

        Verdict::NotAssignable(Reason::TypeMismatch)
    }

    /// Determines if a value of type `value` may be explicitly converted to `target`.
    pub fn convertible(&mut self, value: Type, target: Type) -> bool {
        if self.assignable(value, target).is_assignable() {
            return true;
        }

        let value_underlying = self.underlying(value);
        let target_underlying = self.underlying(target);
        if value_underlying.is_invalid() || target_underlying.is_invalid() {
            return true;
        }
        if self.identical(value_underlying, target_underlying) {
            return true;
        }

        let value_kind = self.lookup(value_underlying).clone();
        let target_kind = self.lookup(target_underlying).clone();
        let value_class = value_kind.class();
        let target_class = target_kind.class();

        if value_class.is_numeric() && target_class.is_numeric() {
            return true;
        }

        if target_class.is_string() {
            return value_class.is_integer() || self.is_text_slice(&value_kind);
        }
        if value_class.is_string() {
            return self.is_text_slice(&target_kind);
        }

        if let (TypeKind::Pointer(value_base), TypeKind::Pointer(target_base)) =
            (value_kind, target_kind)
        {
            let value_base = self.underlying(value_base);
            let target_base = self.underlying(target_base);
            return self.identical(value_base, target_base);
        }

        false
    }

    /// `[]byte` and `[]rune`, which convert to and from strings.
    fn is_text_slice(&mut self, kind: &TypeKind) -> bool {
        let TypeKind::Slice(elem) = *kind else { return false };
        let elem = self.underlying(elem);
        matches!(
            self.lookup(elem),
            TypeKind::Byte | TypeKind::Uint8 | TypeKind::Rune | TypeKind::Int32
        )
    }

    /// Determines if two types are identical, treating `byte`/`uint8` and `rune`/`int32` as the
    /// same type.
    pub fn identical(&mut self, a: Type, b: Type) -> bool {
        let mut visited = HashSet::default();
        self.identical_in(a, b, &mut visited)
    }

    fn identical_in(&mut self, a: Type, b: Type, visited: &mut HashSet<(Type, Type)>) -> bool {
        let a = self.canonical(a);
        let b = self.canonical(b);
        if a == b {
            return true;
        }

        // recursive types are identical if they have not been proven otherwise
        if !visited.insert((a, b)) {
            return true;
        }

        let a_kind = self.lookup(a).clone();
        let b_kind = self.lookup(b).clone();

        match a_kind {
            TypeKind::Pointer(a) => match b_kind {
                TypeKind::Pointer(b) => self.identical_in(a, b, visited),
                _ => false,
            },
            TypeKind::Slice(a) => match b_kind {
                TypeKind::Slice(b) => self.identical_in(a, b, visited),
                _ => false,
            },
            TypeKind::Array(a_len, a) => match b_kind {
                TypeKind::Array(b_len, b) => a_len == b_len && self.identical_in(a, b, visited),
                _ => false,
            },
            TypeKind::Map(a_key, a_value) => match b_kind {
                TypeKind::Map(b_key, b_value) => {
                    self.identical_in(a_key, b_key, visited)
                        && self.identical_in(a_value, b_value, visited)
                }
                _ => false,
            },
            TypeKind::Channel(a_dir, a) => match b_kind {
                TypeKind::Channel(b_dir, b) => a_dir == b_dir && self.identical_in(a, b, visited),
                _ => false,
            },
            TypeKind::Function(a) => match b_kind {
                TypeKind::Function(b) => {
                    a.inputs == b.inputs
                        && a.variadic == b.variadic
                        && a.types.len() == b.types.len()
                        && a.types
                            .iter()
                            .zip(b.types.iter())
                            .all(|(&a, &b)| self.identical_in(a, b, visited))
                }
                _ => false,
            },
            TypeKind::Struct(a) => match b_kind {
                TypeKind::Struct(b) => {
                    a.fields.len() == b.fields.len()
                        && a.fields.iter().zip(b.fields.iter()).all(|(a, b)| {
                            a.name == b.name
                                && a.embedded == b.embedded
                                && self.identical_in(a.typ, b.typ, visited)
                        })
                }
                _ => false,
            },
            TypeKind::Interface(_) => match b_kind {
                TypeKind::Interface(_) => {
                    let a_methods = self.interface_methods(a);
                    let b_methods = self.interface_methods(b);
                    a_methods.len() == b_methods.len()
                        && a_methods.iter().zip(b_methods.iter()).all(|(a, b)| {
                            let a_sig = self.intern(TypeKind::Function(a.signature.clone()));
                            let b_sig = self.intern(TypeKind::Function(b.signature.clone()));
                            a.name == b.name && self.identical_in(a_sig, b_sig, visited)
                        })
                }
                _ => false,
            },

            // compared by handle above
            TypeKind::Invalid
            | TypeKind::Untyped(_)
            | TypeKind::Builtin(_)
            | TypeKind::Bool
            | TypeKind::Int
            | TypeKind::Int8
            | TypeKind::Int16
            | TypeKind::Int32
            | TypeKind::Int64
            | TypeKind::Uint
            | TypeKind::Uint8
            | TypeKind::Uint16
            | TypeKind::Uint32
            | TypeKind::Uint64
            | TypeKind::Uintptr
            | TypeKind::Float32
            | TypeKind::Float64
            | TypeKind::Complex64
            | TypeKind::Complex128
            | TypeKind::String
            | TypeKind::Byte
            | TypeKind::Rune
            | TypeKind::Error
            | TypeKind::Declared(_) => false,
        }
    }

    fn canonical(&mut self, typ: Type) -> Type {
        match self.lookup(typ) {
            TypeKind::Byte => self.intern(TypeKind::Uint8),
            TypeKind::Rune => self.intern(TypeKind::Int32),
            _ => typ,
        }
    }
}

/// Can an untyped constant of one kind be used where another untyped kind is expected?
pub(super) fn widens_to(from: ConstantKind, to: ConstantKind) -> bool {
    if from == to {
        return true;
    }
    from.is_numeric() && to.is_numeric() && numeric_rank(from) <= numeric_rank(to)
}

fn numeric_rank(kind: ConstantKind) -> u8 {
    match kind {
        ConstantKind::Integer | ConstantKind::Rune => 0,
        ConstantKind::Float => 1,
        ConstantKind::Complex => 2,
        ConstantKind::Boolean | ConstantKind::String | ConstantKind::Nil => u8::MAX,
    }
}

/// Can an untyped constant of the given kind be represented by the (underlying) basic type?
pub(super) fn untyped_fits(kind: ConstantKind, target: &TypeKind) -> bool {
    let class = target.class();
    match kind {
        ConstantKind::Boolean => class.is_boolean(),
        ConstantKind::String => class.is_string(),
        ConstantKind::Integer | ConstantKind::Rune => class.is_numeric(),
        ConstantKind::Float => class.intersects(super::TypeClass::FLOAT | super::TypeClass::COMPLEX),
        ConstantKind::Complex => class.contains(super::TypeClass::COMPLEX),
        ConstantKind::Nil => target.is_nillable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::typing::tests::Fixture;

    const TYPES: &str = "package p
        type MyInt int
        type OtherInt int
        type Ints []int
        type Stringer interface { String() string }
        type Named struct{}
        func (n Named) String() string { return \"\" }
        type Ptr struct{}
        func (p *Ptr) String() string { return \"\" }
        type Chan chan int
    ";

    struct Types<'a> {
        fixture: &'a Fixture,
        session: Session<'a>,
    }

    impl<'a> Types<'a> {
        fn declared(&mut self, name: &str) -> Type {
            self.session.declared_type(self.fixture.global(name))
        }

        fn kind(&mut self, kind: TypeKind) -> Type {
            self.session.intern(kind)
        }

        fn assignable(&mut self, value: Type, target: Type) -> Verdict {
            self.session.assignable(value, target)
        }
    }

    fn with_types(f: impl FnOnce(&mut Types)) {
        let fixture = Fixture::new(TYPES);
        let session = fixture.session();
        f(&mut Types {
            fixture: &fixture,
            session,
        });
    }

    const MISMATCH: Verdict = Verdict::NotAssignable(Reason::TypeMismatch);

    #[test]
    fn untyped_constants() {
        with_types(|t| {
            let int = t.kind(TypeKind::Int);
            let float = t.kind(TypeKind::Float64);
            let complex = t.kind(TypeKind::Complex64);
            let string = t.kind(TypeKind::String);
            let my_int = t.declared("MyInt");

            let untyped_int = t.kind(TypeKind::Untyped(ConstantKind::Integer));
            let untyped_float = t.kind(TypeKind::Untyped(ConstantKind::Float));
            let untyped_complex = t.kind(TypeKind::Untyped(ConstantKind::Complex));
            let untyped_string = t.kind(TypeKind::Untyped(ConstantKind::String));

            for target in [int, float, complex, my_int] {
                assert_eq!(t.assignable(untyped_int, target), Verdict::Assignable);
            }
            assert_eq!(t.assignable(untyped_int, string), MISMATCH);
            assert_eq!(t.assignable(untyped_float, int), MISMATCH);
            assert_eq!(t.assignable(untyped_float, complex), Verdict::Assignable);
            assert_eq!(t.assignable(untyped_complex, float), MISMATCH);
            assert_eq!(t.assignable(untyped_string, string), Verdict::Assignable);

            assert_eq!(t.assignable(untyped_int, untyped_complex), Verdict::Assignable);
            assert_eq!(t.assignable(untyped_complex, untyped_int), MISMATCH);
        });
    }

    #[test]
    fn nil_targets() {
        with_types(|t| {
            let nil = t.kind(TypeKind::Untyped(ConstantKind::Nil));
            let string = t.kind(TypeKind::String);
            let ints = t.declared("Ints");
            let stringer = t.declared("Stringer");

            assert_eq!(t.assignable(nil, ints), Verdict::Assignable);
            assert_eq!(t.assignable(nil, stringer), Verdict::Assignable);
            assert_eq!(
                t.assignable(nil, string),
                Verdict::NotAssignable(Reason::NilToNonNilable)
            );
        });
    }

    #[test]
    fn named_and_unnamed_types() {
        with_types(|t| {
            let int = t.kind(TypeKind::Int);
            let my_int = t.declared("MyInt");
            let other_int = t.declared("OtherInt");
            let ints = t.declared("Ints");
            let slice = t.kind(TypeKind::Slice(int));

            assert_eq!(t.assignable(slice, ints), Verdict::Assignable);
            assert_eq!(t.assignable(ints, slice), Verdict::Assignable);
            assert_eq!(t.assignable(my_int, other_int), MISMATCH);
            assert_eq!(t.assignable(my_int, my_int), Verdict::Assignable);
        });
    }

    #[test]
    fn channel_directions() {
        with_types(|t| {
            let int = t.kind(TypeKind::Int);
            let both = t.kind(TypeKind::Channel(crate::syntax::ChannelKind::SendRecv, int));
            let send = t.kind(TypeKind::Channel(crate::syntax::ChannelKind::Send, int));
            let named = t.declared("Chan");

            assert_eq!(t.assignable(both, send), Verdict::Assignable);
            assert_eq!(t.assignable(send, both), MISMATCH);
            assert_eq!(t.assignable(named, send), Verdict::Assignable);
        });
    }

    #[test]
    fn interface_satisfaction() {
        with_types(|t| {
            let stringer = t.declared("Stringer");
            let named = t.declared("Named");
            let ptr = t.declared("Ptr");
            let ptr_ptr = t.kind(TypeKind::Pointer(ptr));
            let int = t.kind(TypeKind::Int);

            assert_eq!(t.assignable(named, stringer), Verdict::Assignable);
            assert_eq!(t.assignable(ptr_ptr, stringer), Verdict::Assignable);
            assert!(matches!(
                t.assignable(ptr, stringer),
                Verdict::NotAssignable(Reason::InterfaceNotSatisfied { .. })
            ));
            assert!(!t.assignable(int, stringer).is_assignable());
        });
    }

    #[test]
    fn cyclic_declarations() {
        let fixture = Fixture::new(
            "package p
            type A B
            type B A
            type C = D
            type D = C
            type I interface { I; f() }
            type J interface { f() }
            type List struct { next *List }
            ",
        );
        let mut session = fixture.session();
        let mut declared = |name: &str| session.declared_type(fixture.global(name));
        let a = declared("A");
        let b = declared("B");
        let c = declared("C");
        let i = declared("I");
        let j = declared("J");
        let list = declared("List");

        let int = session.intern(TypeKind::Int);
        assert!(session.underlying(a).is_invalid());
        assert!(session.underlying(b).is_invalid());
        assert!(c.is_invalid());
        assert_eq!(session.assignable(a, b), Verdict::Assignable);
        assert_eq!(session.assignable(int, a), Verdict::Assignable);

        assert_eq!(session.assignable(j, i), Verdict::Assignable);
        assert_eq!(session.assignable(i, j), Verdict::Assignable);

        let underlying = session.underlying(list);
        assert_eq!(session.display(underlying).to_string(), "struct{next *List}");
        assert_eq!(session.assignable(list, underlying), Verdict::Assignable);
    }

    #[test]
    fn byte_is_uint8() {
        with_types(|t| {
            let byte = t.kind(TypeKind::Byte);
            let uint8 = t.kind(TypeKind::Uint8);
            let bytes = t.kind(TypeKind::Slice(byte));
            let uint8s = t.kind(TypeKind::Slice(uint8));
            assert!(t.session.identical(bytes, uint8s));
            assert_eq!(t.assignable(bytes, uint8s), Verdict::Assignable);
        });
    }

    #[test]
    fn conversions() {
        with_types(|t| {
            let int = t.kind(TypeKind::Int);
            let float = t.kind(TypeKind::Float32);
            let string = t.kind(TypeKind::String);
            let byte = t.kind(TypeKind::Byte);
            let bytes = t.kind(TypeKind::Slice(byte));
            let my_int = t.declared("MyInt");
            let ints = t.declared("Ints");
            let nil = t.kind(TypeKind::Untyped(ConstantKind::Nil));

            assert!(t.session.convertible(float, my_int));
            assert!(t.session.convertible(my_int, string));
            assert!(t.session.convertible(string, bytes));
            assert!(t.session.convertible(bytes, string));
            assert!(!t.session.convertible(string, int));
            assert!(!t.session.convertible(ints, bytes));
            assert!(!t.session.convertible(nil, string));
        });
    }
}
