//! Operand types of unary and binary operators.

use crate::{
    diagnostic::ProblemKind,
    syntax::{BinaryOperator, NodeId, UnaryOperator},
};

use super::{Checker, ConstantKind, Operand, Type, TypeClass, TypeKind};

impl Checker<'_, '_> {
    pub(super) fn check_unary(
        &mut self,
        expr: NodeId,
        op: UnaryOperator,
        inner: NodeId,
    ) -> Operand {
        let operand = self.infer(inner);

        if let (UnaryOperator::Deref, Operand::Type(typ)) = (op, &operand) {
            return Operand::Type(self.session.intern(TypeKind::Pointer(*typ)));
        }

        let typ = self.single_value(inner, &operand);
        if self.is_broken(typ) {
            return Operand::Invalid;
        }

        let underlying = self.session.underlying(typ);
        let class = self.session.lookup(underlying).class();

        let defined = match op {
            UnaryOperator::Ref => {
                return Operand::Value(self.session.intern(TypeKind::Pointer(typ)));
            }
            UnaryOperator::Deref => {
                if let TypeKind::Pointer(inner_type) = *self.session.lookup(underlying) {
                    return Operand::Value(inner_type);
                }
                let diagnostic = problem!(
                    ProblemKind::OperatorTypeMismatch,
                    self.span(expr),
                    "invalid operation: cannot indirect {} (type {})",
                    self.text(inner),
                    self.session.display(typ),
                );
                self.emit(diagnostic);
                return Operand::Invalid;
            }
            UnaryOperator::Recv => return self.check_receive(inner, typ),
            UnaryOperator::Plus | UnaryOperator::Minus => class.is_numeric(),
            UnaryOperator::Xor => class.is_integer(),
            UnaryOperator::Not => class.is_boolean(),
        };

        if !defined {
            self.operator_not_defined(expr, op, typ);
            return Operand::Invalid;
        }

        Operand::Value(typ)
    }

    fn check_receive(&mut self, channel: NodeId, typ: Type) -> Operand {
        let underlying = self.session.underlying(typ);
        let problem = match *self.session.lookup(underlying) {
            TypeKind::Channel(kind, elem) if kind.is_recv() => return Operand::CommaOk(elem),
            TypeKind::Channel(..) => "cannot receive from send-only channel",
            _ => "cannot receive from non-channel",
        };
        let diagnostic = problem!(
            ProblemKind::OperatorTypeMismatch,
            self.span(channel),
            "invalid operation: {problem} {} (type {})",
            self.text(channel),
            self.session.display(typ),
        );
        self.emit(diagnostic);
        Operand::Invalid
    }

    pub(super) fn check_binary(
        &mut self,
        expr: NodeId,
        lhs: NodeId,
        op: BinaryOperator,
        rhs: NodeId,
    ) -> Operand {
        let lhs_type = self.value(lhs);
        let rhs_type = self.value(rhs);
        match self.binary_result(expr, lhs_type, op, rhs, rhs_type) {
            Some(typ) => Operand::Value(typ),
            None => Operand::Invalid,
        }
    }

    /// Checks `x op= y`.
    pub(super) fn check_assign_op(
        &mut self,
        stmt: NodeId,
        lhs: NodeId,
        op: BinaryOperator,
        rhs: NodeId,
    ) {
        let lhs_type = self.value(lhs);
        let rhs_type = self.value(rhs);
        self.binary_result(stmt, lhs_type, op, rhs, rhs_type);
    }

    pub(super) fn check_increment(&mut self, stmt: NodeId, target: NodeId) {
        let typ = self.value(target);
        if self.is_broken(typ) || self.session.class(typ).is_numeric() {
            return;
        }
        let diagnostic = problem!(
            ProblemKind::OperatorTypeMismatch,
            self.span(stmt),
            "invalid operation: {} (non-numeric type {})",
            self.text(stmt),
            self.session.display(typ),
        );
        self.emit(diagnostic);
    }

    pub(super) fn check_send(&mut self, stmt: NodeId, channel: NodeId, value: NodeId) {
        let typ = self.value(channel);
        let underlying = self.session.underlying(typ);

        let problem = match *self.session.lookup(underlying) {
            TypeKind::Invalid => None,
            TypeKind::Channel(kind, elem) if kind.is_send() => {
                self.expect(value, elem);
                return;
            }
            TypeKind::Channel(..) => Some("send to receive-only type"),
            _ => Some("send to non-chan type"),
        };

        if let Some(problem) = problem {
            let diagnostic = problem!(
                ProblemKind::OperatorTypeMismatch,
                self.span(stmt),
                "invalid operation: {} ({problem} {})",
                self.text(stmt),
                self.session.display(typ),
            );
            self.emit(diagnostic);
        }
        self.value(value);
    }

    /// The type of `lhs op rhs`, or `None` after reporting why the operation is invalid.
    fn binary_result(
        &mut self,
        expr: NodeId,
        lhs: Type,
        op: BinaryOperator,
        rhs_node: NodeId,
        rhs: Type,
    ) -> Option<Type> {
        let boolean = self.session.untyped(ConstantKind::Boolean);

        if self.is_broken(lhs) || self.is_broken(rhs) {
            return match op.is_comparison() {
                true => Some(boolean),
                false => None,
            };
        }

        if op.is_shift() {
            let count = self.session.class(rhs);
            let unsigned = count.is_integer() && (count.is_untyped() || !count.is_signed());
            if !unsigned {
                let diagnostic = problem!(
                    ProblemKind::OperatorTypeMismatch,
                    self.span(rhs_node),
                    "invalid operation: {} (shift count type {}, must be unsigned integer)",
                    self.text(rhs_node),
                    self.session.display(rhs),
                );
                self.emit(diagnostic);
                return None;
            }
            if !self.session.class(lhs).is_integer() {
                self.operator_not_defined(expr, op, lhs);
                return None;
            }
            return Some(lhs);
        }

        if op.is_comparison() {
            let comparable = self.session.assignable(lhs, rhs).is_assignable()
                || self.session.assignable(rhs, lhs).is_assignable();
            if !comparable {
                self.mismatched_types(expr, lhs, rhs);
                return None;
            }

            let nil = self.session.untyped(ConstantKind::Nil);
            let operand = if lhs == nil { rhs } else { lhs };
            let class = self.session.class(operand);
            let underlying = self.session.underlying(operand);
            let defined = match op {
                BinaryOperator::Equal | BinaryOperator::NotEqual => {
                    let with_nil = lhs == nil || rhs == nil;
                    with_nil || !is_incomparable(self.session.lookup(underlying))
                }
                _ => class.contains(TypeClass::TRIVIALLY_ORDERED),
            };
            if !defined {
                self.operator_not_defined(expr, op, operand);
                return None;
            }
            return Some(boolean);
        }

        let Some(typ) = self.common_type(lhs, rhs) else {
            self.mismatched_types(expr, lhs, rhs);
            return None;
        };

        let class = self.session.class(typ);
        let defined = match op {
            BinaryOperator::Add => class.is_numeric() || class.is_string(),
            BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div => class.is_numeric(),
            BinaryOperator::Rem
            | BinaryOperator::BitOr
            | BinaryOperator::BitXor
            | BinaryOperator::BitAnd
            | BinaryOperator::BitNand => class.is_integer(),
            BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => class.is_boolean(),
            _ => true,
        };
        if !defined {
            self.operator_not_defined(expr, op, typ);
            return None;
        }

        Some(typ)
    }

    /// The type both operands are converted to, if any.
    fn common_type(&mut self, lhs: Type, rhs: Type) -> Option<Type> {
        let lhs_kind = self.session.lookup(lhs).clone();
        let rhs_kind = self.session.lookup(rhs).clone();

        match (lhs_kind, rhs_kind) {
            (TypeKind::Untyped(a), TypeKind::Untyped(b)) => {
                if a == b {
                    Some(lhs)
                } else if a.is_numeric() && b.is_numeric() {
                    Some(self.session.untyped(a.max(b)))
                } else {
                    None
                }
            }
            (TypeKind::Untyped(_), _) => {
                self.session.assignable(lhs, rhs).is_assignable().then_some(rhs)
            }
            (_, TypeKind::Untyped(_)) => {
                self.session.assignable(rhs, lhs).is_assignable().then_some(lhs)
            }
            _ => self.session.identical(lhs, rhs).then_some(lhs),
        }
    }

    /// Types of erroneous expressions and declared types without a valid underlying type.
    fn is_broken(&mut self, typ: Type) -> bool {
        typ.is_invalid() || self.session.underlying(typ).is_invalid()
    }

    fn mismatched_types(&mut self, expr: NodeId, lhs: Type, rhs: Type) {
        let diagnostic = problem!(
            ProblemKind::OperatorTypeMismatch,
            self.span(expr),
            "invalid operation: {} (mismatched types {} and {})",
            self.text(expr),
            self.session.display(lhs),
            self.session.display(rhs),
        );
        self.emit(diagnostic);
    }

    fn operator_not_defined(&mut self, expr: NodeId, op: impl std::fmt::Display, typ: Type) {
        let diagnostic = problem!(
            ProblemKind::OperatorTypeMismatch,
            self.span(expr),
            "invalid operation: {} (operator {op} not defined on {})",
            self.text(expr),
            self.session.display(typ),
        );
        self.emit(diagnostic);
    }
}

/// Slices, maps and functions may only be compared to `nil`.
fn is_incomparable(kind: &TypeKind) -> bool {
    matches!(kind, TypeKind::Slice(_) | TypeKind::Map(_, _) | TypeKind::Function(_))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::typing::tests::Fixture;

    fn messages(body: &str) -> Vec<String> {
        let source = format!(
            "package p\nfunc _(a int, b uint, q bool, s []int, c chan<- int) {{\n{body}\n}}\n"
        );
        Fixture::new(&source).messages()
    }

    #[test]
    fn arithmetic_requires_identical_types() {
        assert_eq!(
            messages("_ = a + b\n_ = a & b\n_ = a + 1\n_ = 1.5 + 2\n_ = a % 2.5"),
            [
                "invalid operation: a + b (mismatched types int and uint)",
                "invalid operation: a & b (mismatched types int and uint)",
                "invalid operation: a % 2.5 (mismatched types int and untyped float64)",
            ]
        );
    }

    #[test]
    fn shift_counts_must_be_unsigned() {
        assert_eq!(
            messages("_ = a << b\n_ = b >> a\n_ = b << 2\n_ = q << 1"),
            [
                "invalid operation: a (shift count type int, must be unsigned integer)",
                "invalid operation: q << 1 (operator << not defined on bool)",
            ]
        );
    }

    #[test]
    fn logical_operators_require_booleans() {
        assert_eq!(
            messages("_ = a || a\n_ = q && q\n_ = !a\n_ = !q"),
            [
                "invalid operation: a || a (operator || not defined on int)",
                "invalid operation: !a (operator ! not defined on int)",
            ]
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            messages("_ = a == b\n_ = s == nil\n_ = s == s\n_ = q < q\n_ = a < 2"),
            [
                "invalid operation: a == b (mismatched types int and uint)",
                "invalid operation: s == s (operator == not defined on []int)",
                "invalid operation: q < q (operator < not defined on bool)",
            ]
        );
    }

    #[test]
    fn channels_and_pointers() {
        assert_eq!(
            messages("c <- 1\n_ = <-c\ns <- 1\n_ = *a\np := &a\n_ = *p + 1"),
            [
                "invalid operation: cannot receive from send-only channel c (type chan<- int)",
                "invalid operation: s <- 1 (send to non-chan type []int)",
                "invalid operation: cannot indirect a (type int)",
            ]
        );
    }

    #[test]
    fn cyclic_types_do_not_cascade() {
        let source = "package p
            type A B
            type B A
            func _(a A, b B) {
                _ = a + 1
                _ = -a
                _ = a < b
                a++
            }
        ";
        assert_eq!(Fixture::new(source).messages(), Vec::<String>::new());
    }

    #[test]
    fn assignment_operators() {
        assert_eq!(
            messages("a += b\na += 1\nq++\na++"),
            [
                "invalid operation: a += b (mismatched types int and uint)",
                "invalid operation: q++ (non-numeric type bool)",
            ]
        );
    }
}
