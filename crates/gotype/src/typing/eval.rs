//! Evaluation of integer constant expressions, as needed for array lengths.

use crate::{
    naming::{BindingKind, Builtin, Symbol},
    syntax::{self, BinaryOperator, Node, NodeId, UnaryOperator},
};

use super::Session;

/// Evaluates an integer constant expression, returning `None` if the value cannot be determined.
pub fn const_integer(session: &mut Session, expr: NodeId) -> Option<i64> {
    EvalContext {
        session,
        iota: None,
    }
    .eval(expr)
}

struct EvalContext<'s, 'a> {
    session: &'s mut Session<'a>,
    /// The value of `iota` in the constant declaration being evaluated.
    iota: Option<u32>,
}

impl EvalContext<'_, '_> {
    fn eval(&mut self, expr: NodeId) -> Option<i64> {
        let file = self.session.file;
        let nodes = &file.nodes;
        match nodes.kind(expr) {
            Node::Integer(value) => i64::try_from(value).ok(),
            Node::Paren(inner) => self.eval(inner),

            Node::Name(_) => match self.session.resolution.symbol(expr)? {
                Symbol::Builtin(Builtin::Iota) => self.iota.map(i64::from),
                Symbol::Builtin(_) | Symbol::Package(_) => None,
                Symbol::Binding(binder) => self.eval_constant(binder),
            },

            Node::Unary(op, inner) => {
                let value = self.eval(inner)?;
                match op {
                    UnaryOperator::Plus => Some(value),
                    UnaryOperator::Minus => value.checked_neg(),
                    UnaryOperator::Xor => Some(!value),
                    UnaryOperator::Not
                    | UnaryOperator::Deref
                    | UnaryOperator::Ref
                    | UnaryOperator::Recv => None,
                }
            }

            Node::Binary(lhs, op, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                match op {
                    BinaryOperator::Add => lhs.checked_add(rhs),
                    BinaryOperator::Sub => lhs.checked_sub(rhs),
                    BinaryOperator::Mul => lhs.checked_mul(rhs),
                    BinaryOperator::Div => lhs.checked_div(rhs),
                    BinaryOperator::Rem => lhs.checked_rem(rhs),
                    BinaryOperator::BitOr => Some(lhs | rhs),
                    BinaryOperator::BitXor => Some(lhs ^ rhs),
                    BinaryOperator::BitAnd => Some(lhs & rhs),
                    BinaryOperator::BitNand => Some(lhs & !rhs),
                    BinaryOperator::ShiftLeft => lhs.checked_shl(u32::try_from(rhs).ok()?),
                    BinaryOperator::ShiftRight => lhs.checked_shr(u32::try_from(rhs).ok()?),
                    _ => None,
                }
            }

            // conversions between integer types keep the value
            Node::Call(target, args, false) if args.len() == 1 => {
                let arg = nodes.indirect(args)[0];
                match self.session.resolution.symbol(nodes.unparen(target))? {
                    Symbol::Builtin(builtin) if is_integer_type(builtin) => self.eval(arg),
                    _ => None,
                }
            }

            _ => None,
        }
    }

    fn eval_constant(&mut self, binder: NodeId) -> Option<i64> {
        let BindingKind::Const { spec, index } = self.session.resolution.binding(binder)?.kind
        else {
            return None;
        };
        let nodes = &self.session.file.nodes;
        let Node::ConstSpec(spec) = nodes.kind(spec) else { return None };
        let value = value_at(nodes, spec, index)?;

        if !self.session.in_progress.insert(binder) {
            tracing::debug!(binder = ?binder, "cyclic constant");
            return None;
        }

        let outer = self.iota.replace(spec.iota);
        let result = self.eval(value);
        self.iota = outer;

        self.session.in_progress.remove(&binder);
        result
    }
}

fn value_at(nodes: &syntax::NodeStorage, spec: syntax::ValueSpec, index: usize) -> Option<NodeId> {
    nodes.indirect(spec.values).get(index).copied()
}

fn is_integer_type(builtin: Builtin) -> bool {
    matches!(
        builtin,
        Builtin::Int
            | Builtin::Int8
            | Builtin::Int16
            | Builtin::Int32
            | Builtin::Int64
            | Builtin::Uint
            | Builtin::Uint8
            | Builtin::Uint16
            | Builtin::Uint32
            | Builtin::Uint64
            | Builtin::Uintptr
            | Builtin::Byte
            | Builtin::Rune
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::typing::tests::Fixture;
    use crate::typing::TypeKind;

    fn array_length(source: &str) -> Option<u64> {
        let fixture = Fixture::new(source);
        let mut session = fixture.session();
        let typ = session.declared_type(fixture.global("A"));
        let underlying = session.underlying(typ);
        match session.lookup(underlying) {
            TypeKind::Array(len, _) => Some(*len),
            _ => None,
        }
    }

    #[test]
    fn literal_arithmetic() {
        assert_eq!(array_length("package p\ntype A [(3 + 1) * 2 << 1]int\n"), Some(16));
    }

    #[test]
    fn named_constants_with_iota() {
        let source = "package p
            const (
                a = iota * 10
                b
                c
            )
            type A [c + int(1)]int
        ";
        assert_eq!(array_length(source), Some(21));
    }

    #[test]
    fn unknown_lengths_are_invalid() {
        assert_eq!(array_length("package p\nvar n = 3\ntype A [n]int\n"), None);
        assert_eq!(
            array_length("package p\nconst x = y\nconst y = x\ntype A [x]int\n"),
            None
        );
    }
}
