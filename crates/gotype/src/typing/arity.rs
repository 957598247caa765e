//! Matching the number of values produced by expressions with the number expected.

use std::cmp::Ordering;

use crate::{
    diagnostic::ProblemKind,
    syntax::{AssignRange, Node, NodeId, NodeRange, RangeStmt},
};

use super::{Checker, FunctionType, Operand, Type, TypeKind, Verdict};

/// Something a value is assigned to.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// An existing location.
    Expr(NodeId),
    /// A variable declared with an explicit type.
    Declared(Type),
    /// A new variable or the blank identifier, which accepts any single value.
    Fresh,
}

impl Checker<'_, '_> {
    pub(super) fn check_assignment(&mut self, stmt: NodeId, assign: AssignRange) {
        let nodes = self.nodes();
        let targets: Vec<Target> = nodes
            .indirect(assign.lhs())
            .iter()
            .map(|&target| match nodes.kind(target) {
                Node::Name(name) if name.is_blank() => Target::Fresh,
                _ => Target::Expr(target),
            })
            .collect();
        self.assign_values(stmt, &targets, nodes.indirect(assign.rhs()));
    }

    pub(super) fn check_define(&mut self, stmt: NodeId, assign: AssignRange) {
        let nodes = self.nodes();
        let resolution = self.session.resolution;
        let targets: Vec<Target> = nodes
            .indirect(assign.lhs())
            .iter()
            .map(|&target| match nodes.kind(target) {
                Node::Name(name) if name.is_blank() => Target::Fresh,
                _ if resolution.is_binder(target) => Target::Fresh,
                _ => Target::Expr(target),
            })
            .collect();
        self.assign_values(stmt, &targets, nodes.indirect(assign.rhs()));
    }

    /// Checks the initializers of a `var` or `const` spec.
    pub(super) fn check_value_spec(&mut self, spec_node: NodeId) {
        let nodes = self.nodes();
        let (Node::VarSpec(spec) | Node::ConstSpec(spec)) = nodes.kind(spec_node) else { return };

        // the values belong to an earlier spec, where they have been checked already
        if spec.implicit {
            return;
        }

        let target = match spec.typ {
            Some(typ) => Target::Declared(self.session.resolve_type(typ)),
            None => Target::Fresh,
        };
        let targets = vec![target; spec.names.len()];

        let values = nodes.indirect(spec.values);
        if !values.is_empty() {
            self.assign_values(spec_node, &targets, values);
        }
    }

    fn assign_values(&mut self, stmt: NodeId, targets: &[Target], values: &[NodeId]) {
        match (values, targets) {
            (&[value], &[target]) => {
                let operand = self.infer(value);
                let produced = operand.values().map(|values| values.len());
                let typ = self.single_value(value, &operand);
                match produced {
                    Some(1) => self.assign_to(value, typ, target),
                    Some(produced) => self.count_mismatch(stmt, produced, 1),
                    None => self.assign_to(value, typ, target),
                }
            }

            (&[value], _) => {
                let operand = self.infer(value);
                match self.spread_values(&operand, targets.len()) {
                    Some(types) => {
                        for (&typ, &target) in types.iter().zip(targets) {
                            self.assign_to(value, typ, target);
                        }
                    }
                    None => {
                        if let Some(values) = operand.values() {
                            self.count_mismatch(stmt, values.len(), targets.len());
                        }
                    }
                }
            }

            _ if values.len() != targets.len() => {
                self.count_mismatch(stmt, values.len(), targets.len());
                for &value in values {
                    self.infer(value);
                }
                for &target in targets {
                    self.target_type(target);
                }
            }

            _ => {
                for (&value, &target) in values.iter().zip(targets) {
                    let typ = self.value(value);
                    self.assign_to(value, typ, target);
                }
            }
        }
    }

    fn assign_to(&mut self, value: NodeId, typ: Type, target: Target) {
        if let Some(target) = self.target_type(target) {
            self.check_assignable(value, typ, target);
        }
    }

    fn target_type(&mut self, target: Target) -> Option<Type> {
        match target {
            Target::Expr(expr) => Some(self.value(expr)),
            Target::Declared(typ) => Some(typ),
            Target::Fresh => None,
        }
    }

    fn count_mismatch(&mut self, stmt: NodeId, produced: usize, expected: usize) {
        let diagnostic = problem!(
            ProblemKind::AssignmentCountMismatch,
            self.span(stmt),
            "Assignment count mismatch: {produced} element(s) assigned to {expected} element(s)"
        );
        self.emit(diagnostic);
    }

    pub(super) fn check_return(&mut self, stmt: NodeId, values: NodeRange) {
        let values = self.nodes().indirect(values);
        let Some(func) = self.results.last().cloned() else {
            for &value in values {
                self.infer(value);
            }
            return;
        };
        let outputs = func.outputs();

        if values.is_empty() {
            return;
        }

        if let &[value] = values {
            if outputs.len() != 1 {
                let operand = self.infer(value);
                let Some(produced) = operand.values() else { return };
                if self.check_return_count(stmt, produced.len(), outputs.len()) {
                    for (&typ, &output) in produced.iter().zip(outputs) {
                        self.check_assignable(value, typ, output);
                    }
                }
                return;
            }
        }

        if !self.check_return_count(stmt, values.len(), outputs.len()) {
            for &value in values {
                self.infer(value);
            }
            return;
        }

        for (&value, &output) in values.iter().zip(outputs) {
            self.expect(value, output);
        }
    }

    fn check_return_count(&mut self, stmt: NodeId, produced: usize, expected: usize) -> bool {
        let (kind, message) = match produced.cmp(&expected) {
            Ordering::Equal => return true,
            Ordering::Less => (ProblemKind::NotEnoughArguments, "not enough return values"),
            Ordering::Greater => (ProblemKind::TooManyArguments, "too many return values"),
        };
        self.emit(problem!(kind, self.span(stmt), "{message}"));
        false
    }

    pub(super) fn check_range(&mut self, range: RangeStmt) {
        let targets: Vec<NodeId> = [range.key, range.value].into_iter().flatten().collect();
        let types = self.range_types(range.expr);

        if let (Some(types), Some(&first)) = (&types, targets.first()) {
            if targets.len() > types.len() {
                let span = self.span(first).join(self.span(range.expr));
                let diagnostic = problem!(
                    ProblemKind::AssignmentCountMismatch,
                    span,
                    "Assignment count mismatch: {} element(s) assigned to {} element(s)",
                    types.len(),
                    targets.len()
                );
                self.emit(diagnostic);
            }
        }

        if !range.define {
            let nodes = self.nodes();
            for (i, &target) in targets.iter().enumerate() {
                if let Node::Name(name) = nodes.kind(target) {
                    if name.is_blank() {
                        continue;
                    }
                }
                let target_type = self.value(target);
                if let Some(&value) = types.as_ref().and_then(|types| types.get(i)) {
                    self.check_range_target(target, value, target_type);
                }
            }
        }

        self.check_statement(range.body);
    }

    fn check_range_target(&mut self, target: NodeId, value: Type, target_type: Type) {
        let Verdict::NotAssignable(reason) = self.session.assignable(value, target_type) else {
            return;
        };
        let diagnostic = problem!(
            reason.kind(),
            self.span(target),
            "Cannot assign {} to {} (type {}) in range",
            self.session.display(value),
            self.text(target),
            self.session.display(target_type),
        );
        self.emit(diagnostic);
    }

    /// Checks a call expression and returns its results.
    pub(super) fn check_call(
        &mut self,
        call: NodeId,
        callee: NodeId,
        args: NodeRange,
        spread: bool,
    ) -> Operand {
        let args = self.nodes().indirect(args);

        let operand = self.infer(callee);
        let typ = match operand {
            Operand::Type(typ) => return self.check_conversion(call, typ, args),
            Operand::Builtin(builtin) => return self.check_builtin(builtin, args, spread),
            Operand::Package | Operand::Invalid => {
                for &arg in args {
                    self.infer(arg);
                }
                return Operand::Invalid;
            }
            operand => self.single_value(callee, &operand),
        };

        let underlying = self.session.underlying(typ);
        let TypeKind::Function(func) = self.session.lookup(underlying).clone() else {
            for &arg in args {
                self.infer(arg);
            }
            return Operand::Invalid;
        };

        self.check_arguments(callee, &func, args, spread);

        match func.outputs() {
            &[output] => Operand::Value(output),
            outputs => Operand::Tuple(outputs.iter().copied().collect()),
        }
    }

    fn check_conversion(&mut self, call: NodeId, typ: Type, args: &[NodeId]) -> Operand {
        let problem = match args {
            [] => Some("Missing argument"),
            [_] => None,
            [..] => Some("Too many arguments"),
        };

        if let Some(problem) = problem {
            let diagnostic = problem!(
                ProblemKind::ConversionArity,
                self.span(call),
                "{problem} to conversion to {}: {}.",
                self.session.display(typ),
                self.text(call),
            );
            self.emit(diagnostic);
            for &arg in args {
                self.infer(arg);
            }
            return Operand::Value(typ);
        }

        let arg = args[0];
        let value = self.value(arg);
        if !self.session.convertible(value, typ) {
            let diagnostic = problem!(
                ProblemKind::TypeMismatch,
                self.span(arg),
                "Cannot convert {} (type {}) to type {}",
                self.text(arg),
                self.session.display(value),
                self.session.display(typ),
            );
            self.emit(diagnostic);
        }

        Operand::Value(typ)
    }

    fn check_arguments(
        &mut self,
        callee: NodeId,
        func: &FunctionType,
        args: &[NodeId],
        spread: bool,
    ) {
        if spread && !func.is_variadic() {
            let diagnostic = problem!(
                ProblemKind::TypeMismatch,
                self.span(callee),
                "cannot use ... in call to non-variadic {}",
                self.text(callee)
            );
            self.emit(diagnostic);
            for &arg in args {
                self.infer(arg);
            }
            return;
        }

        // `f(g())` where `g` does not return exactly one value
        if let (&[arg], false) = (args, spread) {
            let operand = self.infer(arg);
            if let Operand::Tuple(types) = &operand {
                if types.len() != 1 {
                    if types.is_empty() {
                        self.single_value(arg, &operand);
                    }
                    if self.check_argument_count(callee, func, types.len()) {
                        for (i, &typ) in types.iter().enumerate() {
                            let parameter = self.parameter_type(func, i, false);
                            self.check_assignable(arg, typ, parameter);
                        }
                    }
                    return;
                }
            }

            let counted = self.check_argument_count(callee, func, 1);
            let typ = self.single_value(arg, &operand);
            if counted {
                let parameter = self.parameter_type(func, 0, false);
                self.check_assignable(arg, typ, parameter);
            }
            return;
        }

        let counted = self.check_argument_count(callee, func, args.len());

        for (i, &arg) in args.iter().enumerate() {
            let operand = self.infer(arg);
            if !counted && matches!(&operand, Operand::Tuple(types) if types.len() > 1) {
                continue;
            }
            let typ = self.single_value(arg, &operand);
            if counted {
                let is_spread = spread && i + 1 == args.len();
                let parameter = self.parameter_type(func, i, is_spread);
                self.check_assignable(arg, typ, parameter);
            }
        }
    }

    /// Reports calls with the wrong number of arguments. Returns `true` if the count is valid.
    fn check_argument_count(&mut self, callee: NodeId, func: &FunctionType, count: usize) -> bool {
        let message = if count < func.required_inputs().len() {
            (ProblemKind::NotEnoughArguments, "not enough")
        } else if !func.is_variadic() && count > func.inputs().len() {
            (ProblemKind::TooManyArguments, "too many")
        } else {
            return true;
        };

        let (kind, amount) = message;
        let diagnostic = problem!(
            kind,
            self.span(callee),
            "{amount} arguments in call to {}",
            self.text(callee)
        );
        self.emit(diagnostic);
        false
    }

    /// The type expected for the argument at `index`.
    fn parameter_type(&mut self, func: &FunctionType, index: usize, spread: bool) -> Type {
        let inputs = func.inputs();
        if func.is_variadic() && index + 1 >= inputs.len() {
            let last = inputs[inputs.len() - 1];
            if spread && index + 1 == inputs.len() {
                return last;
            }
            return match *self.session.lookup(last) {
                TypeKind::Slice(elem) => elem,
                _ => Type::INVALID,
            };
        }
        inputs.get(index).copied().unwrap_or(Type::INVALID)
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
    fn several_targets_with_one_call() {
        let source = "package p
            func three() (int, int, int) { return 1, 2, 3 }
            func f() {
                var c, d = three()
                x, y := three()
                var e, g = func() (int, int) { return 1, 1 }()
                var h, i = func() (int, int) { return 1, 1 }, 1, 2
                _, _, _, _, _, _, _, _ = c, d, x, y, e, g, h, i
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Assignment count mismatch: 3 element(s) assigned to 2 element(s)",
                "Assignment count mismatch: 3 element(s) assigned to 2 element(s)",
                "Assignment count mismatch: 3 element(s) assigned to 2 element(s)",
            ]
        );
    }

    #[test]
    fn multiple_values_in_pairs() {
        let source = "package p
            func f() {
                var e, f = func() (int, int) { return 1, 1 }(), 1
                _, _ = e, f
            }
        ";
        assert_eq!(
            messages(source),
            ["Multiple-value func() (int, int) in single-value context"]
        );
    }

    #[test]
    fn argument_counts() {
        let source = "package p
            func pair() (int, int) { return 2, 3 }
            func three(int, int, int) {}
            func one(_ int) {}
            func none() {}
            func two(a, b int) {}
            func f() {
                three(1, pair())
                one(none())
                two(pair())
                two(1, 2, 3)
                one()
            }
        ";
        assert_eq!(
            messages(source),
            [
                "not enough arguments in call to three",
                "not enough arguments in call to one",
                "none() doesn't return a value",
                "too many arguments in call to two",
                "not enough arguments in call to one",
            ]
        );
    }

    #[test]
    fn declared_function_types_are_callable() {
        let source = "package p
            type b func(intParam int)
            type a b
            func c(x interface{}) {
                if f, ok := x.(a); ok {
                    f()
                }
            }
        ";
        assert_eq!(messages(source), ["not enough arguments in call to f"]);
    }

    #[test]
    fn variadic_arguments() {
        let source = "package p
            type Strings []string
            func join(sep string, parts ...string) string { return sep }
            func f(s []string, named Strings, n []int) {
                join(\",\")
                join(\",\", \"a\", \"b\")
                join(\",\", s...)
                join(\",\", named...)
                join(\",\", n...)
                join(\",\", \"a\", 1)
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Cannot use n (type []int) as type []string",
                "Cannot use 1 (type untyped int) as type string",
            ]
        );
    }

    #[test]
    fn spread_requires_variadic_function() {
        let source = "package p
            func f(a int, b []int) {}
            func g(s []int) {
                f(1, s)
                f(1, s...)
            }
        ";
        assert_eq!(
            messages(source),
            ["cannot use ... in call to non-variadic f"]
        );
    }

    #[test]
    fn return_counts() {
        let source = "package p
            func pair() (int, string) { return 1, \"\" }
            func a() (int, string) { return pair() }
            func b() (int, string) { return 1 }
            func c() int { return 1, 2 }
            func d() (x int, err error) { return }
            func e() (string, int) { return pair() }
        ";
        assert_eq!(
            messages(source),
            [
                "not enough return values",
                "too many return values",
                "Cannot use pair() (type int) as type string",
                "Cannot use pair() (type string) as type int",
            ]
        );
    }

    #[test]
    fn range_with_too_many_targets() {
        let source = "package p
            func f(c chan int) {
                for a, b := range c {
                    _, _ = a, b
                }
            }
        ";
        assert_eq!(
            messages(source),
            ["Assignment count mismatch: 1 element(s) assigned to 2 element(s)"]
        );
    }

    #[test]
    fn range_assigns_to_existing_variables() {
        let source = "package p
            func f(xs []int, m map[string]int) {
                var s, i string
                for i, s = range xs {
                }
                var k string
                var n int
                for k, n = range m {
                }
                for _, n = range xs {
                }
                _, _, _, _ = s, i, k, n
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Cannot assign int to i (type string) in range",
                "Cannot assign int to s (type string) in range",
            ]
        );
    }

    #[test]
    fn conversions() {
        let source = "package p
            type T int
            func f(s string) {
                _ = T()
                _ = T(1, 2)
                _ = T(s)
                _ = []byte(s)
                _ = float64(T(2))
            }
        ";
        assert_eq!(
            messages(source),
            [
                "Missing argument to conversion to T: T().",
                "Too many arguments to conversion to T: T(1, 2).",
                "Cannot convert s (type string) to type T",
            ]
        );
    }
}
