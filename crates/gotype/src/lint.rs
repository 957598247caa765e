//! Lints which look for suspicious but valid code.

use crate::{
    diagnostic::ProblemKind,
    naming::BindingKind,
    syntax::{self, Node, NodeId},
    typing::{Session, TypeKind},
    Diagnostic,
};

/// Reports assignments to the receiver of a method, which are not visible to the caller.
pub fn receiver_assignments(session: &mut Session) -> Vec<Diagnostic> {
    let file = session.file;
    let nodes = &file.nodes;

    let mut targets = Vec::new();
    for &decl in &file.declarations {
        let Node::Function(func) = nodes.kind(decl) else { continue };
        if let (Some(_), Some(body)) = (func.receiver, func.body) {
            assignment_targets(nodes, body, &mut targets);
        }
    }

    let mut diagnostics = Vec::new();
    for target in targets {
        let Some((_, binding)) = session.resolution.referenced_binding(target) else { continue };
        let BindingKind::Receiver { typ, .. } = binding.kind else { continue };

        let pointer = matches!(nodes.kind(nodes.unparen(typ)), Node::Pointer(_));
        let message = if pointer {
            "Assignment to method receiver propagates only to callees but not to callers"
        } else {
            // these share their contents with the caller anyway
            let receiver = session.resolve_type(typ);
            let underlying = session.underlying(receiver);
            let shared = matches!(
                session.lookup(underlying),
                TypeKind::Map(..) | TypeKind::Slice(_) | TypeKind::Array(..) | TypeKind::Channel(..)
            );
            if shared {
                continue;
            }
            "Assignment to method receiver doesn't propagate to other calls"
        };

        diagnostics.push(problem!(
            ProblemKind::ReceiverAssignment,
            session.span(target),
            "{message}"
        ));
    }

    tracing::debug!(count = diagnostics.len(), "receiver lint");
    diagnostics
}

/// Finds the names assigned to by `=` and `op=` anywhere within `node`.
fn assignment_targets(nodes: &syntax::NodeStorage, node: NodeId, targets: &mut Vec<NodeId>) {
    match nodes.kind(node) {
        Node::Assign(assign) => {
            for &target in nodes.indirect(assign.lhs()) {
                if let Node::Name(_) = nodes.kind(target) {
                    targets.push(target);
                }
            }
        }
        Node::AssignOp(target, _, _) => {
            if let Node::Name(_) = nodes.kind(target) {
                targets.push(target);
            }
        }
        _ => {}
    }

    nodes.for_each_child(node, |child| assignment_targets(nodes, child, targets));
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::{diagnostic::Severity, naming};

    fn lint(source: &str) -> Vec<(String, String)> {
        let file = syntax::parse(source).unwrap();
        let resolution = naming::resolve(&file);
        let mut session = Session::new(&file, &resolution);
        receiver_assignments(&mut session)
            .into_iter()
            .map(|diagnostic| {
                assert_eq!(diagnostic.severity, Severity::WeakWarning);
                let text = file.source[diagnostic.span.slice_range()].to_owned();
                (text, diagnostic.message)
            })
            .collect()
    }

    #[test]
    fn pointer_and_value_receivers() {
        let source = "package p
            type demo struct { Val int }
            func (d *demo) change() { d = nil }
            func (d demo) change2() { d = demo{} }
            func (d *demo) change3() { d.Val = 3 }
            func (d demo) change4() { func() { d = demo{} }() }
        ";
        assert_eq!(
            lint(source),
            [
                (
                    "d".to_owned(),
                    "Assignment to method receiver propagates only to callees but not to callers"
                        .to_owned()
                ),
                (
                    "d".to_owned(),
                    "Assignment to method receiver doesn't propagate to other calls".to_owned()
                ),
                (
                    "d".to_owned(),
                    "Assignment to method receiver doesn't propagate to other calls".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn reference_types_are_skipped() {
        let source = "package p
            type Flagz []string
            func (f *Flagz) Add(flag string) { *f = append(*f, flag) }
            func (f *Flagz) Clear() { f = nil }
            type Flagm map[string]string
            func (f Flagm) Add(flag string) { f = make(map[string]string) }
            type Count int
            func (c Count) Inc() { c += 1 }
        ";
        let messages: Vec<_> = lint(source).into_iter().map(|(text, _)| text).collect();
        assert_eq!(messages, ["f", "c"]);
    }
}
