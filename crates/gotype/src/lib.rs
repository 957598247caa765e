#![allow(clippy::manual_is_ascii_check)]
#![allow(clippy::useless_format)]
#![allow(clippy::uninlined_format_args)]

#[macro_use]
pub mod diagnostic;

mod common;
pub mod config;
mod index_map;
mod key;
mod lint;
mod naming;
pub mod span;
pub mod syntax;
mod token;
mod typing;
mod util;

#[cfg(test)]
mod fixture;

pub use config::{Config, Profile};
pub use diagnostic::{Diagnostic, Result};

pub type HashMap<K, V> = std::collections::HashMap<K, V, fxhash::FxBuildHasher>;
pub type HashSet<T> = std::collections::HashSet<T, fxhash::FxBuildHasher>;

/// Parses and checks a single source file.
///
/// Fails only if the file could not be parsed.
pub fn check_source(source: &str, config: &Config) -> Result<Vec<Diagnostic>> {
    let file = syntax::parse(source)?;
    Ok(check_file(&file, config))
}

/// Checks an already parsed file, returning the problems found ordered by their position.
pub fn check_file(file: &syntax::File, config: &Config) -> Vec<Diagnostic> {
    let resolution = naming::resolve(file);
    let mut session = typing::Session::new(file, &resolution);

    let mut diagnostics = typing::check(&mut session);
    if config.receiver_lint {
        diagnostics.extend(lint::receiver_assignments(&mut session));
    }

    for diagnostic in diagnostics.iter_mut() {
        diagnostic.severity = config.severity(diagnostic.kind);
    }

    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    diagnostics.dedup();
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::diagnostic::{ProblemKind, Severity};

    const SOURCE: &str = "package p
        type T struct{}
        func (t T) set() { t = T{} }
        func pair() (int, int) { return 1, 2 }
        func _() {
            var s string = 1
            x := pair()
            _ = x
        }
    ";

    fn summary(diagnostics: &[Diagnostic]) -> Vec<(ProblemKind, Severity)> {
        diagnostics
            .iter()
            .map(|diagnostic| (diagnostic.kind, diagnostic.severity))
            .collect()
    }

    #[test]
    fn profiles_choose_severities() {
        let lenient = check_source(SOURCE, &Config::default()).unwrap();
        assert_eq!(
            summary(&lenient),
            [
                (ProblemKind::ReceiverAssignment, Severity::WeakWarning),
                (ProblemKind::TypeMismatch, Severity::Warning),
                (ProblemKind::AssignmentCountMismatch, Severity::Error),
                (ProblemKind::MultipleValueInSingleValueContext, Severity::Error),
            ]
        );

        let strict = check_source(SOURCE, &Config::with_profile(Profile::Strict)).unwrap();
        assert_eq!(strict[1].severity, Severity::Error);
    }

    #[test]
    fn receiver_lint_can_be_disabled() {
        let config = Config {
            receiver_lint: false,
            ..Config::default()
        };
        let diagnostics = check_source(SOURCE, &config).unwrap();
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.kind != ProblemKind::ReceiverAssignment));
    }

    #[test]
    fn checking_is_idempotent() {
        let config = Config::default();
        assert_eq!(
            check_source(SOURCE, &config).unwrap(),
            check_source(SOURCE, &config).unwrap()
        );
    }

    #[test]
    fn syntax_errors_are_returned() {
        let error = check_source("package p\nfunc (", &Config::default()).unwrap_err();
        assert_eq!(error.kind, ProblemKind::Syntax);
    }
}
