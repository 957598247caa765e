#[macro_use]
mod exported {
    macro_rules! problem {
        ($kind:expr, $span:expr, $($fmt:tt)*) => {
            $crate::Diagnostic::new($kind, $span, format!($($fmt)*))
        };
    }

    macro_rules! syntax_error {
        ($span:expr, $($fmt:tt)*) => {
            $crate::Diagnostic::new(
                $crate::diagnostic::ProblemKind::Syntax,
                $span,
                format!($($fmt)*),
            )
        };
    }
}
