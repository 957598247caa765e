//! Checks Go sources annotated with the problems expected in them.
//!
//! Problems are marked up around the offending text, as in
//! `<error descr="message">expression</error>`. The tags `warning` and `weak_warning` select the
//! other severities, and a tag without `descr` accepts any message.

use std::cmp::Reverse;

use crate::{diagnostic::Severity, span::FileRange, Config, Profile};

const TAGS: [(&str, Severity); 3] = [
    ("error", Severity::Error),
    ("warning", Severity::Warning),
    ("weak_warning", Severity::WeakWarning),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Expected {
    span: FileRange,
    severity: Severity,
    /// `None` if any message is accepted.
    message: Option<String>,
}

/// Removes the markup from the annotated source, returning the plain source and the problems
/// the markup describes.
fn strip_markup(annotated: &str) -> (String, Vec<Expected>) {
    let mut text = String::with_capacity(annotated.len());
    let mut open = Vec::new();
    let mut expected = Vec::new();
    let mut rest = annotated;

    while let Some(index) = rest.find('<') {
        text.push_str(&rest[..index]);
        rest = &rest[index..];

        if let Some((severity, message, len)) = opening_tag(rest) {
            open.push((text.len() as u32, severity, message));
            rest = &rest[len..];
        } else if let Some((severity, len)) = closing_tag(rest) {
            let (start, opened, message) = open.pop().expect("closing tag without opening tag");
            assert_eq!(opened, severity, "mismatched closing tag");
            expected.push(Expected {
                span: FileRange::new(start, text.len() as u32),
                severity,
                message,
            });
            rest = &rest[len..];
        } else {
            text.push('<');
            rest = &rest[1..];
        }
    }

    text.push_str(rest);
    assert!(open.is_empty(), "unclosed tag");
    (text, expected)
}

/// Parses `<tag>` or `<tag descr="...">`, returning the length of the tag.
fn opening_tag(text: &str) -> Option<(Severity, Option<String>, usize)> {
    let inner = text.strip_prefix('<')?;
    for (name, severity) in TAGS {
        let Some(after) = inner.strip_prefix(name) else { continue };

        if let Some(after) = after.strip_prefix('>') {
            return Some((severity, None, text.len() - after.len()));
        }

        if let Some(after) = after.strip_prefix(" descr=\"") {
            let end = after.find("\">")?;
            let message = unescape(&after[..end]);
            let len = text.len() - after.len() + end + 2;
            return Some((severity, Some(message), len));
        }
    }
    None
}

fn closing_tag(text: &str) -> Option<(Severity, usize)> {
    let inner = text.strip_prefix("</")?;
    for (name, severity) in TAGS {
        if inner.strip_prefix(name).map_or(false, |after| after.starts_with('>')) {
            return Some((severity, name.len() + 3));
        }
    }
    None
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Describes a problem on a single line, for readable test failures.
fn describe(text: &str, span: FileRange, severity: Severity, message: &str) -> String {
    let line = 1 + text[..span.start as usize].matches('\n').count();
    let snippet = &text[span.slice_range()];
    format!("{line}: {} {snippet:?}: {message}", severity.name())
}

fn check_fixture(annotated: &str, profile: Profile) {
    let (text, expected) = strip_markup(annotated);

    let config = Config::with_profile(profile);
    let diagnostics = match crate::check_source(&text, &config) {
        Ok(diagnostics) => diagnostics,
        Err(error) => panic!("could not parse fixture: {}", error.message),
    };

    let mut found: Vec<_> = diagnostics
        .iter()
        .map(|diagnostic| (diagnostic.span, diagnostic.severity, diagnostic.message.clone()))
        .collect();

    let mut wanted: Vec<_> = expected
        .into_iter()
        .map(|expected| {
            let message = expected.message.unwrap_or_else(|| {
                found
                    .iter()
                    .find(|(span, severity, _)| {
                        *span == expected.span && *severity == expected.severity
                    })
                    .map(|(_, _, message)| message.clone())
                    .unwrap_or_default()
            });
            (expected.span, expected.severity, message)
        })
        .collect();

    let key = |(span, _, message): &(FileRange, Severity, String)| {
        (span.start, Reverse(span.end), message.clone())
    };
    found.sort_by_key(key);
    wanted.sort_by_key(key);

    let render = |problems: Vec<(FileRange, Severity, String)>| -> Vec<String> {
        problems
            .into_iter()
            .map(|(span, severity, message)| describe(&text, span, severity, &message))
            .collect()
    };

    pretty_assertions::assert_eq!(render(wanted), render(found));
}

macro_rules! fixtures {
    ($($name:ident: $profile:ident,)*) => {
        $(
            #[test]
            fn $name() {
                check_fixture(
                    include_str!(concat!("../testdata/", stringify!($name), ".go")),
                    Profile::$profile,
                );
            }
        )*
    };
}

fixtures! {
    assignment_count: Strict,
    parameter_count: Strict,
    receiver: Strict,
    constants: Lenient,
    operators: Strict,
    variadic: Strict,
    interfaces: Lenient,
    range: Strict,
    methods: Strict,
    void_and_multiple_values: Strict,
    call_arity: Strict,
    embedded_methods: Strict,
    range_values: Strict,
    cgo_types: Strict,
    mismatched_binary: Lenient,
    count_resolve: Strict,
    count_channel_type: Strict,
    count_function_type: Strict,
}

#[test]
fn markup_is_stripped() {
    let (text, expected) = strip_markup(
        "x := <error descr=\"a &quot;b&quot;\">f(<weak_warning>y</weak_warning>)</error> << 2",
    );
    assert_eq!(text, "x := f(y) << 2");
    assert_eq!(
        expected,
        [
            Expected {
                span: FileRange::new(7, 8),
                severity: Severity::WeakWarning,
                message: None,
            },
            Expected {
                span: FileRange::new(5, 9),
                severity: Severity::Error,
                message: Some("a \"b\"".to_owned()),
            },
        ]
    );
}
