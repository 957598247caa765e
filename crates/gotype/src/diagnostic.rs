#[macro_use]
mod macros;

use std::fmt::Write;

use crate::span::FileRange;

pub type Result<T, E = Diagnostic> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    WeakWarning,
}

impl Severity {
    fn style(self) -> Style {
        match self {
            Severity::Error => Style::Red,
            Severity::Warning => Style::Yellow,
            Severity::WeakWarning => Style::Cyan,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::WeakWarning => "weak warning",
        }
    }
}

/// Every kind of problem the checker knows how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    Syntax,

    TypeMismatch,
    NilToNonNilable,
    InterfaceNotSatisfied,

    MultipleValueInSingleValueContext,
    VoidUsedAsValue,
    AssignmentCountMismatch,
    NotEnoughArguments,
    TooManyArguments,
    ConversionArity,

    OperatorTypeMismatch,

    ReceiverAssignment,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 12] = [
        ProblemKind::Syntax,
        ProblemKind::TypeMismatch,
        ProblemKind::NilToNonNilable,
        ProblemKind::InterfaceNotSatisfied,
        ProblemKind::MultipleValueInSingleValueContext,
        ProblemKind::VoidUsedAsValue,
        ProblemKind::AssignmentCountMismatch,
        ProblemKind::NotEnoughArguments,
        ProblemKind::TooManyArguments,
        ProblemKind::ConversionArity,
        ProblemKind::OperatorTypeMismatch,
        ProblemKind::ReceiverAssignment,
    ];

    pub fn default_severity(self) -> Severity {
        match self {
            ProblemKind::ReceiverAssignment => Severity::WeakWarning,
            _ => Severity::Error,
        }
    }

    /// Problems about the compatibility of two types, as opposed to the shape of an expression.
    pub fn is_type_compatibility(self) -> bool {
        matches!(
            self,
            ProblemKind::TypeMismatch
                | ProblemKind::NilToNonNilable
                | ProblemKind::InterfaceNotSatisfied
                | ProblemKind::OperatorTypeMismatch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub span: FileRange,
    pub severity: Severity,
    pub kind: ProblemKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ProblemKind, span: FileRange, message: impl ToString) -> Self {
        Self {
            span,
            severity: kind.default_severity(),
            kind,
            message: message.to_string(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Ordering used when presenting diagnostics: by position, enclosing spans first.
    pub fn sort_key(&self) -> (u32, std::cmp::Reverse<u32>, &str) {
        (self.span.start, std::cmp::Reverse(self.span.end), &self.message)
    }
}

/// A source file together with the information needed to point into it.
pub struct SourceFile<'a> {
    display_path: &'a str,
    text: &'a str,
    line_starts: Vec<u32>,
}

impl<'a> SourceFile<'a> {
    pub fn new(display_path: &'a str, text: &'a str) -> Self {
        Self {
            display_path,
            text,
            line_starts: crate::util::line_starts(text),
        }
    }

    /// Given a byte offset into the file, returns the index of the line containing it.
    fn line_index(&self, offset: u32) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            // the first line always starts at offset 0, so this is never 0
            Err(index) => index - 1,
        }
    }

    /// Get the range of bytes that correspond to the given line (including the line terminator)
    fn line_range(&self, line: usize) -> std::ops::Range<usize> {
        let start = self.line_starts[line] as usize;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|index| *index as usize)
            .unwrap_or(self.text.len());
        start..end
    }
}

type FmtResult<T> = Result<T, std::fmt::Error>;

impl Diagnostic {
    pub fn write(&self, source: &SourceFile, out: &mut impl Write) -> FmtResult<()> {
        use Style::*;

        let style = self.severity.style();
        writeln!(
            out,
            "{Bold}{style}{}:{Default} {Bold}{}{Default}",
            self.severity.name(),
            self.message
        )?;

        let line = source.line_index(self.span.start);
        let line_range = source.line_range(line);
        let line_text = source.text[line_range.clone()].trim_end();

        let gutter_width = 1 + (1 + line).ilog10() as usize;
        let gutter = " ".repeat(gutter_width);

        let column = (self.span.start as usize - line_range.start).min(line_text.len());
        let underline_offset = line_text[..column]
            .chars()
            .map(|ch| match ch {
                '\t' => "\t",
                _ => " ",
            })
            .collect::<String>();

        // spans covering multiple lines are only underlined up to the end of the first line
        let first_line_end = (line_range.start + line_text.len()) as u32;
        let underline_width = self.span.end.min(first_line_end).saturating_sub(self.span.start);
        let underline = "^".repeat((underline_width as usize).max(1));

        writeln!(
            out,
            "{Bold}{Blue}{}-->{Default} {Italic}{Underline}{Dim}{}:{}{Default}",
            gutter,
            source.display_path,
            line + 1
        )?;
        writeln!(out, "{Bold}{Blue}{} |{Default}", gutter)?;
        writeln!(out, "{Bold}{Blue}{} |{Default} {}", line + 1, line_text)?;
        writeln!(
            out,
            "{Bold}{Blue}{} |{Default} {style}{}{}{Default}",
            gutter, underline_offset, underline
        )?;

        Ok(())
    }
}

#[allow(dead_code)]
enum Style {
    Default,

    Red,
    Yellow,
    Blue,
    Cyan,
    Gray,
    Green,

    Bold,
    Italic,
    Underline,
    Dim,
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Style::Default => write!(f, "\x1b[m"),
            Style::Red => write!(f, "\x1b[31m"),
            Style::Green => write!(f, "\x1b[32m"),
            Style::Yellow => write!(f, "\x1b[33m"),
            Style::Blue => write!(f, "\x1b[34m"),
            Style::Cyan => write!(f, "\x1b[36m"),
            Style::Gray => write!(f, "\x1b[37m"),
            Style::Bold => write!(f, "\x1b[1m"),
            Style::Italic => write!(f, "\x1b[3m"),
            Style::Underline => write!(f, "\x1b[4m"),
            Style::Dim => write!(f, "\x1b[2m"),
        }
    }
}
