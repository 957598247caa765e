//! Lexer for Go source text.
//!
//! The lexer works on a best-effort basis: invalid tokens are matched to the best fitting token
//! class and validation is left to the parser, which has more context for its diagnostics. The
//! only error token produced is for unterminated literals and characters that do not start any
//! token.

use crate::span::FileRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Error,

    Identifier,

    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    Plus,
    Minus,
    Times,
    Div,
    Rem,

    And,
    Or,
    Xor,
    Shl,
    Shr,
    Nand,
    LogicalNot,

    PlusAssign,
    MinusAssign,
    TimesAssign,
    DivAssign,
    RemAssign,

    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    NandAssign,

    LogicalAnd,
    LogicalOr,
    LThinArrow,
    PlusPlus,
    MinusMinus,

    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    Assign,
    Tilde,

    Define,
    Ellipses,

    LParens,
    LBracket,
    LCurly,
    RParens,
    RBracket,
    RCurly,

    Dot,
    Colon,
    Comma,
    SemiColon,

    Integer,
    Float,
    Imaginary,
    Rune,
    String,
    RawString,
}

impl Token {
    /// A human readable name of the token, used in diagnostics.
    pub fn display(self) -> &'static str {
        match self {
            Token::Error => "invalid token",
            Token::Identifier => "identifier",
            Token::Break => "break",
            Token::Case => "case",
            Token::Chan => "chan",
            Token::Const => "const",
            Token::Continue => "continue",
            Token::Default => "default",
            Token::Defer => "defer",
            Token::Else => "else",
            Token::Fallthrough => "fallthrough",
            Token::For => "for",
            Token::Func => "func",
            Token::Go => "go",
            Token::Goto => "goto",
            Token::If => "if",
            Token::Import => "import",
            Token::Interface => "interface",
            Token::Map => "map",
            Token::Package => "package",
            Token::Range => "range",
            Token::Return => "return",
            Token::Select => "select",
            Token::Struct => "struct",
            Token::Switch => "switch",
            Token::Type => "type",
            Token::Var => "var",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Times => "*",
            Token::Div => "/",
            Token::Rem => "%",
            Token::And => "&",
            Token::Or => "|",
            Token::Xor => "^",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Nand => "&^",
            Token::LogicalNot => "!",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::TimesAssign => "*=",
            Token::DivAssign => "/=",
            Token::RemAssign => "%=",
            Token::AndAssign => "&=",
            Token::OrAssign => "|=",
            Token::XorAssign => "^=",
            Token::ShlAssign => "<<=",
            Token::ShrAssign => ">>=",
            Token::NandAssign => "&^=",
            Token::LogicalAnd => "&&",
            Token::LogicalOr => "||",
            Token::LThinArrow => "<-",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::Less => "<",
            Token::Greater => ">",
            Token::LessEqual => "<=",
            Token::GreaterEqual => ">=",
            Token::Assign => "=",
            Token::Tilde => "~",
            Token::Define => ":=",
            Token::Ellipses => "...",
            Token::LParens => "(",
            Token::LBracket => "[",
            Token::LCurly => "{",
            Token::RParens => ")",
            Token::RBracket => "]",
            Token::RCurly => "}",
            Token::Dot => ".",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::SemiColon => ";",
            Token::Integer => "integer",
            Token::Float => "float",
            Token::Imaginary => "imaginary number",
            Token::Rune => "rune",
            Token::String | Token::RawString => "string",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub range: FileRange,
}

impl SpannedToken {
    fn new(token: Token, offset: usize, length: usize) -> Self {
        Self {
            token,
            range: FileRange::from(offset..offset + length),
        }
    }

    /// Semicolons inserted by the lexer are empty.
    pub fn is_implicit(&self) -> bool {
        self.token == Token::SemiColon && self.range.is_empty()
    }
}

pub fn tokenize(text: &str) -> Vec<SpannedToken> {
    assert!(text.len() < u32::MAX as usize);

    let mut tokens = Vec::with_capacity(text.len() / 4);

    let bytes = text.as_bytes();
    let mut offset = 0;

    loop {
        let whitespace = strip_whitespace(&bytes[offset..]);

        if whitespace.newline && needs_semicolon(tokens.last()) {
            tokens.push(SpannedToken::new(Token::SemiColon, offset, 0));
        }

        if whitespace.unterminated {
            tokens.push(SpannedToken::new(Token::Error, offset, whitespace.len));
            break;
        }

        offset += whitespace.len;
        if offset == bytes.len() {
            if needs_semicolon(tokens.last()) {
                tokens.push(SpannedToken::new(Token::SemiColon, offset, 0));
            }
            break;
        }

        let (token, length) = strip_token(&text[offset..]);
        tokens.push(SpannedToken::new(token, offset, length));
        offset += length;
    }

    tokens
}

/// Go inserts a semicolon after a line's final token if it is one of these.
fn needs_semicolon(last: Option<&SpannedToken>) -> bool {
    matches!(
        last.map(|t| t.token),
        Some(
            Token::Identifier
                | Token::Integer
                | Token::Float
                | Token::Imaginary
                | Token::Rune
                | Token::String
                | Token::RawString
                | Token::Break
                | Token::Continue
                | Token::Fallthrough
                | Token::Return
                | Token::PlusPlus
                | Token::MinusMinus
                | Token::RParens
                | Token::RBracket
                | Token::RCurly
        )
    )
}

struct Whitespace {
    len: usize,
    newline: bool,
    unterminated: bool,
}

fn strip_whitespace(bytes: &[u8]) -> Whitespace {
    let mut len = 0;
    let mut newline = false;

    while len < bytes.len() {
        let first = bytes[len];
        if matches!(first, b' ' | b'\t' | b'\n' | b'\r') {
            newline |= first == b'\n';
            len += 1;
            continue;
        }

        match (first, byte(bytes, len + 1)) {
            (b'/', b'/') => {
                while len < bytes.len() && bytes[len] != b'\n' {
                    len += 1;
                }
            }
            (b'/', b'*') => {
                let Some(end) = find(&bytes[len + 2..], b"*/") else {
                    return Whitespace {
                        len: bytes.len(),
                        newline,
                        unterminated: true,
                    };
                };
                // a general comment containing newlines acts like a newline
                newline |= bytes[len + 2..len + 2 + end].contains(&b'\n');
                len += end + 4;
            }
            _ => break,
        }
    }

    Whitespace {
        len,
        newline,
        unterminated: false,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn byte(bytes: &[u8], index: usize) -> u8 {
    bytes.get(index).copied().unwrap_or(0)
}

fn strip_token(text: &str) -> (Token, usize) {
    let bytes = text.as_bytes();
    let second = byte(bytes, 1);
    let third = byte(bytes, 2);

    let (token, len) = match bytes[0] {
        b'(' => (Token::LParens, 1),
        b')' => (Token::RParens, 1),
        b'{' => (Token::LCurly, 1),
        b'}' => (Token::RCurly, 1),
        b'[' => (Token::LBracket, 1),
        b']' => (Token::RBracket, 1),
        b',' => (Token::Comma, 1),
        b';' => (Token::SemiColon, 1),
        b'~' => (Token::Tilde, 1),

        b'.' => match (second, third) {
            (b'0'..=b'9', _) => strip_number(text),
            (b'.', b'.') => (Token::Ellipses, 3),
            _ => (Token::Dot, 1),
        },
        b':' if second == b'=' => (Token::Define, 2),
        b':' => (Token::Colon, 1),

        b'+' => match second {
            b'+' => (Token::PlusPlus, 2),
            b'=' => (Token::PlusAssign, 2),
            _ => (Token::Plus, 1),
        },
        b'-' => match second {
            b'-' => (Token::MinusMinus, 2),
            b'=' => (Token::MinusAssign, 2),
            _ => (Token::Minus, 1),
        },
        b'*' if second == b'=' => (Token::TimesAssign, 2),
        b'*' => (Token::Times, 1),
        b'/' if second == b'=' => (Token::DivAssign, 2),
        b'/' => (Token::Div, 1),
        b'%' if second == b'=' => (Token::RemAssign, 2),
        b'%' => (Token::Rem, 1),
        b'=' if second == b'=' => (Token::Equal, 2),
        b'=' => (Token::Assign, 1),
        b'!' if second == b'=' => (Token::NotEqual, 2),
        b'!' => (Token::LogicalNot, 1),
        b'^' if second == b'=' => (Token::XorAssign, 2),
        b'^' => (Token::Xor, 1),

        b'<' => match (second, third) {
            (b'<', b'=') => (Token::ShlAssign, 3),
            (b'<', _) => (Token::Shl, 2),
            (b'=', _) => (Token::LessEqual, 2),
            (b'-', _) => (Token::LThinArrow, 2),
            _ => (Token::Less, 1),
        },
        b'>' => match (second, third) {
            (b'>', b'=') => (Token::ShrAssign, 3),
            (b'>', _) => (Token::Shr, 2),
            (b'=', _) => (Token::GreaterEqual, 2),
            _ => (Token::Greater, 1),
        },
        b'&' => match (second, third) {
            (b'^', b'=') => (Token::NandAssign, 3),
            (b'^', _) => (Token::Nand, 2),
            (b'&', _) => (Token::LogicalAnd, 2),
            (b'=', _) => (Token::AndAssign, 2),
            _ => (Token::And, 1),
        },
        b'|' => match second {
            b'|' => (Token::LogicalOr, 2),
            b'=' => (Token::OrAssign, 2),
            _ => (Token::Or, 1),
        },

        b'0'..=b'9' => strip_number(text),
        b'\'' => strip_quoted(text, b'\'', Token::Rune),
        b'"' => strip_quoted(text, b'"', Token::String),
        b'`' => match find(&bytes[1..], b"`") {
            Some(end) => (Token::RawString, end + 2),
            None => (Token::Error, text.len()),
        },

        _ => strip_word(text),
    };

    (token, len)
}

fn strip_word(text: &str) -> (Token, usize) {
    let len = text
        .char_indices()
        .find(|&(_, ch)| !(ch.is_alphanumeric() || ch == '_'))
        .map(|(index, _)| index)
        .unwrap_or(text.len());

    if len == 0 {
        // did not match any token class: skip the offending character
        let width = text.chars().next().map(char::len_utf8).unwrap_or(1);
        return (Token::Error, width);
    }

    let word = &text[..len];
    (keyword(word).unwrap_or(Token::Identifier), len)
}

fn keyword(identifier: &str) -> Option<Token> {
    let token = match identifier {
        "break" => Token::Break,
        "case" => Token::Case,
        "chan" => Token::Chan,
        "const" => Token::Const,
        "continue" => Token::Continue,
        "default" => Token::Default,
        "defer" => Token::Defer,
        "else" => Token::Else,
        "fallthrough" => Token::Fallthrough,
        "for" => Token::For,
        "func" => Token::Func,
        "go" => Token::Go,
        "goto" => Token::Goto,
        "if" => Token::If,
        "import" => Token::Import,
        "interface" => Token::Interface,
        "map" => Token::Map,
        "package" => Token::Package,
        "range" => Token::Range,
        "return" => Token::Return,
        "select" => Token::Select,
        "struct" => Token::Struct,
        "switch" => Token::Switch,
        "type" => Token::Type,
        "var" => Token::Var,
        _ => return None,
    };
    Some(token)
}

fn strip_number(text: &str) -> (Token, usize) {
    let bytes = text.as_bytes();
    let hex = bytes[0] == b'0' && matches!(byte(bytes, 1), b'x' | b'X');

    let mut float = false;
    let mut len = 0;
    while len < bytes.len() {
        let ch = bytes[len];
        if !(ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'.') {
            break;
        }
        len += 1;

        let exponent = matches!(ch, b'e' | b'E') && !hex || matches!(ch, b'p' | b'P');
        float |= exponent || ch == b'.';

        // `+` and `-` are allowed after an exponent
        if exponent && matches!(byte(bytes, len), b'+' | b'-') {
            len += 1;
        }
    }

    let token = if bytes[len - 1] == b'i' {
        Token::Imaginary
    } else if float {
        Token::Float
    } else {
        Token::Integer
    };
    (token, len)
}

fn strip_quoted(text: &str, quote: u8, token: Token) -> (Token, usize) {
    let bytes = text.as_bytes();
    let mut len = 1;
    while len < bytes.len() {
        match bytes[len] {
            b'\n' => break,
            b'\\' => len += 2,
            ch if ch == quote => return (token, len + 1),
            _ => len += 1,
        }
    }
    (Token::Error, len.min(bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> Vec<(Token, &str)> {
        tokenize(text)
            .into_iter()
            .map(|token| (token.token, &text[token.range.slice_range()]))
            .collect()
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            tokens("a _x9 αβ func chan range"),
            [
                (Token::Identifier, "a"),
                (Token::Identifier, "_x9"),
                (Token::Identifier, "αβ"),
                (Token::Func, "func"),
                (Token::Chan, "chan"),
                (Token::Range, "range"),
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            tokens("a &^= b <<= c <- d := e... &^ f"),
            [
                (Token::Identifier, "a"),
                (Token::NandAssign, "&^="),
                (Token::Identifier, "b"),
                (Token::ShlAssign, "<<="),
                (Token::Identifier, "c"),
                (Token::LThinArrow, "<-"),
                (Token::Identifier, "d"),
                (Token::Define, ":="),
                (Token::Identifier, "e"),
                (Token::Ellipses, "..."),
                (Token::Nand, "&^"),
                (Token::Identifier, "f"),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("42 0x1F 1.0 .25 1e6 6.67e-11 2.0i 0x1p-2 x.f"),
            [
                (Token::Integer, "42"),
                (Token::Integer, "0x1F"),
                (Token::Float, "1.0"),
                (Token::Float, ".25"),
                (Token::Float, "1e6"),
                (Token::Float, "6.67e-11"),
                (Token::Imaginary, "2.0i"),
                (Token::Float, "0x1p-2"),
                (Token::Identifier, "x"),
                (Token::Dot, "."),
                (Token::Identifier, "f"),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            tokens(r#"'a' '\'' "s\"q" `raw "text"`"#),
            [
                (Token::Rune, "'a'"),
                (Token::Rune, r"'\''"),
                (Token::String, r#""s\"q""#),
                (Token::RawString, r#"`raw "text"`"#),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn semicolon_insertion() {
        assert_eq!(
            tokens("x := f()\nreturn\n}\nfunc() {\n  a++ // done\n}"),
            [
                (Token::Identifier, "x"),
                (Token::Define, ":="),
                (Token::Identifier, "f"),
                (Token::LParens, "("),
                (Token::RParens, ")"),
                (Token::SemiColon, ""),
                (Token::Return, "return"),
                (Token::SemiColon, ""),
                (Token::RCurly, "}"),
                (Token::SemiColon, ""),
                (Token::Func, "func"),
                (Token::LParens, "("),
                (Token::RParens, ")"),
                (Token::LCurly, "{"),
                (Token::Identifier, "a"),
                (Token::PlusPlus, "++"),
                (Token::SemiColon, ""),
                (Token::RCurly, "}"),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operator() {
        assert_eq!(
            tokens("a +\n b"),
            [
                (Token::Identifier, "a"),
                (Token::Plus, "+"),
                (Token::Identifier, "b"),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn multiline_comment_acts_as_newline() {
        assert_eq!(
            tokens("a /* \n */ b /* c */ d"),
            [
                (Token::Identifier, "a"),
                (Token::SemiColon, ""),
                (Token::Identifier, "b"),
                (Token::Identifier, "d"),
                (Token::SemiColon, ""),
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            tokens("\"abc\nx"),
            [
                (Token::Error, "\"abc"),
                (Token::Identifier, "x"),
                (Token::SemiColon, ""),
            ]
        );
    }
}
