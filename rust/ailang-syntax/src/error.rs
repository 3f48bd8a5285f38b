use ailang_core::Span;
use thiserror::Error;

/// Lexical errors. The lexer recovers from all of these and keeps scanning,
/// so callers typically see a `Vec<LexError>` rather than the first one.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    #[error("{span}: unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("{span}: invalid escape sequence '\\{ch}'")]
    InvalidEscape { span: Span, ch: char },
    #[error("{span}: invalid unicode escape")]
    InvalidUnicodeEscape { span: Span },
    #[error("{span}: invalid numeric literal '{text}'")]
    InvalidNumber { span: Span, text: String },
    #[error("{span}: unterminated character literal")]
    UnterminatedChar { span: Span },
    #[error("{span}: unexpected character '{ch}'")]
    UnexpectedChar { span: Span, ch: char },
    #[error("source begins with a byte-order mark, which is rejected")]
    BomRejected,
}

impl LexError {
    pub fn code(&self) -> &'static str {
        match self {
            LexError::UnterminatedString { .. } => "LEX_STR_UNTERMINATED",
            LexError::InvalidEscape { .. } => "LEX_STR_BAD_ESCAPE",
            LexError::InvalidUnicodeEscape { .. } => "LEX_STR_BAD_UNICODE",
            LexError::InvalidNumber { .. } => "LEX_NUM_INVALID",
            LexError::UnterminatedChar { .. } => "LEX_CHAR_UNTERMINATED",
            LexError::UnexpectedChar { .. } => "LEX_UNEXPECTED_CHAR",
            LexError::BomRejected => "LEX_BOM_REJECTED",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedString { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidUnicodeEscape { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::UnterminatedChar { span }
            | LexError::UnexpectedChar { span, .. } => *span,
            LexError::BomRejected => Span::dummy(),
        }
    }
}

/// Parse errors. The parser recovers by skipping to the next plausible
/// boundary, so a single parse can surface many of these.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{span}: unexpected token {found}, expected {expected}")]
    UnexpectedToken {
        span: Span,
        found: String,
        expected: String,
    },
    #[error("{span}: unexpected end of input, expected {expected}")]
    UnexpectedEof { span: Span, expected: String },
    #[error("{span}: duplicate effect label '{label}' in effect annotation")]
    DuplicateEffect { span: Span, label: String },
    #[error("{span}: unknown effect label '{label}', did you mean '{suggestion}'?")]
    UnknownEffect {
        span: Span,
        label: String,
        suggestion: String,
    },
    #[error("{span}: spread pattern must bind an identifier")]
    SpreadNeedsIdent { span: Span },
    #[error("{span}: namespace imports are not supported; use a selective import list")]
    UnsupportedNamespaceImport { span: Span },
    #[error("internal parser error: {message}")]
    InternalPanic { message: String },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "PAR_UNEXPECTED_TOKEN",
            ParseError::UnexpectedEof { .. } => "PAR_UNEXPECTED_EOF",
            ParseError::DuplicateEffect { .. } => "PAR_EFF001_DUP",
            ParseError::UnknownEffect { .. } => "PAR_EFF002_UNKNOWN",
            ParseError::SpreadNeedsIdent { .. } => "PAT_SPREAD_NEEDS_IDENT",
            ParseError::UnsupportedNamespaceImport { .. } => "IMP012_UNSUPPORTED_NAMESPACE",
            ParseError::InternalPanic { .. } => "PAR999",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::DuplicateEffect { span, .. }
            | ParseError::UnknownEffect { span, .. }
            | ParseError::SpreadNeedsIdent { span }
            | ParseError::UnsupportedNamespaceImport { span } => *span,
            ParseError::InternalPanic { .. } => Span::dummy(),
        }
    }
}

/// `(code, one-line doc)` for every stable code this crate can emit. Kept in
/// sync with the `code()` match arms above by a coverage test.
pub fn all_codes() -> Vec<(&'static str, &'static str)> {
    vec![
        ("LEX_STR_UNTERMINATED", "A string literal was not closed before end of line or input."),
        ("LEX_STR_BAD_ESCAPE", "A backslash escape in a string or char literal is not one of \\n \\t \\r \\\\ \\\" \\b \\f \\uXXXX."),
        ("LEX_STR_BAD_UNICODE", "A \\uXXXX escape did not contain four hex digits."),
        ("LEX_NUM_INVALID", "A numeric literal is not in a recognized integer or float form."),
        ("LEX_CHAR_UNTERMINATED", "A character literal was not closed with a matching quote."),
        ("LEX_UNEXPECTED_CHAR", "A character does not begin any recognized token."),
        ("LEX_BOM_REJECTED", "Source input begins with a byte-order mark; remove it and re-encode as plain UTF-8."),
        ("PAR_UNEXPECTED_TOKEN", "A token appeared where the grammar required a different kind of token."),
        ("PAR_UNEXPECTED_EOF", "Input ended before a construct was closed."),
        ("PAR_EFF001_DUP", "The same effect label was written more than once in one effect annotation."),
        ("PAR_EFF002_UNKNOWN", "An effect label outside the closed set {IO, FS, Net, Clock, Rand, DB, Trace, Async} was used."),
        ("PAT_SPREAD_NEEDS_IDENT", "A list pattern spread ('...') must bind an identifier naming the tail."),
        ("IMP012_UNSUPPORTED_NAMESPACE", "Only selective imports ('import a/b (name, ...)') are supported."),
        ("PAR999", "The parser encountered an internal error (a bug); please file a report."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_lex_error_variant_has_a_code_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            LexError::UnterminatedString { span: Span::dummy() },
            LexError::InvalidEscape { span: Span::dummy(), ch: 'q' },
            LexError::InvalidUnicodeEscape { span: Span::dummy() },
            LexError::InvalidNumber { span: Span::dummy(), text: "1x".into() },
            LexError::UnterminatedChar { span: Span::dummy() },
            LexError::UnexpectedChar { span: Span::dummy(), ch: '$' },
            LexError::BomRejected,
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }

    #[test]
    fn every_parse_error_variant_has_a_code_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            ParseError::UnexpectedToken {
                span: Span::dummy(),
                found: "x".into(),
                expected: "y".into(),
            },
            ParseError::UnexpectedEof {
                span: Span::dummy(),
                expected: "y".into(),
            },
            ParseError::DuplicateEffect {
                span: Span::dummy(),
                label: "IO".into(),
            },
            ParseError::UnknownEffect {
                span: Span::dummy(),
                label: "Foo".into(),
                suggestion: "IO".into(),
            },
            ParseError::SpreadNeedsIdent { span: Span::dummy() },
            ParseError::UnsupportedNamespaceImport { span: Span::dummy() },
            ParseError::InternalPanic {
                message: "boom".into(),
            },
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }
}
