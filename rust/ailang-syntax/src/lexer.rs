use crate::error::LexError;
use crate::tokens::{lookup_keyword, Token, TokenKind};
use ailang_core::Span;

const BOM: char = '\u{FEFF}';

/// Tokenize `source`, returning every token (ending with `Eof`) and every
/// lexical error encountered along the way. Whitespace, line endings, and
/// `--` comments are never emitted as tokens; CR/CRLF are normalized for
/// position tracking only.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let chars: Vec<char> = source.chars().collect();
    let mut errors = Vec::new();
    if chars.first() == Some(&BOM) {
        errors.push(LexError::BomRejected);
    }

    let mut state = State {
        chars: &chars,
        pos: 0,
        byte_offset: 0,
        line: 1,
        col: 1,
    };
    let mut tokens = Vec::new();

    loop {
        state.skip_trivia();
        let (start_pos, start_line, start_col) = (state.byte_offset, state.line, state.col);
        let Some(ch) = state.current() else {
            tokens.push(Token::new(
                TokenKind::Eof,
                Span::new(start_pos, start_pos, start_line, start_col),
            ));
            break;
        };

        let kind = if ch.is_ascii_digit() {
            match state.read_number() {
                Ok(k) => k,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        } else if ch == '"' {
            match state.read_string() {
                Ok(k) => k,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        } else if ch == '\'' {
            match state.read_char() {
                Ok(k) => k,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        } else if is_ident_start(ch) {
            state.read_ident()
        } else {
            match state.read_operator() {
                Ok(k) => k,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            }
        };

        let span = Span::new(start_pos, state.byte_offset, start_line, start_col);
        tokens.push(Token::new(kind, span));
    }

    (tokens, errors)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

struct State<'a> {
    chars: &'a [char],
    pos: usize,
    byte_offset: usize,
    line: usize,
    col: usize,
}

impl<'a> State<'a> {
    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else if ch == '\r' {
            // A lone CR is a line ending; a CRLF pair counts as one line
            // ending, credited to the following '\n'.
            if self.chars.get(self.pos) != Some(&'\n') {
                self.line += 1;
            }
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.current() {
                Some(c) if c == ' ' || c == '\t' || c == '\n' || c == '\r' => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn span_here(&self) -> Span {
        Span::new(self.byte_offset, self.byte_offset, self.line, self.col)
    }

    fn read_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.current() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        lookup_keyword(&text).unwrap_or(TokenKind::Ident(text))
    }

    fn read_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let start_span = self.span_here();
        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.current() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
        {
            is_float = true;
            self.advance();
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            let save = self.pos;
            let mut lookahead = self.pos + 1;
            if matches!(self.chars.get(lookahead), Some('+') | Some('-')) {
                lookahead += 1;
            }
            if matches!(self.chars.get(lookahead), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                while self.pos < lookahead {
                    self.advance();
                }
                while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = save;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| LexError::InvalidNumber {
                    span: start_span,
                    text,
                })
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| LexError::InvalidNumber {
                    span: start_span,
                    text,
                })
        }
    }

    fn read_escape(&mut self) -> Result<char, LexError> {
        let esc_span = self.span_here();
        let ch = self.advance().ok_or(LexError::UnterminatedString { span: esc_span })?;
        Ok(match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let d = self
                        .current()
                        .and_then(|c| c.to_digit(16))
                        .ok_or(LexError::InvalidUnicodeEscape { span: esc_span })?;
                    code = code * 16 + d;
                    self.advance();
                }
                char::from_u32(code).ok_or(LexError::InvalidUnicodeEscape { span: esc_span })?
            }
            other => return Err(LexError::InvalidEscape { span: esc_span, ch: other }),
        })
    }

    fn read_string(&mut self) -> Result<TokenKind, LexError> {
        let start_span = self.span_here();
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.current() {
                None => return Err(LexError::UnterminatedString { span: start_span }),
                Some('\n') => return Err(LexError::UnterminatedString { span: start_span }),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    out.push(self.read_escape()?);
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        Ok(TokenKind::StringLit(out))
    }

    fn read_char(&mut self) -> Result<TokenKind, LexError> {
        let start_span = self.span_here();
        self.advance(); // opening quote
        let ch = match self.current() {
            None => return Err(LexError::UnterminatedChar { span: start_span }),
            Some('\\') => {
                self.advance();
                self.read_escape()?
            }
            Some(c) => {
                self.advance();
                c
            }
        };
        if self.current() != Some('\'') {
            return Err(LexError::UnterminatedChar { span: start_span });
        }
        self.advance();
        Ok(TokenKind::CharLit(ch))
    }

    fn read_operator(&mut self) -> Result<TokenKind, LexError> {
        let start_span = self.span_here();
        let ch = self.advance().expect("checked by caller");
        let next = self.current();
        macro_rules! two {
            ($c:expr, $kind:expr) => {
                if next == Some($c) {
                    self.advance();
                    return Ok($kind);
                }
            };
        }
        match ch {
            '(' => Ok(TokenKind::LParen),
            ')' => Ok(TokenKind::RParen),
            '{' => Ok(TokenKind::LBrace),
            '}' => Ok(TokenKind::RBrace),
            '[' => Ok(TokenKind::LBracket),
            ']' => Ok(TokenKind::RBracket),
            ',' => Ok(TokenKind::Comma),
            ';' => Ok(TokenKind::Semicolon),
            '|' => {
                two!('|', TokenKind::OrOr);
                Ok(TokenKind::Pipe)
            }
            '+' => {
                two!('+', TokenKind::PlusPlus);
                Ok(TokenKind::Plus)
            }
            '-' => {
                two!('>', TokenKind::Arrow);
                Ok(TokenKind::Minus)
            }
            '*' => Ok(TokenKind::Star),
            '/' => Ok(TokenKind::Slash),
            '%' => Ok(TokenKind::Percent),
            '=' => {
                two!('=', TokenKind::EqEq);
                two!('>', TokenKind::FatArrow);
                Ok(TokenKind::Assign)
            }
            '!' => {
                two!('=', TokenKind::NotEq);
                Ok(TokenKind::Bang)
            }
            '<' => {
                two!('=', TokenKind::LtEq);
                two!('-', TokenKind::LArrow);
                Ok(TokenKind::Lt)
            }
            '>' => {
                two!('=', TokenKind::GtEq);
                Ok(TokenKind::Gt)
            }
            '&' => {
                two!('&', TokenKind::AndAnd);
                Err(LexError::UnexpectedChar { span: start_span, ch })
            }
            ':' => {
                two!(':', TokenKind::ColonColon);
                Ok(TokenKind::Colon)
            }
            '.' => {
                if next == Some('.') && self.peek_at(1) == Some('.') {
                    self.advance();
                    self.advance();
                    return Ok(TokenKind::DotDotDot);
                }
                Ok(TokenKind::Dot)
            }
            '\\' => Ok(TokenKind::Backslash),
            other => Err(LexError::UnexpectedChar { span: start_span, ch: other }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_ints_and_floats() {
        let k = kinds("42 3.14 2e10 1.5e-3");
        assert_eq!(
            k,
            vec![
                TokenKind::IntLit(42),
                TokenKind::FloatLit(3.14),
                TokenKind::FloatLit(2e10),
                TokenKind::FloatLit(1.5e-3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_with_escapes() {
        let k = kinds(r#""a\nb\t\"cA""#);
        assert_eq!(
            k,
            vec![TokenKind::StringLit("a\nb\t\"cA".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn lex_unterminated_string_reports_error() {
        let (_, errors) = tokenize("\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "LEX_STR_UNTERMINATED");
    }

    #[test]
    fn lex_char_literal() {
        let k = kinds("'a' '\\n'");
        assert_eq!(
            k,
            vec![TokenKind::CharLit('a'), TokenKind::CharLit('\n'), TokenKind::Eof]
        );
    }

    #[test]
    fn lex_keywords_and_idents() {
        let k = kinds("let letrec in if then else match func type module import export pure not x _ 変数");
        assert_eq!(
            k,
            vec![
                TokenKind::Let,
                TokenKind::LetRec,
                TokenKind::In,
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::Match,
                TokenKind::Func,
                TokenKind::Type,
                TokenKind::Module,
                TokenKind::Import,
                TokenKind::Export,
                TokenKind::Pure,
                TokenKind::Not,
                TokenKind::Ident("x".into()),
                TokenKind::Underscore,
                TokenKind::Ident("変数".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_operators() {
        let k = kinds("+ - * / % == != < <= > >= && || ++ :: <- -> => ! \\ . ... | , ; :");
        assert_eq!(
            k,
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::PlusPlus,
                TokenKind::ColonColon,
                TokenKind::LArrow,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::Bang,
                TokenKind::Backslash,
                TokenKind::Dot,
                TokenKind::DotDotDot,
                TokenKind::Pipe,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_comment_to_end_of_line() {
        let k = kinds("1 -- this is a comment\n2");
        assert_eq!(
            k,
            vec![TokenKind::IntLit(1), TokenKind::IntLit(2), TokenKind::Eof]
        );
    }

    #[test]
    fn lex_crlf_does_not_emit_newline_token() {
        let k = kinds("1\r\n2\r3");
        assert_eq!(
            k,
            vec![
                TokenKind::IntLit(1),
                TokenKind::IntLit(2),
                TokenKind::IntLit(3),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lex_bom_is_rejected() {
        let (_, errors) = tokenize("\u{FEFF}1");
        assert!(errors.iter().any(|e| e.code() == "LEX_BOM_REJECTED"));
    }

    #[test]
    fn token_concatenation_equals_source_modulo_whitespace() {
        let src = "let x = 1 + 2 in x";
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty());
        let rejoined: String = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.kind.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, "let x = 1 + 2 in x");
    }
}
