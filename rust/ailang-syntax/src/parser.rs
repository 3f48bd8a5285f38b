use crate::ast::*;
use crate::error::ParseError;
use crate::tokens::{Token, TokenKind};
use ailang_core::Span;
use std::panic::{self, AssertUnwindSafe};

/// Parse a full program (module decl, imports, top-level declarations).
pub fn parse_program(tokens: &[Token]) -> (Option<Program>, Vec<ParseError>) {
    run_guarded(tokens, Parser::parse_program)
}

/// Parse a single expression, for REPL/file parity (an input containing only
/// an expression parses identically regardless of host).
pub fn parse_expression(tokens: &[Token]) -> (Option<Expr>, Vec<ParseError>) {
    run_guarded(tokens, |p| {
        let e = p.parse_expr()?;
        p.expect(TokenKind::Eof)?;
        Ok(e)
    })
}

fn run_guarded<T>(
    tokens: &[Token],
    f: impl FnOnce(&mut Parser) -> Result<T, ParseError>,
) -> (Option<T>, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let result = panic::catch_unwind(AssertUnwindSafe(|| f(&mut parser)));
    match result {
        Ok(Ok(value)) => (Some(value), parser.errors),
        Ok(Err(e)) => {
            parser.errors.push(e);
            (None, parser.errors)
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal parser error".to_string());
            parser.errors.push(ParseError::InternalPanic { message });
            (None, parser.errors)
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<ParseError>,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else if self.is_eof() {
            Err(ParseError::UnexpectedEof {
                span: self.peek_span(),
                expected: kind.to_string(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                span: self.peek_span(),
                found: self.peek().to_string(),
                expected: kind.to_string(),
            })
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, Span)> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, span))
            }
            other => Err(ParseError::UnexpectedToken {
                span,
                found: other.to_string(),
                expected: "identifier".into(),
            }),
        }
    }

    /// Skip tokens until a plausible recovery boundary: `;`, `}`, or a
    /// top-level declaration keyword.
    fn synchronize(&mut self) {
        while !self.is_eof() {
            if self.matches(&TokenKind::Semicolon) {
                return;
            }
            if matches!(
                self.peek(),
                TokenKind::RBrace
                    | TokenKind::Func
                    | TokenKind::Type
                    | TokenKind::Module
                    | TokenKind::Import
                    | TokenKind::Export
            ) {
                return;
            }
            self.advance();
        }
    }

    // ---- Program / declarations ----

    fn parse_program(&mut self) -> PResult<Program> {
        let start = self.peek_span();
        let module = if self.check(&TokenKind::Module) {
            Some(self.parse_module_decl()?)
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            match self.parse_import_decl() {
                Ok(i) => imports.push(i),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        let mut items = Vec::new();
        while !self.is_eof() {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        let end = self.peek_span();
        Ok(Program {
            module,
            imports,
            items,
            span: start.merge(end),
        })
    }

    fn parse_path(&mut self) -> PResult<(Vec<String>, Span)> {
        let (first, mut span) = self.expect_ident()?;
        let mut path = vec![first];
        // Module paths are written as '/'-joined identifier segments.
        while self.matches(&TokenKind::Slash) {
            let (seg, seg_span) = self.expect_ident()?;
            path.push(seg);
            span = span.merge(seg_span);
        }
        Ok((path, span))
    }

    fn parse_module_decl(&mut self) -> PResult<ModuleDecl> {
        let start = self.expect(TokenKind::Module)?.span;
        let (path, path_span) = self.parse_path()?;
        Ok(ModuleDecl {
            path,
            span: start.merge(path_span),
        })
    }

    fn parse_import_decl(&mut self) -> PResult<ImportDecl> {
        let start = self.expect(TokenKind::Import)?.span;
        let (path, path_span) = self.parse_path()?;
        if !self.check(&TokenKind::LParen) {
            return Err(ParseError::UnsupportedNamespaceImport {
                span: start.merge(path_span),
            });
        }
        self.advance();
        let mut names = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, _) = self.expect_ident()?;
                names.push(name);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(ImportDecl {
            path,
            names,
            span: start.merge(end),
        })
    }

    fn parse_item(&mut self) -> PResult<Item> {
        if self.check(&TokenKind::Export) || self.check(&TokenKind::Pure) || self.check(&TokenKind::Func) {
            return Ok(Item::Func(self.parse_func_decl()?));
        }
        if self.check(&TokenKind::Type) {
            return Ok(Item::Type(self.parse_type_decl()?));
        }
        Ok(Item::Expr(self.parse_expr()?))
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.peek_span();
        let exported = self.matches(&TokenKind::Export);
        let pure = self.matches(&TokenKind::Pure);
        self.expect(TokenKind::Func)?;
        let (name, _) = self.expect_ident()?;
        let type_params = self.parse_optional_type_params()?;
        let params = self.parse_params()?;
        self.expect(TokenKind::Arrow)?;
        let return_type = Some(self.parse_type_expr()?);
        let effects = self.parse_optional_effect_ann()?;
        let body = if self.check(&TokenKind::LBrace) {
            self.parse_block_body()?
        } else {
            self.expect(TokenKind::Assign)?;
            self.parse_expr()?
        };
        let end = body.span();
        Ok(FuncDecl {
            name,
            exported,
            pure,
            type_params,
            params,
            return_type,
            effects,
            body,
            span: start.merge(end),
        })
    }

    fn parse_optional_type_params(&mut self) -> PResult<Vec<String>> {
        if !self.matches(&TokenKind::Lt) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        if !self.check(&TokenKind::Gt) {
            loop {
                let (name, _) = self.expect_ident()?;
                params.push(name);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, span) = self.expect_ident()?;
                let ty = if self.matches(&TokenKind::Colon) {
                    Some(self.parse_type_expr()?)
                } else {
                    None
                };
                params.push(Param { name, ty, span });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_optional_effect_ann(&mut self) -> PResult<Vec<EffectAnn>> {
        if !self.matches(&TokenKind::Bang) {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::LBrace)?;
        let mut effects: Vec<EffectAnn> = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let (label, span) = self.expect_ident()?;
                if !EFFECT_LABELS.contains(&label.as_str()) {
                    let suggestion = closest_effect_label(&label);
                    return Err(ParseError::UnknownEffect {
                        span,
                        label,
                        suggestion,
                    });
                }
                if effects.iter().any(|e| e.label == label) {
                    return Err(ParseError::DuplicateEffect { span, label });
                }
                effects.push(EffectAnn { label, span });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(effects)
    }

    fn parse_block_body(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut exprs = vec![self.parse_expr()?];
        while self.matches(&TokenKind::Semicolon) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            exprs.push(self.parse_expr()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        let span = start.merge(end);
        // `{ e1; e2; ...; en }` sequences side-effecting expressions,
        // discarding all but the last value.
        let mut result = exprs.pop().expect("at least one expr parsed");
        while let Some(e) = exprs.pop() {
            result = Expr::Let {
                name: "_".to_string(),
                ty: None,
                value: Box::new(e),
                body: Some(Box::new(result)),
                span,
            };
        }
        Ok(result)
    }

    fn parse_type_decl(&mut self) -> PResult<TypeDecl> {
        let start = self.peek_span();
        let exported = self.matches(&TokenKind::Export);
        self.expect(TokenKind::Type)?;
        let (name, _) = self.expect_ident()?;
        let type_params = self.parse_optional_type_params()?;
        self.expect(TokenKind::Assign)?;
        let body = self.parse_type_decl_body()?;
        let end = self.peek_span();
        Ok(TypeDecl {
            name,
            exported,
            type_params,
            body,
            span: start.merge(end),
        })
    }

    fn parse_type_decl_body(&mut self) -> PResult<TypeDeclBody> {
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut fields = Vec::new();
            if !self.check(&TokenKind::RBrace) {
                loop {
                    let (name, span) = self.expect_ident()?;
                    self.expect(TokenKind::Colon)?;
                    let ty = self.parse_type_expr()?;
                    fields.push(FieldDef { name, ty, span });
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RBrace)?;
            return Ok(TypeDeclBody::Record(fields));
        }
        if self.check(&TokenKind::Pipe) || matches!(self.peek(), TokenKind::Ident(n) if starts_upper(n))
        {
            let mut variants = Vec::new();
            self.matches(&TokenKind::Pipe);
            loop {
                let (ctor, span) = self.expect_ident()?;
                let mut fields = Vec::new();
                if self.matches(&TokenKind::LParen) {
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            fields.push(self.parse_type_expr()?);
                            if !self.matches(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                }
                variants.push(VariantDef { ctor, fields, span });
                if !self.matches(&TokenKind::Pipe) {
                    break;
                }
            }
            return Ok(TypeDeclBody::Sum(variants));
        }
        Ok(TypeDeclBody::Alias(self.parse_type_expr()?))
    }

    fn parse_optional_type_effect_labels(&mut self) -> PResult<Vec<String>> {
        if !self.matches(&TokenKind::Bang) {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::LBrace)?;
        let mut labels = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let (name, _) = self.expect_ident()?;
                labels.push(name);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(labels)
    }

    fn parse_type_expr(&mut self) -> PResult<TypeExpr> {
        let span = self.peek_span();
        if self.matches(&TokenKind::LParen) {
            if self.matches(&TokenKind::RParen) {
                return Ok(TypeExpr::Unit { span });
            }
            let mut items = vec![self.parse_type_expr()?];
            while self.matches(&TokenKind::Comma) {
                items.push(self.parse_type_expr()?);
            }
            let end = self.expect(TokenKind::RParen)?.span;
            if self.matches(&TokenKind::Arrow) {
                let ret = self.parse_type_expr()?;
                let effects = self.parse_optional_type_effect_labels()?;
                let ret_span = ret.span();
                return Ok(TypeExpr::Func {
                    params: items,
                    ret: Box::new(ret),
                    effects,
                    span: span.merge(ret_span),
                });
            }
            if items.len() == 1 {
                return Ok(items.into_iter().next().unwrap());
            }
            return Ok(TypeExpr::Tuple {
                items,
                span: span.merge(end),
            });
        }
        if self.matches(&TokenKind::LBracket) {
            let item = self.parse_type_expr()?;
            let end = self.expect(TokenKind::RBracket)?.span;
            return Ok(TypeExpr::List {
                item: Box::new(item),
                span: span.merge(end),
            });
        }
        if self.matches(&TokenKind::LBrace) {
            let mut fields = Vec::new();
            let mut row_var = None;
            if !self.check(&TokenKind::RBrace) {
                loop {
                    if self.matches(&TokenKind::Pipe) {
                        let (name, _) = self.expect_ident()?;
                        row_var = Some(name);
                        break;
                    }
                    let (name, _) = self.expect_ident()?;
                    self.expect(TokenKind::Colon)?;
                    let ty = self.parse_type_expr()?;
                    fields.push((name, ty));
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            let end = self.expect(TokenKind::RBrace)?.span;
            return Ok(TypeExpr::Record {
                fields,
                row_var,
                span: span.merge(end),
            });
        }
        let (name, name_span) = self.expect_ident()?;
        if starts_upper(&name) || !self.check(&TokenKind::Lt) {
            let mut args = Vec::new();
            let mut end = name_span;
            if self.matches(&TokenKind::Lt) {
                loop {
                    let arg = self.parse_type_expr()?;
                    end = arg.span();
                    args.push(arg);
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
                end = self.expect(TokenKind::Gt)?.span;
            }
            return Ok(TypeExpr::Named {
                name,
                args,
                span: name_span.merge(end),
            });
        }
        Ok(TypeExpr::Var {
            name,
            span: name_span,
        })
    }

    // ---- Expressions ----

    fn parse_expr(&mut self) -> PResult<Expr> {
        match self.peek() {
            TokenKind::Backslash => self.parse_lambda(),
            TokenKind::Let => self.parse_let(),
            TokenKind::LetRec => self.parse_letrec(),
            TokenKind::If => self.parse_if(),
            TokenKind::Match => self.parse_match(),
            _ => self.parse_or(),
        }
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::Backslash)?.span;
        let mut params = Vec::new();
        if !self.check(&TokenKind::Dot) {
            loop {
                let (name, _) = self.expect_ident()?;
                params.push(name);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let effects = self.parse_optional_effect_ann()?;
        self.expect(TokenKind::Dot)?;
        let body = self.parse_expr()?;
        let span = start.merge(body.span());
        Ok(Expr::Lambda {
            params,
            effects,
            body: Box::new(body),
            span,
        })
    }

    fn parse_let(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::Let)?.span;
        let (name, _) = self.expect_ident()?;
        let ty = if self.matches(&TokenKind::Colon) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let body = if self.matches(&TokenKind::In) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = body.as_ref().map(|b| b.span()).unwrap_or(value.span());
        Ok(Expr::Let {
            name,
            ty,
            value: Box::new(value),
            body,
            span: start.merge(end),
        })
    }

    fn parse_letrec(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LetRec)?.span;
        let mut bindings = Vec::new();
        loop {
            let (name, _) = self.expect_ident()?;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expr()?;
            bindings.push((name, value));
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::In)?;
        let body = self.parse_expr()?;
        let span = start.merge(body.span());
        Ok(Expr::LetRec {
            bindings,
            body: Box::new(body),
            span,
        })
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::If)?.span;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_expr()?;
        self.expect(TokenKind::Else)?;
        let else_branch = self.parse_expr()?;
        let span = start.merge(else_branch.span());
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span,
        })
    }

    fn parse_match(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::Match)?.span;
        let scrutinee = self.parse_or()?;
        self.expect(TokenKind::LBrace)?;
        let mut arms = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                arms.push(self.parse_match_arm()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr::Match {
            scrutinee: Box::new(scrutinee),
            arms,
            span: start.merge(end),
        })
    }

    fn parse_match_arm(&mut self) -> PResult<MatchArm> {
        let pattern = self.parse_pattern()?;
        let guard = if self.matches(&TokenKind::If) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_expr()?;
        let span = pattern.span().merge(body.span());
        Ok(MatchArm {
            pattern,
            guard,
            body,
            span,
        })
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Underscore => {
                self.advance();
                Ok(Pattern::Wildcard { span })
            }
            TokenKind::IntLit(v) => {
                self.advance();
                Ok(Pattern::IntLit { value: v, span })
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                Ok(Pattern::FloatLit { value: v, span })
            }
            TokenKind::StringLit(v) => {
                self.advance();
                Ok(Pattern::StringLit { value: v, span })
            }
            TokenKind::BoolLit(v) => {
                self.advance();
                Ok(Pattern::BoolLit { value: v, span })
            }
            TokenKind::Minus => {
                self.advance();
                match self.peek().clone() {
                    TokenKind::IntLit(v) => {
                        self.advance();
                        Ok(Pattern::IntLit { value: -v, span })
                    }
                    TokenKind::FloatLit(v) => {
                        self.advance();
                        Ok(Pattern::FloatLit { value: -v, span })
                    }
                    other => Err(ParseError::UnexpectedToken {
                        span,
                        found: other.to_string(),
                        expected: "numeric literal after '-'".into(),
                    }),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        items.push(self.parse_pattern()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RParen)?.span;
                Ok(Pattern::Tuple {
                    items,
                    span: span.merge(end),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                let mut rest = None;
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        if self.matches(&TokenKind::DotDotDot) {
                            match self.peek().clone() {
                                TokenKind::Ident(name) => {
                                    self.advance();
                                    rest = Some(name);
                                }
                                _ => {
                                    return Err(ParseError::SpreadNeedsIdent {
                                        span: self.peek_span(),
                                    })
                                }
                            }
                            break;
                        }
                        items.push(self.parse_pattern()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.span;
                Ok(Pattern::List {
                    items,
                    rest,
                    span: span.merge(end),
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                if starts_upper(&name) {
                    let mut args = Vec::new();
                    let mut end = span;
                    if self.matches(&TokenKind::LParen) {
                        if !self.check(&TokenKind::RParen) {
                            loop {
                                args.push(self.parse_pattern()?);
                                if !self.matches(&TokenKind::Comma) {
                                    break;
                                }
                            }
                        }
                        end = self.expect(TokenKind::RParen)?.span;
                    }
                    Ok(Pattern::Ctor {
                        name,
                        args,
                        span: span.merge(end),
                    })
                } else {
                    Ok(Pattern::Var { name, span })
                }
            }
            other => Err(ParseError::UnexpectedToken {
                span,
                found: other.to_string(),
                expected: "pattern".into(),
            }),
        }
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.matches(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.matches(&TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_append()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_append()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_append(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        while self.matches(&TokenKind::PlusPlus) {
            let rhs = self.parse_additive()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op: BinOp::Append,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let span = self.peek_span();
        if self.matches(&TokenKind::Minus) {
            let inner = self.parse_unary()?;
            let span = span.merge(inner.span());
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                expr: Box::new(inner),
                span,
            });
        }
        if self.matches(&TokenKind::Bang) || self.matches(&TokenKind::Not) {
            let inner = self.parse_unary()?;
            let span = span.merge(inner.span());
            return Ok(Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(inner),
                span,
            });
        }
        self.parse_application()
    }

    fn parse_application(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_access()?;
        loop {
            if self.check(&TokenKind::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RParen)?.span;
                let span = expr.span().merge(end);
                expr = Expr::App {
                    func: Box::new(expr),
                    args,
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_access(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::Dot) {
                let (field, field_span) = self.expect_ident()?;
                let span = expr.span().merge(field_span);
                expr = Expr::RecordAccess {
                    base: Box::new(expr),
                    field,
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::IntLit(v) => {
                self.advance();
                Ok(Expr::IntLit { value: v, span })
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                Ok(Expr::FloatLit { value: v, span })
            }
            TokenKind::StringLit(v) => {
                self.advance();
                Ok(Expr::StringLit { value: v, span })
            }
            TokenKind::CharLit(c) => {
                self.advance();
                Ok(Expr::StringLit {
                    value: c.to_string(),
                    span,
                })
            }
            TokenKind::BoolLit(v) => {
                self.advance();
                Ok(Expr::BoolLit { value: v, span })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident { name, span })
            }
            TokenKind::LParen => {
                self.advance();
                if self.matches(&TokenKind::RParen) {
                    return Ok(Expr::UnitLit {
                        span: span.merge(self.tokens[self.pos - 1].span),
                    });
                }
                let mut items = vec![self.parse_expr()?];
                while self.matches(&TokenKind::Comma) {
                    items.push(self.parse_expr()?);
                }
                let end = self.expect(TokenKind::RParen)?.span;
                if items.len() == 1 {
                    return Ok(items.into_iter().next().unwrap());
                }
                Ok(Expr::Tuple {
                    items,
                    span: span.merge(end),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.span;
                Ok(Expr::List {
                    items,
                    span: span.merge(end),
                })
            }
            TokenKind::LBrace => self.parse_record_expr(),
            other => Err(ParseError::UnexpectedToken {
                span,
                found: other.to_string(),
                expected: "expression".into(),
            }),
        }
    }

    fn parse_record_expr(&mut self) -> PResult<Expr> {
        let span = self.expect(TokenKind::LBrace)?.span;
        let is_literal_start = matches!(self.peek(), TokenKind::Ident(_))
            && matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon))
            || self.check(&TokenKind::RBrace);

        if is_literal_start {
            let fields = self.parse_record_fields()?;
            let end = self.expect(TokenKind::RBrace)?.span;
            return Ok(Expr::Record {
                fields,
                span: span.merge(end),
            });
        }

        let base = self.parse_expr()?;
        self.expect(TokenKind::Pipe)?;
        let fields = self.parse_record_fields()?;
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr::RecordUpdate {
            base: Box::new(base),
            fields,
            span: span.merge(end),
        })
    }

    fn parse_record_fields(&mut self) -> PResult<Vec<(String, Expr)>> {
        let mut fields = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let (name, _) = self.expect_ident()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expr()?;
                fields.push((name, value));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(fields)
    }
}

fn starts_upper(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn closest_effect_label(label: &str) -> String {
    EFFECT_LABELS
        .iter()
        .min_by_key(|candidate| levenshtein(label, candidate))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "IO".to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_expr_str(src: &str) -> Expr {
        let (tokens, lex_errors) = tokenize(src);
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        let (expr, errors) = parse_expression(&tokens);
        assert!(errors.is_empty(), "{errors:?}");
        expr.expect("expr")
    }

    #[test]
    fn precedence_mul_before_add() {
        let e = parse_expr_str("1 + 2 * 3");
        match e {
            Expr::Binary {
                op: BinOp::Add,
                rhs,
                ..
            } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            _ => panic!("expected Add at top"),
        }
    }

    #[test]
    fn binary_ops_are_left_associative() {
        let e = parse_expr_str("1 - 2 - 3");
        match e {
            Expr::Binary {
                op: BinOp::Sub,
                lhs,
                ..
            } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinOp::Sub, .. }));
            }
            _ => panic!("expected left-nested Sub"),
        }
    }

    #[test]
    fn letrec_fac_parses() {
        let e = parse_expr_str("letrec fac = \\n. if n <= 1 then 1 else n * fac(n-1) in fac(5)");
        assert!(matches!(e, Expr::LetRec { .. }));
    }

    #[test]
    fn tuple_vs_grouping() {
        assert!(matches!(parse_expr_str("(1)"), Expr::IntLit { value: 1, .. }));
        assert!(matches!(parse_expr_str("(1, 2)"), Expr::Tuple { .. }));
        assert!(matches!(parse_expr_str("()"), Expr::UnitLit { .. }));
    }

    #[test]
    fn record_literal_and_update() {
        assert!(matches!(parse_expr_str("{ a: 1, b: 2 }"), Expr::Record { .. }));
        assert!(matches!(
            parse_expr_str("{ r | a: 1 }"),
            Expr::RecordUpdate { .. }
        ));
    }

    #[test]
    fn match_with_guard_and_wildcard() {
        let e = parse_expr_str(r#"match 5 { x if false => "yes", x => "no" }"#);
        match e {
            Expr::Match { arms, .. } => {
                assert_eq!(arms.len(), 2);
                assert!(arms[0].guard.is_some());
                assert!(arms[1].guard.is_none());
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn list_pattern_spread_needs_ident() {
        let (tokens, _) = tokenize("match [1,2] { [x, ...2] => x, _ => 0 }");
        let (_, errors) = parse_expression(&tokens);
        assert!(errors.iter().any(|e| e.code() == "PAT_SPREAD_NEEDS_IDENT"));
    }

    #[test]
    fn duplicate_effect_label_errors() {
        let (tokens, _) = tokenize("func f() -> int ! {IO, IO} { 42 }");
        let (_, errors) = parse_program(&tokens);
        assert!(errors.iter().any(|e| e.code() == "PAR_EFF001_DUP"));
    }

    #[test]
    fn unknown_effect_label_errors_with_suggestion() {
        let (tokens, _) = tokenize("func f() -> int ! {Foo} { 42 }");
        let (_, errors) = parse_program(&tokens);
        assert!(errors.iter().any(|e| e.code() == "PAR_EFF002_UNKNOWN"));
    }

    #[test]
    fn namespace_import_is_rejected() {
        let (tokens, _) = tokenize("import a.b");
        let (_, errors) = parse_program(&tokens);
        assert!(errors
            .iter()
            .any(|e| e.code() == "IMP012_UNSUPPORTED_NAMESPACE"));
    }

    #[test]
    fn selective_import_parses() {
        let (tokens, _) = tokenize("import a/b (name1, name2)");
        let (program, errors) = parse_program(&tokens);
        assert!(errors.is_empty());
        let program = program.unwrap();
        assert_eq!(program.imports.len(), 1);
        assert_eq!(program.imports[0].path, vec!["a", "b"]);
        assert_eq!(program.imports[0].names, vec!["name1", "name2"]);
    }
}
