// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;
use crate::value::*;

use anyhow::{bail, Result};

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    line: u32,
    end: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            line: 0,
            end: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.line = self.tok.1.line;
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn is_keyword(&self, ident: &str) -> bool {
        matches!(
            ident,
            "else" | "false" | "from" | "if" | "projection" | "return" | "to" | "true"
        )
    }

    fn parse_ident(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if self.is_keyword(span.text()) => Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                &format!("unexpected keyword `{}`", span.text()),
            )),
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self
                .source
                .error(self.tok.1.line, self.tok.1.col, "expecting identifier")),
        }
    }

    // Member names after `.` may be keywords, e.g. `self.from`.
    fn parse_field(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self
                .source
                .error(self.tok.1.line, self.tok.1.col, "expecting member name")),
        }
    }

    fn read_number(span: Span) -> Result<Expr> {
        match span.text().parse::<f64>() {
            Ok(v) => Ok(Expr::Number {
                span,
                value: Value::Number(v),
            }),
            Err(_) => bail!(span.error("could not parse number")),
        }
    }

    fn parse_scalar_or_ident(&mut self) -> Result<Expr> {
        let span = self.tok.1.clone();
        let node = match &self.tok.0 {
            TokenKind::Number => Self::read_number(span)?,
            TokenKind::String => {
                let v = match serde_json::from_str::<String>(format!("\"{}\"", span.text()).as_str())
                {
                    Ok(v) => Value::from(v),
                    Err(e) => bail!(span.error(format!("invalid string literal. {e}").as_str())),
                };
                Expr::String { span, value: v }
            }
            TokenKind::Ident => match self.token_text() {
                "true" => Expr::Bool {
                    span,
                    value: Value::Bool(true),
                },
                "false" => Expr::Bool {
                    span,
                    value: Value::Bool(false),
                },
                _ => {
                    let ident = self.parse_ident()?;
                    return Ok(Expr::Ident { span: ident });
                }
            },
            _ => {
                return Err(self.source.error(
                    self.tok.1.line,
                    self.tok.1.col,
                    "expecting expression",
                ))
            }
        };
        self.next_token()?;
        Ok(node)
    }

    fn parse_args(&mut self, context: &str) -> Result<Vec<Ref<Expr>>> {
        self.expect("(", context)?;
        let mut args = vec![];
        if self.token_text() != ")" {
            args.push(Ref::new(self.parse_expr()?));
            while self.token_text() == "," {
                self.next_token()?;
                match self.token_text() {
                    ")" => break,
                    "" if self.tok.0 == TokenKind::Eof => break,
                    _ => args.push(Ref::new(self.parse_expr()?)),
                }
            }
        }
        self.expect(")", context)?;
        Ok(args)
    }

    fn parse_params(&mut self, context: &str) -> Result<Vec<Span>> {
        self.expect("(", context)?;
        let mut params = vec![];
        if self.token_text() != ")" {
            params.push(self.parse_ident()?);
            while self.token_text() == "," {
                self.next_token()?;
                if self.token_text() == ")" {
                    break;
                }
                params.push(self.parse_ident()?);
            }
        }
        self.expect(")", context)?;
        Ok(params)
    }

    // Attempts `(a, b) => { ... }`. Returns None without consuming anything
    // if the tokens do not form a lambda.
    fn try_parse_lambda(&mut self) -> Result<Option<Expr>> {
        let mut span = self.tok.1.clone();
        let mut lookahead = self.clone();
        let params = match lookahead.parse_params("while parsing lambda parameters") {
            Ok(params) if lookahead.token_text() == "=>" => params,
            _ => return Ok(None),
        };
        *self = lookahead;

        self.next_token()?;
        let body = self.parse_block()?;
        span.end = self.end;
        Ok(Some(Expr::Lambda {
            span,
            params,
            body: Ref::new(body),
        }))
    }

    fn parse_parens_expr(&mut self) -> Result<Expr> {
        if let Some(lambda) = self.try_parse_lambda()? {
            return Ok(lambda);
        }
        self.next_token()?;
        let expr = self.parse_expr()?;
        self.expect(")", "while parsing parenthesized expression")?;
        Ok(expr)
    }

    fn parse_unary_expr(&mut self, op: UnaryOp) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let expr = self.parse_unary()?;
        span.end = self.end;
        Ok(Expr::Unary {
            span,
            op,
            expr: Ref::new(expr),
        })
    }

    fn parse_decorator(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let name = self.parse_ident()?;
        let params = self.parse_args("while parsing decorator call")?;
        span.end = self.end;
        Ok(Expr::Decorator { span, name, params })
    }

    fn parse_ref(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut term = match self.token_text() {
            "(" if self.tok.0 == TokenKind::Symbol => self.parse_parens_expr()?,
            "@" if self.tok.0 == TokenKind::Symbol => self.parse_decorator()?,
            _ => self.parse_scalar_or_ident()?,
        };

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            match self.token_text() {
                "." => {
                    self.next_token()?;
                    let field = self.parse_field()?;
                    span.end = self.end;
                    term = Expr::Member {
                        span,
                        refr: Ref::new(term),
                        field,
                    };
                }
                "(" if matches!(term, Expr::Ident { .. } | Expr::Member { .. }) => {
                    let params = self.parse_args("while parsing call expr")?;
                    span.end = self.end;
                    term = Expr::Call {
                        span,
                        fcn: Ref::new(term),
                        params,
                    };
                }
                "#" => {
                    self.next_token()?;
                    let name = self.parse_ident()?;
                    let args = if self.token_text() == "(" {
                        self.parse_args("while parsing projection reference")?
                    } else {
                        vec![]
                    };
                    span.end = self.end;
                    term = Expr::ProjectionRef {
                        span,
                        target: Ref::new(term),
                        name,
                        args,
                    };
                }
                _ => break,
            }
        }

        Ok(term)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.token_text() {
            "!" => self.parse_unary_expr(UnaryOp::Not),
            "-" => self.parse_unary_expr(UnaryOp::Neg),
            _ => self.parse_ref(),
        }
    }

    fn parse_mul_div_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_unary()?;

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_unary()?;
            span.end = self.end;
            expr = Expr::ArithExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_arith_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_mul_div_expr()?;

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_mul_div_expr()?;
            span.end = self.end;
            expr = Expr::ArithExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_relational_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_arith_expr()?;

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "<" => BoolOp::Lt,
                "<=" => BoolOp::Le,
                ">" => BoolOp::Gt,
                ">=" => BoolOp::Ge,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_arith_expr()?;
            span.end = self.end;
            expr = Expr::BoolExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_relational_expr()?;

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "==" => BoolOp::Eq,
                "!=" => BoolOp::Ne,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_relational_expr()?;
            span.end = self.end;
            expr = Expr::BoolExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_equality_expr()?;

        while self.token_text() == "&&" {
            let mut span = self.tok.1.clone();
            span.start = start;
            self.next_token()?;
            let right = self.parse_equality_expr()?;
            span.end = self.end;
            expr = Expr::LogicExpr {
                span,
                op: LogicOp::And,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_and_expr()?;

        while self.token_text() == "||" {
            let mut span = self.tok.1.clone();
            span.start = start;
            self.next_token()?;
            let right = self.parse_and_expr()?;
            span.end = self.end;
            expr = Expr::LogicExpr {
                span,
                op: LogicOp::Or,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    // A statement is terminated by `;`. The terminator may be omitted before
    // the closing brace of a block.
    fn parse_terminator(&mut self) -> Result<()> {
        match self.token_text() {
            ";" => self.next_token(),
            "}" => Ok(()),
            _ => Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                "expecting `;` after statement",
            )),
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let cond = self.parse_expr()?;
        let then = self.parse_block()?;
        let otherwise = if self.token_text() == "else" {
            self.next_token()?;
            if self.token_text() == "if" {
                let start = self.tok.1.clone();
                let nested = self.parse_if_stmt()?;
                let mut block_span = start;
                block_span.end = self.end;
                Some(Ref::new(Block {
                    span: block_span,
                    stmts: vec![Ref::new(nested)],
                }))
            } else {
                Some(Ref::new(self.parse_block()?))
            }
        } else {
            None
        };
        span.end = self.end;
        Ok(Stmt::If {
            span,
            cond: Ref::new(cond),
            then: Ref::new(then),
            otherwise,
        })
    }

    pub fn parse_stmt(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        match self.token_text() {
            "if" if self.tok.0 == TokenKind::Ident => {
                let stmt = self.parse_if_stmt()?;
                // An `if` may optionally be followed by `;`.
                if self.token_text() == ";" {
                    self.next_token()?;
                }
                Ok(stmt)
            }
            "return" if self.tok.0 == TokenKind::Ident => {
                self.next_token()?;
                let expr = self.parse_expr()?;
                span.end = self.end;
                self.parse_terminator()?;
                Ok(Stmt::Return {
                    span,
                    expr: Ref::new(expr),
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                span.end = self.end;
                self.parse_terminator()?;
                Ok(Stmt::Expr {
                    span,
                    expr: Ref::new(expr),
                })
            }
        }
    }

    pub fn parse_block(&mut self) -> Result<Block> {
        let mut span = self.tok.1.clone();
        self.expect("{", "while parsing block")?;
        let mut stmts = vec![];
        loop {
            match self.token_text() {
                "}" => break,
                ";" => self.next_token()?,
                _ if self.tok.0 == TokenKind::Eof => {
                    return Err(self.source.error(
                        self.tok.1.line,
                        self.tok.1.col,
                        "unexpected eof while parsing block",
                    ))
                }
                _ => stmts.push(Ref::new(self.parse_stmt()?)),
            }
        }
        self.expect("}", "while parsing block")?;
        span.end = self.end;
        Ok(Block { span, stmts })
    }

    fn parse_direction(&mut self) -> Result<DirectionDecl> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let params = if self.token_text() == "(" {
            self.parse_params("while parsing projection parameters")?
        } else {
            vec![]
        };
        let body = self.parse_block()?;
        span.end = self.end;
        Ok(DirectionDecl {
            span,
            params,
            body: Ref::new(body),
        })
    }

    // `#suppress "reason"` directives are accepted and ignored.
    fn skip_directives(&mut self) -> Result<()> {
        while self.token_text() == "#" && self.tok.0 == TokenKind::Symbol {
            self.next_token()?;
            let directive = self.parse_ident()?;
            if directive.text() != "suppress" {
                bail!(directive.error(&format!("unknown directive `{}`", directive.text())));
            }
            while self.tok.0 == TokenKind::String {
                self.next_token()?;
            }
        }
        Ok(())
    }

    pub fn parse_projection(&mut self) -> Result<ProjectionDecl> {
        let mut span = self.tok.1.clone();
        self.expect("projection", "at start of projection declaration")?;
        let selector = self.parse_ident()?;
        self.expect("#", "between projection target and name")?;
        let name = self.parse_ident()?;
        self.expect("{", "while parsing projection declaration")?;

        let (mut to, mut from) = (None, None);
        loop {
            match self.token_text() {
                "}" => break,
                "to" | "from" => {
                    let dir_span = self.tok.1.clone();
                    let is_to = self.token_text() == "to";
                    let declared = if is_to { to.is_some() } else { from.is_some() };
                    if declared {
                        bail!(dir_span.error(&format!(
                            "duplicate `{}` direction in projection",
                            dir_span.text()
                        )));
                    }
                    let decl = self.parse_direction()?;
                    if is_to {
                        to = Some(Ref::new(decl));
                    } else {
                        from = Some(Ref::new(decl));
                    }
                }
                _ => {
                    return Err(self.source.error(
                        self.tok.1.line,
                        self.tok.1.col,
                        "expecting `to` or `from`",
                    ))
                }
            }
        }
        self.expect("}", "while parsing projection declaration")?;
        span.end = self.end;

        Ok(ProjectionDecl {
            span,
            selector,
            name,
            to,
            from,
        })
    }

    pub fn parse(&mut self) -> Result<Module> {
        let mut projections = vec![];
        loop {
            self.skip_directives()?;
            if self.tok.0 == TokenKind::Eof {
                break;
            }
            projections.push(Ref::new(self.parse_projection()?));
            if self.token_text() == ";" {
                self.next_token()?;
            }
        }
        Ok(Module { projections })
    }
}
