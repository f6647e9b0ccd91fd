use std::rc::Rc;

use crate::{
    ast::{AssignOp, BinaryOp, Expr, ExprKind, MatchArm, Program, Stmt, StmtKind},
    diagnostics::{Diagnostic, DiagnosticKind},
    lexer::{Keyword, Lexer, Token, TokenKind},
    value::Function,
};

pub fn parse_program(source: &str) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut program = Program::default();
        while !self.check(TokenKind::Eof) {
            if self.check(TokenKind::Keyword(Keyword::Func))
                && self.check_ahead(1, TokenKind::Identifier)
            {
                let (name, function) = self.parse_function_decl()?;
                program.functions.insert(name, Rc::new(function));
            } else {
                program.body.push(self.parse_statement()?);
            }
        }
        Ok(program)
    }

    /// `func name(params) { ... }` — allowed at the top level only. A
    /// `func` without a name is a closure expression instead.
    fn parse_function_decl(&mut self) -> Result<(String, Function), Diagnostic> {
        self.consume_keyword(Keyword::Func)?;
        let name = self.consume_identifier("expected function name after `func`")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok((
            name.lexeme.clone(),
            Function {
                name: Some(name.lexeme),
                params,
                body: Rc::new(body),
                captured: None,
            },
        ))
    }

    fn parse_params(&mut self) -> Result<Vec<String>, Diagnostic> {
        self.consume(TokenKind::LParen, "expected `(` before parameter list")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param = self.consume_identifier("expected parameter name")?;
                params.push(param.lexeme);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after parameter list")?;
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        self.consume(TokenKind::LBrace, "expected `{` to start block")?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RBrace, "expected `}` to close block")?;
        Ok(items)
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        if let TokenKind::Keyword(keyword) = self.peek().kind {
            match keyword {
                Keyword::If => return self.parse_if(),
                Keyword::While => return self.parse_while(),
                Keyword::For => return self.parse_for(),
                Keyword::Match => return self.parse_match(),
                Keyword::Return => return self.parse_return(),
                Keyword::Break => return self.parse_break(),
                Keyword::Continue => return self.parse_continue(),
                _ => {}
            }
        }
        self.parse_expression_statement()
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::If)?;
        self.consume(TokenKind::LParen, "expected `(` after `if`")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected `)` after if condition")?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches_keyword(Keyword::Else) {
            if self.check(TokenKind::Keyword(Keyword::If)) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::If {
                condition,
                then_block,
                else_block,
            },
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::While)?;
        self.consume(TokenKind::LParen, "expected `(` after `while`")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected `)` after while condition")?;
        let body = self.parse_block()?;
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::While { condition, body },
        })
    }

    /// Either `for (init; cond; post) { ... }` or `for (name in expr) { ... }`.
    fn parse_for(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::For)?;
        self.consume(TokenKind::LParen, "expected `(` after `for`")?;

        if self.check(TokenKind::Identifier) && self.check_ahead(1, TokenKind::Keyword(Keyword::In))
        {
            let binding = self.consume_identifier("expected loop variable")?;
            self.consume_keyword(Keyword::In)?;
            let iterable = self.parse_expression()?;
            self.consume(TokenKind::RParen, "expected `)` after foreach header")?;
            let body = self.parse_block()?;
            return Ok(Stmt {
                pos: token.pos,
                kind: StmtKind::ForEach {
                    binding: binding.lexeme,
                    iterable,
                    body,
                },
            });
        }

        let init = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for condition")?;
        let post = self.parse_expression()?;
        self.consume(TokenKind::RParen, "expected `)` after for header")?;
        let body = self.parse_block()?;
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::For {
                init,
                condition,
                post,
                body,
            },
        })
    }

    /// `match (subject)? { case -> { ... } ... }`. The subject is optional;
    /// without one every case is matched against `true`, turning the arms
    /// into guard conditions. A bare `_` case matches anything and is never
    /// evaluated.
    fn parse_match(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Match)?;
        let subject = if self.matches(TokenKind::LParen) {
            let subject = self.parse_expression()?;
            self.consume(TokenKind::RParen, "expected `)` after match subject")?;
            Some(subject)
        } else {
            None
        };
        self.consume(TokenKind::LBrace, "expected `{` to start match arms")?;
        let mut arms = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let pos = self.peek().pos;
            let case = if self.check_wildcard() {
                self.advance();
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(TokenKind::Arrow, "expected `->` after match case")?;
            let body = self.parse_block()?;
            self.matches(TokenKind::Comma);
            arms.push(MatchArm { case, body, pos });
        }
        self.consume(TokenKind::RBrace, "expected `}` to close match arms")?;
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::Match { subject, arms },
        })
    }

    fn check_wildcard(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier
            && token.lexeme == "_"
            && self.check_ahead(1, TokenKind::Arrow)
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Return)?;
        let expr = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.check(TokenKind::Eof)
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_optional_semicolon();
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::Return(expr),
        })
    }

    fn parse_break(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Break)?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::Break,
        })
    }

    fn parse_continue(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Continue)?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            pos: token.pos,
            kind: StmtKind::Continue,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let expr = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            pos: expr.pos,
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_logical_or()?;
        let op = if self.matches(TokenKind::Assign) {
            AssignOp::Assign
        } else if self.matches(TokenKind::PlusAssign) {
            AssignOp::AddAssign
        } else if self.matches(TokenKind::MinusAssign) {
            AssignOp::SubAssign
        } else if self.matches(TokenKind::StarAssign) {
            AssignOp::MulAssign
        } else if self.matches(TokenKind::SlashAssign) {
            AssignOp::DivAssign
        } else if self.matches(TokenKind::PercentAssign) {
            AssignOp::ModAssign
        } else {
            return Ok(expr);
        };
        let op_pos = self.previous().pos;
        let value = self.parse_assignment()?;
        match expr.kind {
            ExprKind::Ident(_) | ExprKind::Index { .. } => Ok(Expr {
                pos: expr.pos,
                kind: ExprKind::Assign {
                    op,
                    target: Box::new(expr),
                    value: Box::new(value),
                },
            }),
            _ => Err(Diagnostic::new(DiagnosticKind::Parse, "invalid assignment target").at(op_pos)),
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_logical_and()?;
        while self.matches(TokenKind::DoublePipe) {
            let right = self.parse_logical_and()?;
            expr = binary(BinaryOp::LogOr, expr, right);
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_bit_or()?;
        while self.matches(TokenKind::DoubleAmpersand) {
            let right = self.parse_bit_or()?;
            expr = binary(BinaryOp::LogAnd, expr, right);
        }
        Ok(expr)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_bit_and()?;
        while self.matches(TokenKind::Pipe) {
            let right = self.parse_bit_and()?;
            expr = binary(BinaryOp::BitOr, expr, right);
        }
        Ok(expr)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_equality()?;
        while self.matches(TokenKind::Ampersand) {
            let right = self.parse_equality()?;
            expr = binary(BinaryOp::BitAnd, expr, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_comparison()?;
        loop {
            if self.matches(TokenKind::EqualEqual) {
                let right = self.parse_comparison()?;
                expr = binary(BinaryOp::Equal, expr, right);
            } else if self.matches(TokenKind::BangEqual) {
                let right = self.parse_comparison()?;
                expr = binary(BinaryOp::NotEqual, expr, right);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_term()?;
        loop {
            let op = if self.matches(TokenKind::LessEqual) {
                BinaryOp::LessEqual
            } else if self.matches(TokenKind::GreaterEqual) {
                BinaryOp::GreaterEqual
            } else if self.matches(TokenKind::Less) {
                BinaryOp::Less
            } else if self.matches(TokenKind::Greater) {
                BinaryOp::Greater
            } else {
                break;
            };
            let right = self.parse_term()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_factor()?;
        loop {
            if self.matches(TokenKind::Plus) {
                let right = self.parse_factor()?;
                expr = binary(BinaryOp::Add, expr, right);
            } else if self.matches(TokenKind::Minus) {
                let right = self.parse_factor()?;
                expr = binary(BinaryOp::Sub, expr, right);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_unary()?;
        loop {
            if self.matches(TokenKind::Star) {
                let right = self.parse_unary()?;
                expr = binary(BinaryOp::Mul, expr, right);
            } else if self.matches(TokenKind::Slash) {
                let right = self.parse_unary()?;
                expr = binary(BinaryOp::Div, expr, right);
            } else if self.matches(TokenKind::Percent) {
                let right = self.parse_unary()?;
                expr = binary(BinaryOp::Mod, expr, right);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Unary minus, logical not, and bitwise not parse to Binary nodes with
    /// an absent right operand.
    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = if self.matches(TokenKind::Minus) {
            Some(BinaryOp::Sub)
        } else if self.matches(TokenKind::Bang) {
            Some(BinaryOp::LogNot)
        } else if self.matches(TokenKind::Tilde) {
            Some(BinaryOp::BitNot)
        } else {
            None
        };
        if let Some(op) = op {
            let pos = self.previous().pos;
            let operand = self.parse_unary()?;
            return Ok(Expr {
                pos,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(operand),
                    rhs: None,
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::NullLit,
                })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::BoolLit(true),
                })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::BoolLit(false),
                })
            }
            TokenKind::Number => {
                self.advance();
                let kind = if token.lexeme.contains('.') {
                    ExprKind::DoubleLit(self.parse_number(&token)?)
                } else {
                    ExprKind::IntLit(self.parse_number(&token)?)
                };
                Ok(Expr {
                    pos: token.pos,
                    kind,
                })
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::StringLit(token.lexeme),
                })
            }
            TokenKind::Char => {
                self.advance();
                let ch = token.lexeme.chars().next().unwrap_or('\0');
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::CharLit(ch),
                })
            }
            TokenKind::Identifier => {
                self.advance();
                if self.matches(TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    Ok(Expr {
                        pos: token.pos,
                        kind: ExprKind::Call {
                            name: token.lexeme,
                            args,
                        },
                    })
                } else if self.matches(TokenKind::LBracket) {
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RBracket, "expected `]` after index")?;
                    Ok(Expr {
                        pos: token.pos,
                        kind: ExprKind::Index {
                            name: token.lexeme,
                            index: Box::new(index),
                        },
                    })
                } else {
                    Ok(Expr {
                        pos: token.pos,
                        kind: ExprKind::Ident(token.lexeme),
                    })
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RBracket, "expected `]` to close array literal")?;
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::ArrayLit(elements),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected `)` after expression")?;
                Ok(expr)
            }
            TokenKind::Keyword(Keyword::Func) => {
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr {
                    pos: token.pos,
                    kind: ExprKind::Closure {
                        params,
                        body: Rc::new(body),
                    },
                })
            }
            TokenKind::Eof => Err(Diagnostic::new(
                DiagnosticKind::Parse,
                "unexpected end of input",
            )
            .at(token.pos)),
            _ => Err(Diagnostic::new(
                DiagnosticKind::Parse,
                format!("unexpected token `{}`", token.lexeme),
            )
            .at(token.pos)),
        }
    }

    fn parse_number<T: std::str::FromStr>(&self, token: &Token) -> Result<T, Diagnostic> {
        token.lexeme.parse().map_err(|_| {
            Diagnostic::new(
                DiagnosticKind::Parse,
                format!("number literal `{}` is out of range", token.lexeme),
            )
            .at(token.pos)
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, Diagnostic> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after arguments")?;
        Ok(args)
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.current)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_ahead(&self, offset: usize, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + offset)
            .map(|token| token.kind == kind)
            .unwrap_or(false)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.current += 1;
        }
        token
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, Diagnostic> {
        self.consume(
            TokenKind::Keyword(keyword),
            &format!("expected keyword `{keyword:?}`"),
        )
    }

    fn consume_identifier(&mut self, message: &str) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Identifier, message)
    }

    fn consume_optional_semicolon(&mut self) {
        self.matches(TokenKind::Semicolon);
    }

    fn error(&self, message: &str) -> Diagnostic {
        let token = self.peek();
        let detail = if token.lexeme.is_empty() {
            message.to_string()
        } else {
            format!("{message}, found `{}`", token.lexeme)
        };
        Diagnostic::new(DiagnosticKind::Parse, detail).at(token.pos)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr {
        pos: lhs.pos,
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Some(Box::new(rhs)),
        },
    }
}
