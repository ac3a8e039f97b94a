use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::error::{MintError, Span};
use crate::lexer::{Token, TokenSpan, TokenType};
use crate::scope::{Binding, Function, ScopeId, Scopes};
use crate::value::Value;
use log::debug;
use std::rc::Rc;

/// Pull parser over one token span.
///
/// Identifiers are resolved against the scope table the parser was created
/// for as soon as they are read, so a span has to be parsed while its scope is
/// live, one statement at a time, interleaved with evaluation. Block bodies
/// are not parsed here at all: they are captured as spans and handed to a new
/// parser when they run.
pub struct Parser {
    span: TokenSpan,
    current: usize,
    scope: ScopeId,
}

impl Parser {
    pub fn new(span: TokenSpan, scope: ScopeId) -> Self {
        let current = span.start();
        Self {
            span,
            current,
            scope,
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Next statement, or `None` once the span's end token is reached.
    pub fn parse_statement(&mut self, scopes: &mut Scopes) -> Result<Option<Stmt>, MintError> {
        while self.peek().token_type.is_separator() && !self.is_at_end() {
            self.advance();
        }
        if self.is_at_end() {
            return Ok(None);
        }

        let stmt = match self.peek().token_type {
            TokenType::Fn => self.function_definition(scopes)?,
            TokenType::Return => self.return_statement(scopes)?,
            TokenType::Print => self.print_statement(scopes)?,
            TokenType::If => self.if_statement(scopes)?,
            TokenType::For => self.for_statement(scopes)?,
            TokenType::Identifier if self.peek_next_type() == TokenType::Equal => {
                self.assignment(scopes)?
            }
            _ => self.expression_statement(scopes)?,
        };

        if !self.at_statement_end() {
            return Err(self.unexpected("line break or ';' after statement"));
        }

        let span = stmt.span();
        debug!("parsed `{}` at {}..{}", stmt, span.start, span.end);
        Ok(Some(stmt))
    }

    /// Body of an inline function: exactly one expression filling the span.
    pub fn parse_inline_body(&mut self, scopes: &Scopes) -> Result<Expr, MintError> {
        let expr = self.expression(scopes)?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of function body"));
        }
        Ok(expr)
    }

    fn assignment(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let name = self.advance().clone();
        let equals = self.advance().clone();

        if self.at_statement_end() {
            return Err(MintError::syntax_error(
                equals.span,
                format!("Expected expression after '=', found {}", self.peek().token_type),
            )
            .with_help(format!("Give '{}' a value: {} = 1", name.lexeme, name.lexeme)));
        }

        let value = self.expression(scopes)?;
        let span = name.span.to(value.span());
        Ok(Stmt::Assign {
            name: name.lexeme,
            value,
            span,
        })
    }

    fn function_definition(&mut self, scopes: &mut Scopes) -> Result<Stmt, MintError> {
        let keyword = self.advance().clone();
        let name = self
            .consume(TokenType::Identifier, "function name after 'fn'")?
            .clone();
        self.consume(TokenType::LeftParen, "'(' after function name")?;
        let params = self.parameters()?;

        let (body, inline) = if self.skip_newlines_before(TokenType::LeftBrace) {
            (self.block("'{' before function body")?, false)
        } else {
            (self.line_body(&name)?, true)
        };

        if let Some(Binding::Function(_)) = scopes.table(self.scope).lookup_local(&name.lexeme) {
            return Err(MintError::name_error(
                name.span,
                format!("Function '{}' is already defined in this scope", name.lexeme),
            )
            .with_help("Pick a different name or remove the earlier definition"));
        }

        let function = Rc::new(Function {
            name: name.lexeme,
            params,
            body,
            inline,
        });
        scopes.declare(self.scope, Binding::Function(Rc::clone(&function)));

        Ok(Stmt::Function {
            function,
            span: keyword.span.to(&self.previous().span),
        })
    }

    fn parameters(&mut self) -> Result<Vec<String>, MintError> {
        let mut params: Vec<String> = Vec::new();

        self.skip_newlines();
        if !self.check(TokenType::RightParen) {
            loop {
                self.skip_newlines();
                let param = self.consume(TokenType::Identifier, "parameter name")?.clone();
                if params.contains(&param.lexeme) {
                    return Err(MintError::name_error(
                        param.span,
                        format!("Duplicate parameter '{}'", param.lexeme),
                    ));
                }
                params.push(param.lexeme);

                self.skip_newlines();
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "')' after parameters")?;
        Ok(params)
    }

    /// Inline body: the remaining tokens of the line.
    fn line_body(&mut self, name: &Token) -> Result<TokenSpan, MintError> {
        let start = self.current;
        let mut depth = 0usize;

        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::LeftParen | TokenType::LeftBrace => depth += 1,
                TokenType::RightParen | TokenType::RightBrace if depth == 0 => break,
                TokenType::RightParen | TokenType::RightBrace => depth -= 1,
                TokenType::Newline | TokenType::Semicolon if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }

        if self.current == start {
            return Err(MintError::syntax_error(
                name.span.clone(),
                format!("Function '{}' has no body", name.lexeme),
            )
            .with_help("Write the body in braces or as an expression: fn add(a, b) a + b"));
        }

        Ok(self.span.slice(start, self.current))
    }

    fn return_statement(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let keyword = self.advance().clone();

        if !scopes.in_frame(self.scope) {
            return Err(MintError::scope_error(
                keyword.span,
                "'return' outside of a function".to_string(),
            )
            .with_help("'return' is only allowed inside a function body or a '{ ... }' block expression"));
        }

        if self.at_statement_end() {
            return Ok(Stmt::Return {
                value: None,
                span: keyword.span,
            });
        }

        let value = self.expression(scopes)?;
        Ok(Stmt::Return {
            span: keyword.span.to(value.span()),
            value: Some(value),
        })
    }

    fn print_statement(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let keyword = self.advance().clone();
        self.expect_operand(&keyword)?;

        let expr = self.expression(scopes)?;
        Ok(Stmt::Print {
            span: keyword.span.to(expr.span()),
            expr,
        })
    }

    fn if_statement(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let keyword = self.advance().clone();
        self.expect_operand(&keyword)?;

        let condition = self.expression(scopes)?;
        let then_branch = self.block("'{' after if condition")?;
        let else_branch = if self.skip_newlines_before(TokenType::Else) {
            self.advance();
            Some(self.block("'{' after 'else'")?)
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span: keyword.span.to(&self.previous().span),
        })
    }

    fn for_statement(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let keyword = self.advance().clone();
        self.expect_operand(&keyword)?;

        let condition = self.expression(scopes)?;
        let body = self.block("'{' after loop condition")?;

        Ok(Stmt::For {
            condition,
            body,
            span: keyword.span.to(&self.previous().span),
        })
    }

    fn expression_statement(&mut self, scopes: &Scopes) -> Result<Stmt, MintError> {
        let expr = self.expression(scopes)?;
        Ok(Stmt::Expression {
            span: expr.span().clone(),
            expr,
        })
    }

    /// `{ ... }` captured by balanced-brace scan, without parsing its contents.
    fn block(&mut self, expected: &str) -> Result<TokenSpan, MintError> {
        self.skip_newlines_before(TokenType::LeftBrace);
        let open = self.consume(TokenType::LeftBrace, expected)?.clone();
        self.braced_span(&open)
    }

    /// Captures up to the brace matching `open`, which is already consumed.
    fn braced_span(&mut self, open: &Token) -> Result<TokenSpan, MintError> {
        let start = self.current;
        let mut depth = 0usize;

        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::LeftBrace => depth += 1,
                TokenType::RightBrace if depth == 0 => {
                    let body = self.span.slice(start, self.current);
                    self.advance();
                    return Ok(body);
                }
                TokenType::RightBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }

        Err(MintError::syntax_error(
            open.span.clone(),
            format!("Expected '}}' to close this block, found {}", self.peek().token_type),
        )
        .with_help("Every '{' needs a matching '}'"))
    }

    // Expressions: precedence climbing over BinaryOp::precedence.

    pub fn expression(&mut self, scopes: &Scopes) -> Result<Expr, MintError> {
        self.binary(scopes, 0)
    }

    fn binary(&mut self, scopes: &Scopes, min_precedence: u8) -> Result<Expr, MintError> {
        let mut expr = self.unary(scopes)?;

        while let Some(operator) = self.peek_binary_op() {
            let precedence = operator.precedence();
            if precedence <= min_precedence {
                break;
            }

            let operator_token = self.advance().clone();
            self.expect_operand(&operator_token)?;
            let right = self.binary(scopes, precedence)?;

            expr = Expr::Binary {
                span: expr.span().to(right.span()),
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        if self.is_at_end() {
            return None;
        }
        let operator = match self.peek().token_type {
            TokenType::Plus => BinaryOp::Add,
            TokenType::Minus => BinaryOp::Subtract,
            TokenType::Star => BinaryOp::Multiply,
            TokenType::Slash => BinaryOp::Divide,
            TokenType::Percent => BinaryOp::Modulo,
            TokenType::EqualEqual => BinaryOp::Equal,
            TokenType::BangEqual => BinaryOp::NotEqual,
            TokenType::Less => BinaryOp::Less,
            TokenType::LessEqual => BinaryOp::LessEqual,
            TokenType::Greater => BinaryOp::Greater,
            TokenType::GreaterEqual => BinaryOp::GreaterEqual,
            _ => return None,
        };
        Some(operator)
    }

    fn unary(&mut self, scopes: &Scopes) -> Result<Expr, MintError> {
        if self.match_types(&[TokenType::Minus, TokenType::Bang]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Minus => UnaryOp::Negate,
                _ => UnaryOp::Not,
            };

            self.expect_operand(&operator_token)?;
            let operand = self.unary(scopes)?;
            return Ok(Expr::Unary {
                span: operator_token.span.to(operand.span()),
                operator,
                operand: Box::new(operand),
            });
        }

        self.primary(scopes)
    }

    fn primary(&mut self, scopes: &Scopes) -> Result<Expr, MintError> {
        if self.is_at_end() {
            return Err(self.unexpected("expression"));
        }

        let token = self.advance().clone();
        let token_type = token.token_type;

        match token_type {
            TokenType::False => Ok(Expr::Literal {
                value: Value::Bool(false),
                span: token.span,
            }),
            TokenType::True => Ok(Expr::Literal {
                value: Value::Bool(true),
                span: token.span,
            }),
            TokenType::Integer => {
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    MintError::syntax_error(token.span.clone(), "Invalid integer".to_string())
                })?;
                Ok(Expr::Literal {
                    value: Value::Int(value),
                    span: token.span,
                })
            }
            TokenType::Float => {
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    MintError::syntax_error(token.span.clone(), "Invalid float".to_string())
                })?;
                Ok(Expr::Literal {
                    value: Value::Float(value),
                    span: token.span,
                })
            }
            TokenType::String => Ok(Expr::Literal {
                value: Value::String(token.lexeme),
                span: token.span,
            }),
            TokenType::Identifier if self.check(TokenType::LeftParen) => self.call(token, scopes),
            TokenType::Identifier => self.variable(token, scopes),
            TokenType::LeftParen => self.grouping(token, scopes),
            TokenType::LeftBrace => {
                let body = self.braced_span(&token)?;
                Ok(Expr::Block {
                    body,
                    span: token.span.to(&self.previous().span),
                })
            }
            _ => {
                let help_msg = match token_type {
                    TokenType::RightParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    TokenType::RightBrace => "Found '}' without matching '{'. Check for unbalanced braces.",
                    TokenType::Else => "'else' must directly follow the closing '}' of an if block.",
                    TokenType::Fn | TokenType::Return | TokenType::Print | TokenType::If | TokenType::For => {
                        "Statements cannot be used where a value is expected."
                    }
                    _ => "Expected a literal value, variable, call, or parenthesized expression here.",
                };

                Err(MintError::syntax_error(
                    token.span,
                    format!("Expected expression, found {}", token_type),
                )
                .with_help(help_msg))
            }
        }
    }

    fn variable(&mut self, token: Token, scopes: &Scopes) -> Result<Expr, MintError> {
        match scopes.lookup(self.scope, &token.lexeme) {
            Some(Binding::Variable(_)) => Ok(Expr::Variable {
                name: token.lexeme,
                span: token.span,
            }),
            Some(Binding::Function(function)) => Err(MintError::name_error(
                token.span,
                format!("'{}' is a function, not a variable", token.lexeme),
            )
            .with_help(format!(
                "Call it with {} argument(s): {}(...)",
                function.arity(),
                token.lexeme
            ))),
            None => Err(MintError::name_error(
                token.span,
                format!("Undefined variable '{}'", token.lexeme),
            )
            .with_help(format!("Assign it before use: {} = ...", token.lexeme))),
        }
    }

    /// `name(args)`; the callee and its arity are checked before anything runs.
    fn call(&mut self, name: Token, scopes: &Scopes) -> Result<Expr, MintError> {
        let function = match scopes.lookup(self.scope, &name.lexeme) {
            Some(Binding::Function(function)) => Rc::clone(function),
            Some(Binding::Variable(_)) => {
                return Err(MintError::name_error(
                    name.span,
                    format!("'{}' is not a function", name.lexeme),
                ))
            }
            None => {
                return Err(MintError::name_error(
                    name.span,
                    format!("Undefined function '{}'", name.lexeme),
                )
                .with_help(format!("Define it first: fn {}(...) {{ ... }}", name.lexeme)))
            }
        };

        self.advance(); // '('
        let args = self.arguments(scopes)?;
        let paren = self
            .consume(TokenType::RightParen, "')' after arguments")?
            .clone();
        let span = name.span.to(&paren.span);

        if args.len() != function.arity() {
            return Err(MintError::arity_error(
                span,
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    function.name,
                    function.arity(),
                    args.len()
                ),
            )
            .with_help(format!(
                "Declared as: fn {}({})",
                function.name,
                function.params.join(", ")
            )));
        }

        Ok(Expr::Call {
            name: name.lexeme,
            args,
            span,
        })
    }

    fn arguments(&mut self, scopes: &Scopes) -> Result<Vec<Expr>, MintError> {
        let mut args = Vec::new();

        self.skip_newlines();
        if self.check(TokenType::RightParen) {
            return Ok(args);
        }

        loop {
            args.push(self.expression(scopes)?);

            self.skip_newlines();
            if !self.match_types(&[TokenType::Comma]) {
                break;
            }

            self.skip_newlines();
            if self.check(TokenType::RightParen) {
                return Err(MintError::syntax_error(
                    self.previous().span.clone(),
                    "Trailing ',' in argument list".to_string(),
                )
                .with_help("Remove the ',' or add another argument"));
            }
        }

        Ok(args)
    }

    fn grouping(&mut self, open: Token, scopes: &Scopes) -> Result<Expr, MintError> {
        self.skip_newlines();
        if self.check(TokenType::RightParen) {
            return Err(MintError::syntax_error(
                open.span.to(&self.peek().span),
                "Empty parentheses are not allowed".to_string(),
            )
            .with_help("Parentheses must contain an expression. Example: (x + 1)"));
        }

        let expr = self.expression(scopes)?;
        self.skip_newlines();
        let close = self
            .consume(TokenType::RightParen, "')' after expression")?
            .clone();

        Ok(Expr::Grouping {
            expr: Box::new(expr),
            span: open.span.to(&close.span),
        })
    }

    /// Fails with "Expected expression after '<op>'" when nothing follows `token`.
    fn expect_operand(&self, token: &Token) -> Result<(), MintError> {
        let missing = self.at_statement_end()
            || self.check(TokenType::RightParen)
            || self.check(TokenType::Comma)
            || (self.check(TokenType::LeftBrace) && token.token_type.is_keyword_with_block());
        if missing {
            return Err(MintError::syntax_error(
                token.span.clone(),
                format!(
                    "Expected expression after {}, found {}",
                    token.token_type,
                    self.peek().token_type
                ),
            )
            .with_help("Operators and statements like 'print', 'if' and 'for' need an expression to work on."));
        }
        Ok(())
    }

    fn at_statement_end(&self) -> bool {
        self.is_at_end() || self.peek().token_type.is_separator()
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenType::Newline) {
            self.advance();
        }
    }

    /// Moves past line breaks only when `token_type` follows them.
    fn skip_newlines_before(&mut self, token_type: TokenType) -> bool {
        let checkpoint = self.current;
        self.skip_newlines();
        if self.check(token_type) {
            true
        } else {
            self.current = checkpoint;
            false
        }
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// The span's end token is never consumed.
    fn is_at_end(&self) -> bool {
        self.current >= self.span.end()
    }

    fn peek(&self) -> &Token {
        &self.span.tokens()[self.current]
    }

    fn peek_next_type(&self) -> TokenType {
        if self.current + 1 > self.span.end() {
            return TokenType::Eof;
        }
        self.span.tokens()[self.current + 1].token_type
    }

    fn previous(&self) -> &Token {
        &self.span.tokens()[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, expected: &str) -> Result<&Token, MintError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> MintError {
        let found = self.peek();
        // At the end of a span point just past the last real token
        let span = if self.is_at_end() && self.current > self.span.start() {
            Span::single(self.previous().span.end)
        } else {
            found.span.clone()
        };

        MintError::syntax_error(
            span,
            format!("Expected {}, found {}", expected, found.token_type),
        )
    }
}
