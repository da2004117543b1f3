//! Operator-precedence (Pratt) parser
//!
//! Consumes the token stream with one token of lookahead and builds the AST.
//! The parser never panics on malformed input: it records messages in an
//! error list and best-effort returns a partial program. Only the first
//! recorded error is guaranteed to be accurate; recovery after it is not.


use crate::ast::{Block, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::lexer::{tokenize, Token};
use thiserror::Error;

/// Parse error. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {got} instead")]
    UnexpectedToken { expected: String, got: String },

    #[error("no prefix parse function for {0} found")]
    NoPrefixParse(String),

    #[error("cannot use two underscores")]
    TwoUnderscores,

    #[error("cannot use underscore as a variable identifier")]
    UnderscoreIdentifier,
}

/// Binding power, lowest to highest. Declaration order is the comparison
/// order used by the expression loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Logic,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(token: &Token) -> Precedence {
    match token {
        Token::And | Token::Or => Precedence::Logic,
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Star | Token::Slash | Token::Percent => Precedence::Product,
        Token::LParen => Precedence::Call,
        Token::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Tokenize and parse source text.
///
/// Always returns a program; callers must check the error list before
/// trusting it.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokenize(source));
    let program = parser.parse_program();
    (program, parser.errors)
}

/// Pratt parser state: token cursor plus accumulated errors.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last() != Some(&Token::Eof) {
            tokens.push(Token::Eof);
        }
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn cur_is(&self, token: &Token) -> bool {
        self.cur() == token
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn cur_precedence(&self) -> Precedence {
        precedence_of(self.cur())
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek())
    }

    /// Advance if the peek token matches, otherwise record an error.
    fn expect_peek(&mut self, expected: &Token) -> bool {
        if self.peek_is(expected) {
            self.advance();
            true
        } else {
            self.errors.push(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: self.peek().to_string(),
            });
            false
        }
    }

    /// Advance onto an identifier and return its name.
    fn expect_peek_ident(&mut self) -> Option<String> {
        if let Token::Ident(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            self.errors.push(ParseError::UnexpectedToken {
                expected: "an identifier".to_string(),
                got: self.peek().to_string(),
            });
            None
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.cur_is(&Token::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.advance();
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur() {
            Token::Let => self.parse_let_statement(false),
            Token::Const => self.parse_let_statement(true),
            Token::Return => self.parse_return_statement(),
            Token::Break => {
                self.skip_optional_semi();
                Some(Stmt::Break)
            }
            Token::Skip => {
                self.skip_optional_semi();
                Some(Stmt::Skip)
            }
            Token::For => self.parse_for_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn skip_optional_semi(&mut self) {
        if self.peek_is(&Token::Semi) {
            self.advance();
        }
    }

    fn parse_let_statement(&mut self, constant: bool) -> Option<Stmt> {
        let name = self.expect_peek_ident()?;
        if name == "_" {
            self.errors.push(ParseError::UnderscoreIdentifier);
            return None;
        }
        if !self.expect_peek(&Token::Assign) {
            return None;
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semi();
        Some(Stmt::Let {
            name,
            value,
            constant,
        })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        // Bare `return` before ';', '}' or end of input returns null.
        if self.peek_is(&Token::Semi) {
            self.advance();
            return Some(Stmt::Return(None));
        }
        if self.peek_is(&Token::RBrace) || self.peek_is(&Token::Eof) {
            return Some(Stmt::Return(None));
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semi();
        Some(Stmt::Return(Some(value)))
    }

    /// `for <idx-or-_>, <value> in <expr>: { ... }`
    ///
    /// The index identifier is optional (a name or `_` to discard it); the
    /// value identifier is mandatory and may not be `_`.
    fn parse_for_statement(&mut self) -> Option<Stmt> {
        let first = self.expect_peek_ident()?;

        let (index, value) = if self.peek_is(&Token::Comma) {
            self.advance();
            let second = self.expect_peek_ident()?;
            if first == "_" && second == "_" {
                self.errors.push(ParseError::TwoUnderscores);
                return None;
            }
            if second == "_" {
                self.errors.push(ParseError::UnderscoreIdentifier);
                return None;
            }
            let index = if first == "_" { None } else { Some(first) };
            (index, second)
        } else {
            if first == "_" {
                self.errors.push(ParseError::UnderscoreIdentifier);
                return None;
            }
            (None, first)
        };

        if !self.expect_peek(&Token::In) {
            return None;
        }
        self.advance();
        let iterable = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(&Token::Colon) || !self.expect_peek(&Token::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        self.skip_optional_semi();

        Some(Stmt::For {
            index,
            value,
            iterable,
            body,
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semi();
        Some(Stmt::Expression(expr))
    }

    fn parse_expression(&mut self, min_precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(&Token::Semi) && min_precedence < self.peek_precedence() {
            self.advance();
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur().clone() {
            Token::Int(n) => Some(Expr::Int(n)),
            Token::Float(x) => Some(Expr::Float(x)),
            Token::Str(s) => Some(Expr::Str(s)),
            Token::True => Some(Expr::Bool(true)),
            Token::False => Some(Expr::Bool(false)),
            Token::Ident(name) => self.parse_identifier(name),
            Token::Bang => self.parse_prefix_op(PrefixOp::Bang),
            Token::Minus => self.parse_prefix_op(PrefixOp::Minus),
            Token::LParen => self.parse_grouped(),
            Token::If => self.parse_if(),
            Token::During => self.parse_during(),
            Token::Fun => self.parse_function(),
            Token::LBracket => {
                let elements = self.parse_expression_list(&Token::RBracket)?;
                Some(Expr::Array(elements))
            }
            Token::LBrace => self.parse_hash(),
            other => {
                self.errors.push(ParseError::NoPrefixParse(other.to_string()));
                None
            }
        }
    }

    /// An identifier immediately followed by `=` is an assignment
    /// expression, not a comparison.
    fn parse_identifier(&mut self, name: String) -> Option<Expr> {
        if name == "_" {
            self.errors.push(ParseError::UnderscoreIdentifier);
            return None;
        }
        if self.peek_is(&Token::Assign) {
            self.advance();
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            return Some(Expr::Assign {
                name,
                value: Box::new(value),
            });
        }
        Some(Expr::Ident(name))
    }

    fn parse_prefix_op(&mut self, op: PrefixOp) -> Option<Expr> {
        self.advance();
        let operand = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_grouped(&mut self) -> Option<Expr> {
        self.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(&Token::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_if(&mut self) -> Option<Expr> {
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(&Token::Colon) || !self.expect_peek(&Token::LBrace) {
            return None;
        }
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(&Token::Else) {
            self.advance();
            if !self.expect_peek(&Token::Colon) || !self.expect_peek(&Token::LBrace) {
                return None;
            }
            Some(self.parse_block()?)
        } else {
            None
        };

        Some(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_during(&mut self) -> Option<Expr> {
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(&Token::Colon) || !self.expect_peek(&Token::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        Some(Expr::During {
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_function(&mut self) -> Option<Expr> {
        if !self.expect_peek(&Token::LParen) {
            return None;
        }
        let params = self.parse_parameters()?;
        if !self.expect_peek(&Token::Colon) || !self.expect_peek(&Token::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        Some(Expr::Function { params, body })
    }

    fn parse_parameters(&mut self) -> Option<Vec<String>> {
        let mut params = Vec::new();
        if self.peek_is(&Token::RParen) {
            self.advance();
            return Some(params);
        }

        let first = self.expect_peek_ident()?;
        if first == "_" {
            self.errors.push(ParseError::UnderscoreIdentifier);
            return None;
        }
        params.push(first);

        while self.peek_is(&Token::Comma) {
            self.advance();
            let name = self.expect_peek_ident()?;
            if name == "_" {
                self.errors.push(ParseError::UnderscoreIdentifier);
                return None;
            }
            params.push(name);
        }

        if !self.expect_peek(&Token::RParen) {
            return None;
        }
        Some(params)
    }

    /// Statements up to the matching `}`. The cursor sits on `{` on entry
    /// and on `}` on success. A missing `}` is an error, not truncation.
    fn parse_block(&mut self) -> Option<Block> {
        let mut statements = Vec::new();
        self.advance();
        while !self.cur_is(&Token::RBrace) {
            if self.cur_is(&Token::Eof) {
                self.errors.push(ParseError::UnexpectedToken {
                    expected: Token::RBrace.to_string(),
                    got: Token::Eof.to_string(),
                });
                return None;
            }
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.advance();
        }
        Some(Block { statements })
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        let op = match self.cur() {
            Token::Plus => InfixOp::Plus,
            Token::Minus => InfixOp::Minus,
            Token::Star => InfixOp::Star,
            Token::Slash => InfixOp::Slash,
            Token::Percent => InfixOp::Percent,
            Token::Eq => InfixOp::Eq,
            Token::NotEq => InfixOp::NotEq,
            Token::Lt => InfixOp::Lt,
            Token::Gt => InfixOp::Gt,
            Token::And => InfixOp::And,
            Token::Or => InfixOp::Or,
            Token::LParen => return self.parse_call(left),
            Token::LBracket => return self.parse_index(left),
            other => {
                self.errors.push(ParseError::NoPrefixParse(other.to_string()));
                return None;
            }
        };

        // Left-associative: the right-hand side binds at this operator's
        // own precedence.
        let precedence = self.cur_precedence();
        self.advance();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_call(&mut self, callee: Expr) -> Option<Expr> {
        let args = self.parse_expression_list(&Token::RParen)?;
        Some(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    /// `left[index]`, continued into `left[index] = value` when the next
    /// token is `=`. Read and assignment share one node shape.
    fn parse_index(&mut self, left: Expr) -> Option<Expr> {
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(&Token::RBracket) {
            return None;
        }

        let value = if self.peek_is(&Token::Assign) {
            self.advance();
            self.advance();
            Some(Box::new(self.parse_expression(Precedence::Lowest)?))
        } else {
            None
        };

        Some(Expr::Index {
            left: Box::new(left),
            index: Box::new(index),
            value,
        })
    }

    fn parse_expression_list(&mut self, end: &Token) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        if self.peek_is(end) {
            self.advance();
            return Some(list);
        }

        self.advance();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(&Token::Comma) {
            self.advance();
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    fn parse_hash(&mut self) -> Option<Expr> {
        let mut pairs = Vec::new();
        while !self.peek_is(&Token::RBrace) {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(&Token::Colon) {
                return None;
            }
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(&Token::RBrace) && !self.expect_peek(&Token::Comma) {
                return None;
            }
        }
        self.advance();
        Some(Expr::Hash(pairs))
    }
}
