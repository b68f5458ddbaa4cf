// crates/manifest-script/src/parser.rs
// ============================================================================
// Module: Script Parser
// Description: Recursive-descent parser for the embedded-script dialect.
// Purpose: Build a closed syntax tree and reject constructs outside the grammar.
// Dependencies: crate::{ast, error, lexer}
// ============================================================================

//! ## Overview
//! The parser accepts statements, method calls with optional blocks,
//! attribute and constant assignment, namespaces, arrays, and interpolated
//! strings. Operators, control flow, and literal forms the interpreter cannot
//! run are rejected while parsing as evaluation failures, so a script using
//! them never reaches the interpreter. Genuinely malformed input (unbalanced
//! `end`, unterminated strings) is reported as a syntax failure.
//! Security posture: script input is untrusted; nesting and size are bounded.

use crate::ast::Block;
use crate::ast::Call;
use crate::ast::Expression;
use crate::ast::Program;
use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::ast::StrSegment;
use crate::error::ScriptError;
use crate::error::ScriptResult;
use crate::lexer::Keyword;
use crate::lexer::Lexer;
use crate::lexer::SpannedToken;
use crate::lexer::StrPart;
use crate::lexer::Token;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed script input size in bytes.
pub const MAX_SCRIPT_INPUT_BYTES: usize = 1024 * 1024;
/// Maximum supported nesting depth for blocks, arrays, and interpolation.
const MAX_SCRIPT_NESTING: usize = 32;

/// Identifiers that open control flow or definitions the interpreter refuses.
const CONTROL_WORDS: &[&str] = &[
    "if", "unless", "while", "until", "case", "begin", "def", "for", "loop", "lambda", "proc",
    "return", "yield", "rescue", "ensure", "self", "eval",
];

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Parses script source into a [`Program`].
///
/// # Errors
///
/// Returns [`ScriptError`] for oversized input, lexer failures, syntax
/// errors, and unsupported constructs. Errors carry a line but no path.
pub fn parse_program(source: &str) -> ScriptResult<Program> {
    if source.len() > MAX_SCRIPT_INPUT_BYTES {
        return Err(ScriptError::syntax(
            format!(
                "script exceeds size limit: {} bytes (max {MAX_SCRIPT_INPUT_BYTES})",
                source.len()
            ),
            0,
        ));
    }
    let tokens = Lexer::new(source, 1).lex()?;
    let mut parser = Parser::new(tokens, 0);
    let statements = parser.parse_statements(Terminator::EndOfInput)?;
    Ok(Program {
        statements,
    })
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Token that closes the statement list being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// End of the whole input.
    EndOfInput,
    /// `end` keyword.
    End,
    /// `}` closing a brace block.
    Brace,
}

/// Recursive-descent parser over a token stream.
struct Parser<'a> {
    /// Token stream with source lines.
    tokens: Vec<SpannedToken<'a>>,
    /// Current token index.
    index: usize,
    /// Current nesting depth.
    nesting: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser starting at the given nesting depth.
    const fn new(tokens: Vec<SpannedToken<'a>>, nesting: usize) -> Self {
        Self {
            tokens,
            index: 0,
            nesting,
        }
    }

    /// Parses statements until the terminator is reached (not consumed).
    fn parse_statements(&mut self, terminator: Terminator) -> ScriptResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_terminator(terminator)? {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
            if matches!(self.current().token, Token::Newline) {
                self.advance();
            } else if !self.at_terminator(terminator)? {
                return Err(self.unexpected("end of statement"));
            }
        }
    }

    /// Returns true when the current token closes the statement list.
    fn at_terminator(&self, terminator: Terminator) -> ScriptResult<bool> {
        let token = &self.current().token;
        let closes = match terminator {
            Terminator::EndOfInput => matches!(token, Token::Eof),
            Terminator::End => matches!(token, Token::Keyword(Keyword::End)),
            Terminator::Brace => matches!(token, Token::RBrace),
        };
        if closes {
            return Ok(true);
        }
        match token {
            Token::Eof => Err(self.unexpected(match terminator {
                Terminator::Brace => "`}'",
                Terminator::End | Terminator::EndOfInput => "`end'",
            })),
            Token::Keyword(Keyword::End) | Token::RBrace => {
                Err(self.unexpected("end-of-input"))
            }
            _ => Ok(false),
        }
    }

    /// Parses a single statement.
    fn parse_statement(&mut self) -> ScriptResult<Statement> {
        let line = self.current().line;
        if let Token::Keyword(Keyword::Module | Keyword::Class) = self.current().token {
            self.advance();
            return self.parse_namespace(line);
        }

        let expression = self.parse_expression()?;
        if !matches!(self.current().token, Token::Assign) {
            return Ok(Statement {
                kind: StatementKind::Expression(expression),
                line,
            });
        }
        self.advance();
        self.skip_newlines();
        let value = self.parse_expression()?;
        let kind = match expression {
            Expression::Constant(path) => StatementKind::ConstantAssign {
                path,
                value,
            },
            Expression::Call(call) if !call.has_args && call.block.is_none() => {
                let Call {
                    receiver,
                    method,
                    ..
                } = *call;
                match receiver {
                    Some(receiver) => StatementKind::AttributeAssign {
                        receiver,
                        attribute: method,
                        value,
                    },
                    None => StatementKind::LocalAssign {
                        name: method,
                        value,
                    },
                }
            }
            _ => return Err(ScriptError::syntax("syntax error, unexpected '='", line)),
        };
        Ok(Statement {
            kind,
            line,
        })
    }

    /// Parses `module A::B ... end` after the keyword.
    fn parse_namespace(&mut self, line: usize) -> ScriptResult<Statement> {
        let path = match self.current().token {
            Token::Constant(_) => self.parse_constant_path(),
            _ => return Err(self.unexpected("constant name")),
        };
        if let Token::Unsupported(op) = self.current().token {
            return Err(ScriptError::evaluation(
                format!("unsupported construct `{op}` in namespace declaration"),
                self.current().line,
            ));
        }
        let body = self.with_nesting(line, |parser| {
            let body = parser.parse_statements(Terminator::End)?;
            parser.expect_keyword(Keyword::End)?;
            Ok(body)
        })?;
        Ok(Statement {
            kind: StatementKind::Namespace {
                path,
                body,
            },
            line,
        })
    }

    /// Parses an expression with trailing method calls.
    fn parse_expression(&mut self) -> ScriptResult<Expression> {
        let mut expression = self.parse_primary()?;
        loop {
            let SpannedToken {
                token,
                line,
            } = self.current().clone();
            match token {
                Token::Dot => {
                    self.advance();
                    self.skip_newlines();
                    let Token::Ident(method) = self.current().token else {
                        return Err(self.unexpected("method name"));
                    };
                    let method_line = self.current().line;
                    self.advance();
                    expression = self.parse_call(Some(expression), method, method_line)?;
                }
                Token::LBracket => {
                    return Err(ScriptError::evaluation(
                        "unsupported construct `[]` (index access)",
                        line,
                    ));
                }
                Token::Unsupported(op) => {
                    return Err(ScriptError::evaluation(
                        format!("unsupported operator `{op}`"),
                        line,
                    ));
                }
                Token::Ident(word) if CONTROL_WORDS.contains(&word) => {
                    return Err(ScriptError::evaluation(
                        format!("unsupported construct `{word}`"),
                        line,
                    ));
                }
                _ => return Ok(expression),
            }
        }
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> ScriptResult<Expression> {
        let SpannedToken {
            token,
            line,
        } = self.current().clone();
        match token {
            Token::Str(parts) => {
                self.advance();
                self.parse_string(parts)
            }
            Token::Number(raw) => {
                self.advance();
                Ok(Expression::Number(raw.to_string()))
            }
            Token::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Expression::Nil)
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            Token::LBracket => {
                self.advance();
                self.with_nesting(line, |parser| {
                    let items = parser.parse_list(|token| matches!(token, Token::RBracket))?;
                    parser.expect(&Token::RBracket, "']'")?;
                    Ok(Expression::Array(items))
                })
            }
            Token::LParen => {
                self.advance();
                self.with_nesting(line, |parser| {
                    parser.skip_newlines();
                    let inner = parser.parse_expression()?;
                    parser.skip_newlines();
                    parser.expect(&Token::RParen, "')'")?;
                    Ok(inner)
                })
            }
            Token::Constant(_) => Ok(Expression::Constant(self.parse_constant_path())),
            Token::Ident(word) if CONTROL_WORDS.contains(&word) => Err(ScriptError::evaluation(
                format!("unsupported construct `{word}`"),
                line,
            )),
            Token::Ident(name) => {
                self.advance();
                self.parse_call(None, name, line)
            }
            Token::LBrace => {
                Err(ScriptError::evaluation("unsupported construct `{}` (hash literal)", line))
            }
            Token::Unsupported(op) => {
                Err(ScriptError::evaluation(format!("unsupported operator `{op}`"), line))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parses call arguments and an optional block after a method name.
    fn parse_call(
        &mut self,
        receiver: Option<Expression>,
        method: &str,
        line: usize,
    ) -> ScriptResult<Expression> {
        let mut args = Vec::new();
        let mut has_args = false;
        match &self.current().token {
            Token::LParen if self.current().line == line => {
                self.advance();
                has_args = true;
                args = self.with_nesting(line, |parser| {
                    let args = parser.parse_list(|token| matches!(token, Token::RParen))?;
                    parser.expect(&Token::RParen, "')'")?;
                    Ok(args)
                })?;
            }
            token if self.current().line == line && starts_argument(token) => {
                has_args = true;
                args.push(self.parse_expression()?);
                while matches!(self.current().token, Token::Comma) {
                    self.advance();
                    self.skip_newlines();
                    args.push(self.parse_expression()?);
                }
            }
            _ => {}
        }

        let block = match self.current().token {
            Token::Keyword(Keyword::Do) => Some(self.parse_block(Terminator::End)?),
            Token::LBrace if self.current().line == line => {
                Some(self.parse_block(Terminator::Brace)?)
            }
            _ => None,
        };

        Ok(Expression::Call(Box::new(Call {
            receiver,
            method: method.to_string(),
            args,
            has_args,
            block,
            line,
        })))
    }

    /// Parses a block opened by `do` or `{`.
    fn parse_block(&mut self, terminator: Terminator) -> ScriptResult<Block> {
        let line = self.current().line;
        self.advance();
        self.with_nesting(line, |parser| {
            let mut params = Vec::new();
            if matches!(parser.current().token, Token::Pipe) {
                parser.advance();
                loop {
                    let Token::Ident(name) = parser.current().token else {
                        return Err(parser.unexpected("block parameter"));
                    };
                    params.push(name.to_string());
                    parser.advance();
                    if matches!(parser.current().token, Token::Comma) {
                        parser.advance();
                        continue;
                    }
                    parser.expect(&Token::Pipe, "'|'")?;
                    break;
                }
            }
            let body = parser.parse_statements(terminator)?;
            match terminator {
                Terminator::Brace => parser.expect(&Token::RBrace, "'}'")?,
                Terminator::End | Terminator::EndOfInput => {
                    parser.expect_keyword(Keyword::End)?;
                }
            }
            Ok(Block {
                params,
                body,
                line,
            })
        })
    }

    /// Parses a comma-separated list up to (not including) the closing token.
    fn parse_list(&mut self, closes: fn(&Token<'_>) -> bool) -> ScriptResult<Vec<Expression>> {
        let mut items = Vec::new();
        self.skip_newlines();
        if closes(&self.current().token) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if matches!(self.current().token, Token::Comma) {
                self.advance();
                self.skip_newlines();
                if closes(&self.current().token) {
                    return Ok(items);
                }
                continue;
            }
            return Ok(items);
        }
    }

    /// Parses `A::B::C` starting at a constant token.
    fn parse_constant_path(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        while let Token::Constant(name) = self.current().token {
            path.push(name.to_string());
            self.advance();
            let next_is_constant = matches!(
                self.tokens.get(self.index + 1).map(|t| &t.token),
                Some(Token::Constant(_))
            );
            if matches!(self.current().token, Token::ColonColon) && next_is_constant {
                self.advance();
            } else {
                break;
            }
        }
        path
    }

    /// Converts lexed string parts into segments, parsing interpolations.
    fn parse_string(&self, parts: Vec<StrPart>) -> ScriptResult<Expression> {
        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                StrPart::Text(text) => segments.push(StrSegment::Text(text)),
                StrPart::Interpolation {
                    source,
                    line,
                } => {
                    let next_depth = self.nesting + 1;
                    if next_depth > MAX_SCRIPT_NESTING {
                        return Err(nesting_error(line));
                    }
                    let tokens = Lexer::new(&source, line).lex()?;
                    let mut inner = Parser::new(tokens, next_depth);
                    inner.skip_newlines();
                    let expression = inner.parse_expression()?;
                    inner.skip_newlines();
                    inner.expect(&Token::Eof, "'}'")?;
                    segments.push(StrSegment::Interpolated(expression));
                }
            }
        }
        Ok(Expression::Str(segments))
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        line: usize,
        f: impl FnOnce(&mut Self) -> ScriptResult<T>,
    ) -> ScriptResult<T> {
        let next_depth = self.nesting + 1;
        if next_depth > MAX_SCRIPT_NESTING {
            return Err(nesting_error(line));
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns a syntax error.
    fn expect(&mut self, token: &Token<'_>, expected: &str) -> ScriptResult<()> {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consumes the expected keyword or returns a syntax error.
    fn expect_keyword(&mut self, keyword: Keyword) -> ScriptResult<()> {
        if self.current().token == Token::Keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("`end'"))
        }
    }

    /// Skips statement separators.
    fn skip_newlines(&mut self) {
        while matches!(self.current().token, Token::Newline) {
            self.advance();
        }
    }

    /// Builds a syntax error for the current token.
    fn unexpected(&self, expected: &str) -> ScriptError {
        ScriptError::syntax(
            format!("syntax error, unexpected {}, expecting {expected}", self.describe_current()),
            self.current().line,
        )
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'a> {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        match &self.current().token {
            Token::Ident(name) => format!("local variable or method `{name}'"),
            Token::Constant(name) => format!("constant `{name}'"),
            Token::Number(raw) => format!("integer literal `{raw}'"),
            Token::Str(_) => "string literal".to_string(),
            Token::Keyword(keyword) => format!("`{}'", keyword_text(*keyword)),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Assign => "'='".to_string(),
            Token::ColonColon => "'::'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Newline => "end of line".to_string(),
            Token::Unsupported(op) => format!("'{op}'"),
            Token::Eof => "end-of-input".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the token can begin a parenthesis-free argument.
const fn starts_argument(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Str(_)
            | Token::Number(_)
            | Token::Constant(_)
            | Token::Ident(_)
            | Token::LBracket
            | Token::Keyword(Keyword::Nil | Keyword::True | Keyword::False)
    )
}

/// Returns the source spelling of a keyword.
const fn keyword_text(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::Do => "do",
        Keyword::End => "end",
        Keyword::Module => "module",
        Keyword::Class => "class",
        Keyword::Nil => "nil",
        Keyword::True => "true",
        Keyword::False => "false",
    }
}

/// Builds the nesting-limit error.
fn nesting_error(line: usize) -> ScriptError {
    ScriptError::syntax(format!("script nesting exceeds limit (max {MAX_SCRIPT_NESTING})"), line)
}
