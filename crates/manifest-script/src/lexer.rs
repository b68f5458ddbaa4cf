// crates/manifest-script/src/lexer.rs
// ============================================================================
// Module: Script Lexer
// Description: Tokenizer for the embedded-script manifest dialect.
// Purpose: Turn decoded source text into line-attributed tokens.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! The lexer recognizes the small token set the manifest grammar needs:
//! identifiers, constants, string literals (with escapes and `#{...}`
//! interpolation), brackets, and a handful of punctuation. Operators the
//! grammar does not support are surfaced as [`Token::Unsupported`] so the
//! parser can reject them as evaluation failures rather than syntax errors.

use crate::error::ScriptError;
use crate::error::ScriptResult;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Reserved words recognized by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    /// `do` block opener.
    Do,
    /// `end` block terminator.
    End,
    /// `module` namespace opener.
    Module,
    /// `class` namespace opener.
    Class,
    /// `nil` literal.
    Nil,
    /// `true` literal.
    True,
    /// `false` literal.
    False,
}

/// Piece of a string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StrPart {
    /// Literal text after escape processing.
    Text(String),
    /// Raw source of a `#{...}` interpolation.
    Interpolation {
        /// Source text between the braces.
        source: String,
        /// Line the interpolation starts on.
        line: usize,
    },
}

/// Lexer token produced from script input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Lower-case identifier (method or local name).
    Ident(&'a str),
    /// Capitalized identifier (constant name).
    Constant(&'a str),
    /// Integer or decimal literal.
    Number(&'a str),
    /// String literal.
    Str(Vec<StrPart>),
    /// Reserved word.
    Keyword(Keyword),
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `=`
    Assign,
    /// `::`
    ColonColon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `|`
    Pipe,
    /// Statement separator (newline or `;`).
    Newline,
    /// Operator or sigil outside the supported grammar.
    Unsupported(&'a str),
    /// End-of-input marker.
    Eof,
}

/// Token paired with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpannedToken<'a> {
    /// Token value.
    pub(crate) token: Token<'a>,
    /// 1-based line number.
    pub(crate) line: usize,
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Message reported when a string literal runs into the end of the input.
pub const UNTERMINATED_STRING: &str = "unterminated string meets end of file";

/// Lexer for manifest scripts.
pub(crate) struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
    /// Current 1-based line.
    line: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer whose first line is numbered `first_line`.
    pub(crate) const fn new(input: &'a str, first_line: usize) -> Self {
        Self {
            input,
            offset: 0,
            line: first_line,
        }
    }

    /// Lexes the input into a sequence of tokens ending in [`Token::Eof`].
    pub(crate) fn lex(&mut self) -> ScriptResult<Vec<SpannedToken<'a>>> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.offset += 1;
                }
                b'\\' if bytes.get(self.offset + 1) == Some(&b'\n') => {
                    self.offset += 2;
                    self.line += 1;
                }
                b'\n' | b';' => {
                    tokens.push(self.simple(Token::Newline));
                    if ch == b'\n' {
                        self.line += 1;
                    }
                    self.offset += 1;
                }
                b'#' => {
                    self.consume_while(bytes, |b| b != b'\n');
                }
                b'"' => {
                    let line = self.line;
                    self.offset += 1;
                    let parts = self.lex_double_quoted(bytes)?;
                    tokens.push(SpannedToken {
                        token: Token::Str(parts),
                        line,
                    });
                }
                b'\'' => {
                    let line = self.line;
                    self.offset += 1;
                    let text = self.lex_single_quoted(bytes)?;
                    tokens.push(SpannedToken {
                        token: Token::Str(vec![StrPart::Text(text)]),
                        line,
                    });
                }
                b'.' => self.push_simple(&mut tokens, Token::Dot),
                b',' => self.push_simple(&mut tokens, Token::Comma),
                b'(' => self.push_simple(&mut tokens, Token::LParen),
                b')' => self.push_simple(&mut tokens, Token::RParen),
                b'[' => self.push_simple(&mut tokens, Token::LBracket),
                b']' => self.push_simple(&mut tokens, Token::RBracket),
                b'{' => self.push_simple(&mut tokens, Token::LBrace),
                b'}' => self.push_simple(&mut tokens, Token::RBrace),
                b'=' => {
                    if matches!(bytes.get(self.offset + 1), Some(b'=' | b'~' | b'>')) {
                        self.push_unsupported(&mut tokens, 2);
                    } else {
                        self.push_simple(&mut tokens, Token::Assign);
                    }
                }
                b'|' => {
                    if bytes.get(self.offset + 1) == Some(&b'|') {
                        self.push_unsupported(&mut tokens, 2);
                    } else {
                        self.push_simple(&mut tokens, Token::Pipe);
                    }
                }
                b':' => {
                    if bytes.get(self.offset + 1) == Some(&b':') {
                        tokens.push(self.simple(Token::ColonColon));
                        self.offset += 2;
                    } else {
                        self.push_unsupported(&mut tokens, 1);
                    }
                }
                b'0' ..= b'9' => {
                    let start = self.offset;
                    self.consume_while(bytes, |b| b.is_ascii_digit() || b == b'_');
                    if bytes.get(self.offset) == Some(&b'.')
                        && bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit)
                    {
                        self.offset += 1;
                        self.consume_while(bytes, |b| b.is_ascii_digit() || b == b'_');
                    }
                    tokens.push(SpannedToken {
                        token: Token::Number(&self.input[start .. self.offset]),
                        line: self.line,
                    });
                }
                b'a' ..= b'z' | b'_' => {
                    let start = self.offset;
                    self.consume_identifier(bytes);
                    let slice = &self.input[start .. self.offset];
                    tokens.push(SpannedToken {
                        token: Self::keyword_or_ident(slice),
                        line: self.line,
                    });
                }
                b'A' ..= b'Z' => {
                    let start = self.offset;
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
                    tokens.push(SpannedToken {
                        token: Token::Constant(&self.input[start .. self.offset]),
                        line: self.line,
                    });
                }
                b'+' | b'-' | b'*' | b'/' | b'%' | b'<' | b'>' | b'!' | b'?' | b'&' | b'^'
                | b'~' | b'@' | b'$' | b'`' => {
                    self.push_unsupported(&mut tokens, 1);
                }
                _ => {
                    let found = self.input[self.offset ..].chars().next().unwrap_or('?');
                    return Err(ScriptError::syntax(
                        format!("invalid character `{found}` in manifest script"),
                        self.line,
                    ));
                }
            }
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            line: self.line,
        });
        Ok(tokens)
    }

    /// Builds a token at the current line.
    const fn simple(&self, token: Token<'a>) -> SpannedToken<'a> {
        SpannedToken {
            token,
            line: self.line,
        }
    }

    /// Pushes a single-byte token and advances past it.
    fn push_simple(&mut self, tokens: &mut Vec<SpannedToken<'a>>, token: Token<'a>) {
        tokens.push(self.simple(token));
        self.offset += 1;
    }

    /// Pushes an unsupported operator spanning `len` bytes.
    fn push_unsupported(&mut self, tokens: &mut Vec<SpannedToken<'a>>, len: usize) {
        let end = (self.offset + len).min(self.input.len());
        tokens.push(self.simple(Token::Unsupported(&self.input[self.offset .. end])));
        self.offset = end;
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    /// Consumes an identifier, including a trailing `?` or `!`.
    fn consume_identifier(&mut self, bytes: &[u8]) {
        self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
        if matches!(bytes.get(self.offset), Some(b'?' | b'!'))
            && bytes.get(self.offset + 1) != Some(&b'=')
        {
            self.offset += 1;
        }
    }

    /// Maps a slice to a keyword token or identifier token.
    fn keyword_or_ident(slice: &'a str) -> Token<'a> {
        match slice {
            "do" => Token::Keyword(Keyword::Do),
            "end" => Token::Keyword(Keyword::End),
            "module" => Token::Keyword(Keyword::Module),
            "class" => Token::Keyword(Keyword::Class),
            "nil" => Token::Keyword(Keyword::Nil),
            "true" => Token::Keyword(Keyword::True),
            "false" => Token::Keyword(Keyword::False),
            _ => Token::Ident(slice),
        }
    }

    /// Returns the line end-of-input is reported on: the last line that
    /// holds any text, ignoring a trailing newline.
    fn eof_line(&self) -> usize {
        if self.input.ends_with('\n') { self.line.saturating_sub(1).max(1) } else { self.line }
    }

    /// Lexes the body of a double-quoted string after the opening quote.
    fn lex_double_quoted(&mut self, bytes: &[u8]) -> ScriptResult<Vec<StrPart>> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut run_start = self.offset;

        loop {
            let Some(&b) = bytes.get(self.offset) else {
                return Err(ScriptError::syntax(UNTERMINATED_STRING, self.eof_line()));
            };
            match b {
                b'"' => {
                    text.push_str(&self.input[run_start .. self.offset]);
                    self.offset += 1;
                    break;
                }
                b'\\' => {
                    text.push_str(&self.input[run_start .. self.offset]);
                    self.offset += 1;
                    let Some(&escaped) = bytes.get(self.offset) else {
                        return Err(ScriptError::syntax(UNTERMINATED_STRING, self.eof_line()));
                    };
                    match escaped {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'r' => text.push('\r'),
                        b'0' => text.push('\0'),
                        b'e' => text.push('\u{1b}'),
                        b's' => text.push(' '),
                        b'\n' => self.line += 1,
                        _ => {
                            let ch = self.input[self.offset ..].chars().next().unwrap_or('\\');
                            text.push(ch);
                            self.offset += ch.len_utf8() - 1;
                        }
                    }
                    self.offset += 1;
                    run_start = self.offset;
                }
                b'#' if bytes.get(self.offset + 1) == Some(&b'{') => {
                    text.push_str(&self.input[run_start .. self.offset]);
                    if !text.is_empty() {
                        parts.push(StrPart::Text(std::mem::take(&mut text)));
                    }
                    let line = self.line;
                    self.offset += 2;
                    let start = self.offset;
                    let mut depth = 0usize;
                    loop {
                        match bytes.get(self.offset) {
                            None => {
                                return Err(ScriptError::syntax(
                                    UNTERMINATED_STRING,
                                    self.eof_line(),
                                ));
                            }
                            Some(&quote @ (b'"' | b'\'')) => self.skip_nested_quoted(bytes, quote)?,
                            Some(b'{') => depth += 1,
                            Some(b'}') if depth == 0 => break,
                            Some(b'}') => depth -= 1,
                            Some(b'\n') => self.line += 1,
                            Some(_) => {}
                        }
                        self.offset += 1;
                    }
                    parts.push(StrPart::Interpolation {
                        source: self.input[start .. self.offset].to_string(),
                        line,
                    });
                    self.offset += 1;
                    run_start = self.offset;
                }
                b'\n' => {
                    self.line += 1;
                    self.offset += 1;
                }
                _ => {
                    self.offset += 1;
                }
            }
        }

        if !text.is_empty() || parts.is_empty() {
            parts.push(StrPart::Text(text));
        }
        Ok(parts)
    }

    /// Lexes the body of a single-quoted string after the opening quote.
    /// Advances from an opening `quote` inside an interpolation to its
    /// closing quote, so braces within the literal are not counted.
    fn skip_nested_quoted(&mut self, bytes: &[u8], quote: u8) -> ScriptResult<()> {
        self.offset += 1;
        loop {
            match bytes.get(self.offset) {
                None => return Err(ScriptError::syntax(UNTERMINATED_STRING, self.eof_line())),
                Some(b'\\') => {
                    if bytes.get(self.offset + 1) == Some(&b'\n') {
                        self.line += 1;
                    }
                    self.offset += 2;
                    continue;
                }
                Some(&byte) if byte == quote => return Ok(()),
                Some(b'\n') => self.line += 1,
                Some(_) => {}
            }
            self.offset += 1;
        }
    }

    fn lex_single_quoted(&mut self, bytes: &[u8]) -> ScriptResult<String> {
        let mut text = String::new();
        let mut run_start = self.offset;

        loop {
            let Some(&b) = bytes.get(self.offset) else {
                return Err(ScriptError::syntax(UNTERMINATED_STRING, self.eof_line()));
            };
            match b {
                b'\'' => {
                    text.push_str(&self.input[run_start .. self.offset]);
                    self.offset += 1;
                    return Ok(text);
                }
                b'\\' if matches!(bytes.get(self.offset + 1), Some(b'\'' | b'\\')) => {
                    text.push_str(&self.input[run_start .. self.offset]);
                    text.push(char::from(bytes[self.offset + 1]));
                    self.offset += 2;
                    run_start = self.offset;
                }
                b'\n' => {
                    self.line += 1;
                    self.offset += 1;
                }
                _ => {
                    self.offset += 1;
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
