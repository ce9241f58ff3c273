//! Lexical analysis (tokenizer)
use crate::tokens::{Keyword, Span, Token, TokenKind};

use itertools::{multipeek, MultiPeek};
use std::{error, fmt, str::CharIndices};

/// Lexical analyzer.
///
/// Scans the source text forward character by character. Comments and
/// whitespace are consumed here and never reach the token stream.
pub struct Lexer<'a> {
    pub(crate) source: SourceText<'a>,
    /// Start absolute byte position of the current token
    /// in the source.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: 0,
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.source.original
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Whitespace and comments are skipped. When the source is exhausted
    /// an [`TokenKind::Eof`] token with a zero-sized span is returned.
    #[rustfmt::skip]
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        use TokenKind as TK;

        loop {
            self.source.reset_peek();

            let next_char = match self.source.next_char() {
                Some((_, c)) => c,
                None => {
                    self.start_token();
                    return Ok(self.make_token(TK::Eof));
                }
            };

            self.start_token();

            match next_char {
                ' ' | '\t' | '\r' | '\n' => continue,
                '{' => return Ok(self.make_token(TK::LeftBrace)),
                '}' => return Ok(self.make_token(TK::RightBrace)),
                '(' => return Ok(self.make_token(TK::LeftParen)),
                ')' => return Ok(self.make_token(TK::RightParen)),
                '[' => return Ok(self.make_token(TK::LeftBracket)),
                ']' => return Ok(self.make_token(TK::RightBracket)),
                '.' => return Ok(self.make_token(TK::Dot)),
                ',' => return Ok(self.make_token(TK::Comma)),
                ';' => return Ok(self.make_token(TK::Semicolon)),
                '+' => return Ok(self.make_token(TK::Plus)),
                '-' => return Ok(self.make_token(TK::Minus)),
                '*' => return Ok(self.make_token(TK::Star)),
                '&' => return Ok(self.make_token(TK::Ampersand)),
                '|' => return Ok(self.make_token(TK::Pipe)),
                '<' => return Ok(self.make_token(TK::LessThan)),
                '>' => return Ok(self.make_token(TK::GreaterThan)),
                '=' => return Ok(self.make_token(TK::Equal)),
                '~' => return Ok(self.make_token(TK::Tilde)),
                '/' => {
                    match self.source.peek_char() {
                        Some((_, '/')) => self.skip_line_comment(),
                        Some((_, '*')) => self.skip_block_comment()?,
                        _ => return Ok(self.make_token(TK::Slash)),
                    }
                }
                '"'               => return self.consume_string(),
                '0'..='9'         => return Ok(self.consume_number()),
                '_' | 'a'..='z'
                    | 'A'..='Z'   => return Ok(self.consume_ident()),
                ch => {
                    return Err(LexError::UnknownCharacter {
                        ch,
                        line: self.source.line(),
                    })
                }
            }
        }
    }

    /// Prime the lexer state for recording a new token.
    fn start_token(&mut self) {
        self.token_start = self.source.current.0;
    }

    fn make_token(&mut self, token_kind: TokenKind) -> Token {
        let span = Span::new(
            self.token_start as u32,
            (self.source.next_index - self.token_start) as u32,
        );

        Token {
            kind: token_kind,
            span,
        }
    }

    fn token_fragment(&self) -> &str {
        &self.source.original[self.token_start..self.source.next_index]
    }

    /// Consume the rest of the line after a `//` marker.
    ///
    /// The terminating newline is left in place for the main loop.
    fn skip_line_comment(&mut self) {
        self.source.next_char(); // second slash

        loop {
            self.source.reset_peek();
            match self.source.peek_char() {
                Some((_, '\n')) | None => return,
                Some(_) => {
                    self.source.next_char();
                }
            }
        }
    }

    /// Consume a `/* ... */` comment, which may span multiple lines.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let open_line = self.source.line();
        self.source.next_char(); // star

        loop {
            match self.source.next_char() {
                Some((_, '*')) => {
                    if let Some((_, '/')) = self.source.peek_char() {
                        self.source.next_char();
                        return Ok(());
                    }
                    self.source.reset_peek();
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedComment { line: open_line }),
            }
        }
    }

    /// Consume a string literal. The opening quote has already been eaten.
    ///
    /// The token span includes both quote characters. A string constant
    /// may not contain a newline; a quote without a matching closing
    /// quote on the same line is a fatal tokenization fault.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        loop {
            self.source.reset_peek();
            match self.source.peek_char() {
                Some((_, '"')) => {
                    self.source.next_char();
                    return Ok(self.make_token(TokenKind::Str));
                }
                Some((_, '\n')) | None => {
                    return Err(LexError::UnterminatedString {
                        line: self.source.line(),
                    })
                }
                Some(_) => {
                    self.source.next_char();
                }
            }
        }
    }

    fn consume_number(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, '0'..='9')) = self.source.peek_char() {
            self.source.next_char();
        }

        self.make_token(TokenKind::Int)
    }

    fn consume_ident(&mut self) -> Token {
        self.source.reset_peek();

        while let Some((_, c)) = self.source.peek_char() {
            match c {
                '_' | 'a'..='z' | 'A'..='Z' | '0'..='9' => {
                    self.source.next_char();
                }
                _ => break,
            }
        }

        // If a valid keyword can be parsed from the source fragment, then
        // the token is a reserved word instead of a user defined identifier.
        let token_kind = Keyword::parse(self.token_fragment())
            .map(TokenKind::Keyword)
            .unwrap_or(TokenKind::Ident);
        self.make_token(token_kind)
    }
}

impl<'a> IntoIterator for Lexer<'a> {
    type Item = Result<Token, LexError>;
    type IntoIter = LexerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        LexerIter {
            lexer: self,
            done: false,
        }
    }
}

/// Convenience iterator that wraps the lexer.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct LexerIter<'a> {
    // Track end so an Eof token is emitted once.
    done: bool,
    lexer: Lexer<'a>,
}

impl<'a> Iterator for LexerIter<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.lexer.next_token();
        if let Ok(token) = &result {
            if token.kind == TokenKind::Eof {
                self.done = true;
            }
        }
        Some(result)
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
pub(crate) struct SourceText<'a> {
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    pub(crate) original: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result. This is required
    /// because UTF-8 characters are variable in width. Indexing the string
    /// for individual bytes is possible, but impossible for encoded characters.
    ///
    /// An important semantic feature of `MultiPeek` is that peeking advances
    /// the internal peek cursor by 1. Each call will return the next element.
    /// The peek cursor offset is restored to 0 when calling `MultiPeek::next()`
    /// or `MultiPeek::reset_peek()`.
    source: MultiPeek<CharIndices<'a>>,

    /// Byte position in the source string of the current character.
    current: (usize, char),
    /// Byte position just past the current character.
    next_index: usize,
    current_line: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            source: multipeek(source.char_indices()),
            current: (0, '\0'),
            next_index: 0,
            current_line: 1,
        }
    }

    /// Number of bytes in source.
    fn byte_count(&self) -> usize {
        self.original.len()
    }

    /// Line number of the current character, 1-based.
    fn line(&self) -> usize {
        self.current_line
    }

    /// Advance the cursor and return the next position and character.
    fn next_char(&mut self) -> Option<(usize, char)> {
        if let Some((index, c)) = self.source.next() {
            if c == '\n' {
                self.current_line += 1;
            }
            self.current = (index, c);
            self.next_index = index + c.len_utf8();
            Some((index, c))
        } else {
            // Source code iterator has reached end-of-file.
            //
            // Set the current index to the size of the source
            // string. There is no end-of-file character, so
            // we just set it to the null-byte.
            self.current = (self.byte_count(), '\0');
            self.next_index = self.byte_count();
            None
        }
    }

    /// Peeks the next character in the stream.
    ///
    /// This call advances the peek cursor. Subsequent
    /// calls will look ahead by one character each call.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.source.peek().cloned()
    }

    /// Reset the stream peek cursor.
    fn reset_peek(&mut self) {
        self.source.reset_peek()
    }
}

#[derive(Debug, Clone)]
pub enum LexError {
    UnknownCharacter { ch: char, line: usize },
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexError::UnknownCharacter { ch, line } => {
                write!(f, "unknown character {:?} on line {}", ch, line)
            }
            LexError::UnterminatedString { line } => {
                write!(f, "unterminated string constant on line {}", line)
            }
            LexError::UnterminatedComment { line } => {
                write!(f, "unterminated block comment opened on line {}", line)
            }
        }
    }
}
