//! Buffered stream of tokens for look ahead.
use crate::{
    lex::{LexError, Lexer, LexerIter},
    tokens::{Keyword, Span, Token, TokenKind},
};

use itertools::{multipeek, MultiPeek};
use smol_str::SmolStr;
use std::{error, fmt, slice::SliceIndex};

/// Buffered stream of tokens that allows arbitrary look ahead.
///
/// Tokens are lazily lexed. Peeking or consuming the next token
/// triggers the internal lexer.
///
/// The peek semantics are determined by the internal `MultiPeek`.
/// Calling `TokenStream::peek` is not idempotent, advancing a peek
/// cursor forward by one token for each `peek()` call. The cursor
/// can be reset explicitly using `TokenStream::reset_peek` or
/// implicitly by calling one of the consuming methods.
pub struct TokenStream<'a> {
    lexer: MultiPeek<LexerIter<'a>>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    source: &'a str,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            source: lexer.source_code(),
            lexer: multipeek(lexer),
        }
    }

    /// Slice a fragment of source code.
    ///
    /// Returns `None` if the given index is out
    /// of bounds.
    #[inline]
    pub fn fragment<I>(&self, index: I) -> Option<&'a str>
    where
        I: SliceIndex<str, Output = str>,
    {
        self.source.get(index)
    }

    /// Helper function to extract the span's string fragment
    /// from the original source code.
    #[inline]
    pub fn span_fragment(&self, span: &Span) -> &'a str {
        span.fragment(self.source)
    }

    /// Consumes the current token regardless of type.
    ///
    /// Returns `None` when the cursor is past the end of the token stream.
    #[inline]
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        self.lexer.next()
    }

    /// Consumes the current token if it matches the given token kind.
    ///
    /// Returns true when matched. Returns false when token kinds
    /// do not match, or the token stream is at the end.
    ///
    /// Does not consume the token if the kinds do not match.
    pub fn match_token(&mut self, token_kind: TokenKind) -> bool {
        // Ensure clean peek state.
        self.lexer.reset_peek();

        match self.lexer.peek() {
            Some(Ok(token)) => {
                let is_match = token.kind == token_kind;
                if is_match {
                    self.lexer.next();
                }
                self.lexer.reset_peek();
                is_match
            }
            _ => {
                self.lexer.reset_peek();
                false
            }
        }
    }

    /// Return the current token and advance the cursor.
    ///
    /// The consumed token must match the given token kind, otherwise
    /// an error is returned and the cursor is not advanced.
    pub fn consume(&mut self, token_kind: TokenKind) -> Result<Token, TokenError> {
        // Ensure clean peek state.
        self.lexer.reset_peek();

        // We should not consume the token if the kinds don't match.
        match self.lexer.peek() {
            Some(Ok(token)) => {
                if token.kind != token_kind {
                    Err(TokenError::Mismatch {
                        expected: token_kind,
                        encountered: token.kind,
                    })
                } else {
                    self.lexer
                        .next()
                        .ok_or(TokenError::EndOfSource)?
                        .map_err(TokenError::Lex)
                }
            }
            Some(Err(err)) => Err(TokenError::Lex(err.clone())),
            None => Err(TokenError::EndOfSource),
        }
    }

    /// Consume the current token, which must be the given reserved word.
    #[inline]
    pub fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, TokenError> {
        self.consume(TokenKind::Keyword(keyword))
    }

    /// Consume an identifier token and return it along with its name.
    pub fn consume_ident(&mut self) -> Result<(Token, SmolStr), TokenError> {
        let token = self.consume(TokenKind::Ident)?;
        let name = SmolStr::new(self.span_fragment(&token.span));
        Ok((token, name))
    }

    /// Return the current token without advancing the cursor.
    ///
    /// This call advances the peek cursor. Subsequent calls will look
    /// ahead by one token each call.
    #[inline]
    pub fn peek(&mut self) -> Result<&Token, TokenError> {
        match self.lexer.peek() {
            Some(result) => result.as_ref().map_err(|err| TokenError::Lex(err.clone())),
            None => Err(TokenError::EndOfSource),
        }
    }

    /// Return the current token kind without advancing the cursor.
    ///
    /// Resets the peek cursor first, so this is always the kind of
    /// the very next token.
    #[inline]
    pub fn peek_kind(&mut self) -> Result<TokenKind, TokenError> {
        self.reset_peek();
        self.peek().map(|token| token.kind)
    }

    /// Set peek cursor back to the current cursor.
    #[inline]
    pub fn reset_peek(&mut self) {
        self.lexer.reset_peek()
    }
}

/// Error returned when an unexpected token type is encountered.
#[derive(Debug)]
pub enum TokenError {
    Mismatch {
        expected: TokenKind,
        encountered: TokenKind,
    },
    EndOfSource,
    Lex(LexError),
}

impl error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenError as E;
        match self {
            E::Mismatch {
                expected,
                encountered,
            } => write!(
                f,
                "encountered unexpected token '{}', expected '{}'",
                encountered, expected
            ),
            E::EndOfSource => write!(f, "unexpected end of source code"),
            E::Lex(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<LexError> for TokenError {
    fn from(err: LexError) -> Self {
        TokenError::Lex(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::TokenKind as TK;

    #[test]
    fn test_stream_consume() {
        let lexer = Lexer::new("let x;");
        let mut stream = TokenStream::new(lexer);

        stream.consume_keyword(Keyword::Let).expect("let");
        let (_, name) = stream.consume_ident().expect("ident");
        assert_eq!(name, "x");
        stream.consume(TK::Semicolon).expect("semicolon");
        assert_eq!(stream.peek_kind().expect("eof"), TK::Eof);
    }

    #[test]
    fn test_stream_mismatch_does_not_advance() {
        let lexer = Lexer::new("let");
        let mut stream = TokenStream::new(lexer);

        let err = stream.consume(TK::Ident).expect_err("should not match");
        assert!(matches!(
            err,
            TokenError::Mismatch {
                expected: TK::Ident,
                encountered: TK::Keyword(Keyword::Let),
            }
        ));

        // The keyword is still there.
        stream.consume_keyword(Keyword::Let).expect("let");
    }

    #[test]
    fn test_stream_lookahead() {
        let lexer = Lexer::new("foo.bar()");
        let mut stream = TokenStream::new(lexer);

        stream.reset_peek();
        assert_eq!(stream.peek().expect("peek 1").kind, TK::Ident);
        assert_eq!(stream.peek().expect("peek 2").kind, TK::Dot);
        stream.reset_peek();

        // Peeking did not consume anything.
        let (_, name) = stream.consume_ident().expect("ident");
        assert_eq!(name, "foo");
    }
}
