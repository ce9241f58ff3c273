//! Tokens

use std::fmt;

#[derive(Debug, Clone)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum TokenKind {
    // ------------------------------------------------------------------------
    // Symbols
    LeftBrace,    // {
    RightBrace,   // }
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Dot,          // .
    Comma,        // ,
    Semicolon,    // ;
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Ampersand,    // &
    Pipe,         // |
    LessThan,     // <
    GreaterThan,  // >
    Equal,        // =
    Tilde,        // ~

    // ------------------------------------------------------------------------
    // Complex
    Ident,
    /// Reserved identifiers
    Keyword(Keyword),
    /// String literal, span includes the surrounding double quotes
    Str,
    /// Decimal integer literal
    Int,

    // ------------------------------------------------------------------------
    // Special
    /// Unsupported token which should be treated as an error, probably
    Unknown,
    /// End-of-file
    Eof,
}

impl TokenKind {
    /// Indicates whether the token is one of the fixed symbol characters.
    #[inline]
    pub fn is_symbol(&self) -> bool {
        use TokenKind as TK;
        matches!(
            self,
            TK::LeftBrace
                | TK::RightBrace
                | TK::LeftParen
                | TK::RightParen
                | TK::LeftBracket
                | TK::RightBracket
                | TK::Dot
                | TK::Comma
                | TK::Semicolon
                | TK::Plus
                | TK::Minus
                | TK::Star
                | TK::Slash
                | TK::Ampersand
                | TK::Pipe
                | TK::LessThan
                | TK::GreaterThan
                | TK::Equal
                | TK::Tilde
        )
    }

    /// Indicates whether the token can start a binary operator
    /// in an expression.
    #[inline]
    pub fn is_binary_op(&self) -> bool {
        use TokenKind as TK;
        matches!(
            self,
            TK::Plus
                | TK::Minus
                | TK::Star
                | TK::Slash
                | TK::Ampersand
                | TK::Pipe
                | TK::LessThan
                | TK::GreaterThan
                | TK::Equal
        )
    }
}

impl fmt::Display for TokenKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind as TK;
        match self {
            TK::LeftBrace    => write!(f, "{{"),
            TK::RightBrace   => write!(f, "}}"),
            TK::LeftParen    => write!(f, "("),
            TK::RightParen   => write!(f, ")"),
            TK::LeftBracket  => write!(f, "["),
            TK::RightBracket => write!(f, "]"),
            TK::Dot          => write!(f, "."),
            TK::Comma        => write!(f, ","),
            TK::Semicolon    => write!(f, ";"),
            TK::Plus         => write!(f, "+"),
            TK::Minus        => write!(f, "-"),
            TK::Star         => write!(f, "*"),
            TK::Slash        => write!(f, "/"),
            TK::Ampersand    => write!(f, "&"),
            TK::Pipe         => write!(f, "|"),
            TK::LessThan     => write!(f, "<"),
            TK::GreaterThan  => write!(f, ">"),
            TK::Equal        => write!(f, "="),
            TK::Tilde        => write!(f, "~"),
            TK::Ident        => write!(f, "identifier"),
            TK::Keyword(kw)  => write!(f, "{}", kw),
            TK::Str          => write!(f, "string constant"),
            TK::Int          => write!(f, "integer constant"),
            TK::Unknown      => write!(f, "unknown"),
            TK::Eof          => write!(f, "end-of-file"),
        }
    }
}

/// Reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        match text.as_ref() {
            "class"       => Some(Self::Class),
            "constructor" => Some(Self::Constructor),
            "function"    => Some(Self::Function),
            "method"      => Some(Self::Method),
            "field"       => Some(Self::Field),
            "static"      => Some(Self::Static),
            "var"         => Some(Self::Var),
            "int"         => Some(Self::Int),
            "char"        => Some(Self::Char),
            "boolean"     => Some(Self::Boolean),
            "void"        => Some(Self::Void),
            "true"        => Some(Self::True),
            "false"       => Some(Self::False),
            "null"        => Some(Self::Null),
            "this"        => Some(Self::This),
            "let"         => Some(Self::Let),
            "do"          => Some(Self::Do),
            "if"          => Some(Self::If),
            "else"        => Some(Self::Else),
            "while"       => Some(Self::While),
            "return"      => Some(Self::Return),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Class       => write!(f, "class"),
            Self::Constructor => write!(f, "constructor"),
            Self::Function    => write!(f, "function"),
            Self::Method      => write!(f, "method"),
            Self::Field       => write!(f, "field"),
            Self::Static      => write!(f, "static"),
            Self::Var         => write!(f, "var"),
            Self::Int         => write!(f, "int"),
            Self::Char        => write!(f, "char"),
            Self::Boolean     => write!(f, "boolean"),
            Self::Void        => write!(f, "void"),
            Self::True        => write!(f, "true"),
            Self::False       => write!(f, "false"),
            Self::Null        => write!(f, "null"),
            Self::This        => write!(f, "this"),
            Self::Let         => write!(f, "let"),
            Self::Do          => write!(f, "do"),
            Self::If          => write!(f, "if"),
            Self::Else        => write!(f, "else"),
            Self::While       => write!(f, "while"),
            Self::Return      => write!(f, "return"),
        }
    }
}

/// Chunk of source code, encoded as a starting byte position and size.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Span {
    pub index: u32,
    pub size: u32,
}

impl Span {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    #[inline]
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        &text[(self.index as usize)..(self.index as usize + self.size as usize)]
    }

    /// Ending index of the span, exclusive.
    #[inline]
    pub fn end(&self) -> u32 {
        self.index + self.size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_span_fragment() {
        const CODE: &str = "let x = 42;";

        let spans = &[
            Span::new(0, 3),  // let
            Span::new(4, 1),  // x
            Span::new(6, 1),  // =
            Span::new(8, 2),  // 42
            Span::new(10, 1), // ;
        ];

        assert_eq!(spans[0].fragment(CODE), "let");
        assert_eq!(spans[1].fragment(CODE), "x");
        assert_eq!(spans[2].fragment(CODE), "=");
        assert_eq!(spans[3].fragment(CODE), "42");
        assert_eq!(spans[4].fragment(CODE), ";");
    }

    #[test]
    fn test_keyword_parse() {
        assert_eq!(Keyword::parse("class"), Some(Keyword::Class));
        assert_eq!(Keyword::parse("while"), Some(Keyword::While));
        assert_eq!(Keyword::parse("classy"), None);
        assert_eq!(Keyword::parse("Class"), None);
    }
}
