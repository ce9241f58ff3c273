//! Recursive-descent compilation engine.
//!
//! Compiles one class file into one VM program in a single forward pass.
//! Tokens are pulled on demand from the stream, declarations are recorded
//! in the symbol table as they are encountered, and instructions are
//! pushed to the writer as constructs are recognized. A consumed token is
//! never revisited; lookahead decisions use the stream's peek cursor only.
//!
//! There is no error recovery. A token stream that violates the grammar
//! aborts the compilation with the first fault.
use crate::{
    symbol_table::{Symbol, SymbolKind, SymbolTable},
    token_stream::{TokenError, TokenStream},
    tokens::{Keyword, TokenKind},
    vm::{Segment, VmCommand, VmWriter},
};

use log::debug;
use smol_str::SmolStr;
use std::{error, fmt, io};

pub struct CompilationEngine<'a, W: io::Write> {
    tokens: TokenStream<'a>,
    writer: VmWriter<W>,
    symbols: SymbolTable,
    class_name: SmolStr,
    /// Monotonic counter keeping generated branch labels unique
    /// within the class.
    label_count: u32,
}

impl<'a, W: io::Write> CompilationEngine<'a, W> {
    pub fn new(tokens: TokenStream<'a>, writer: VmWriter<W>) -> Self {
        Self {
            tokens,
            writer,
            symbols: SymbolTable::new(),
            class_name: SmolStr::default(),
            label_count: 0,
        }
    }

    /// Compile a whole class: `'class' className '{' classVarDec*
    /// subroutineDec* '}'`.
    ///
    /// Consumes the engine, so it cannot be re-invoked on the same
    /// instance. On success the flushed output sink is returned.
    pub fn compile_class(mut self) -> Result<W, CompileError> {
        self.tokens.consume_keyword(Keyword::Class)?;
        let (_, class_name) = self.tokens.consume_ident()?;
        self.class_name = class_name;
        self.tokens.consume(TokenKind::LeftBrace)?;

        // All class variable declarations precede the subroutines.
        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(Keyword::Static) => {
                    self.compile_class_var_dec(Keyword::Static, SymbolKind::Static)?
                }
                TokenKind::Keyword(Keyword::Field) => {
                    self.compile_class_var_dec(Keyword::Field, SymbolKind::Field)?
                }
                _ => break,
            }
        }

        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(
                    keyword @ (Keyword::Constructor | Keyword::Function | Keyword::Method),
                ) => self.compile_subroutine(keyword)?,
                _ => break,
            }
        }

        self.tokens.consume(TokenKind::RightBrace)?;

        self.writer.finish().map_err(CompileError::Io)
    }

    /// `('static'|'field') type varName (',' varName)* ';'`
    fn compile_class_var_dec(
        &mut self,
        keyword: Keyword,
        kind: SymbolKind,
    ) -> Result<(), CompileError> {
        self.tokens.consume_keyword(keyword)?;
        let ty = self.consume_type()?;

        let (_, name) = self.tokens.consume_ident()?;
        self.symbols.define(name, ty.clone(), kind);
        while self.tokens.match_token(TokenKind::Comma) {
            let (_, name) = self.tokens.consume_ident()?;
            self.symbols.define(name, ty.clone(), kind);
        }

        self.tokens.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    /// `('constructor'|'function'|'method') ('void'|type) subroutineName
    /// '(' parameterList ')' '{' varDec* statements '}'`
    fn compile_subroutine(&mut self, keyword: Keyword) -> Result<(), CompileError> {
        self.symbols.start_subroutine();
        self.tokens.consume_keyword(keyword)?;

        // The declared return type plays no part in code generation.
        match self.tokens.peek_kind()? {
            TokenKind::Keyword(Keyword::Void) => {
                self.tokens.consume_keyword(Keyword::Void)?;
            }
            _ => {
                self.consume_type()?;
            }
        }

        let (_, name) = self.tokens.consume_ident()?;
        debug!("compiling subroutine {}.{}", self.class_name, name);

        // Instance methods receive the object reference as a hidden
        // first argument.
        if keyword == Keyword::Method {
            self.symbols.reserve_arg();
        }

        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_parameter_list()?;
        self.tokens.consume(TokenKind::RightParen)?;

        self.tokens.consume(TokenKind::LeftBrace)?;

        // Local declarations all precede the statements, so the local
        // count is known before the function header is emitted.
        while self.tokens.peek_kind()? == TokenKind::Keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", self.class_name, name);
        self.writer
            .write_function(&full_name, self.symbols.var_count(SymbolKind::Var))?;

        match keyword {
            Keyword::Constructor => {
                // Allocate one word per field and bind the new object
                // as the receiver.
                self.writer
                    .write_push(Segment::Constant, self.symbols.var_count(SymbolKind::Field))?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;
        Ok(())
    }

    /// `((type varName) (',' type varName)*)?`
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        if self.tokens.peek_kind()? == TokenKind::RightParen {
            return Ok(());
        }

        loop {
            let ty = self.consume_type()?;
            let (_, name) = self.tokens.consume_ident()?;
            self.symbols.define(name, ty, SymbolKind::Arg);

            if !self.tokens.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    /// `'var' type varName (',' varName)* ';'`
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.tokens.consume_keyword(Keyword::Var)?;
        let ty = self.consume_type()?;

        let (_, name) = self.tokens.consume_ident()?;
        self.symbols.define(name, ty.clone(), SymbolKind::Var);
        while self.tokens.match_token(TokenKind::Comma) {
            let (_, name) = self.tokens.consume_ident()?;
            self.symbols.define(name, ty.clone(), SymbolKind::Var);
        }

        self.tokens.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Result<(), CompileError> {
        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(Keyword::Let) => self.compile_let()?,
                TokenKind::Keyword(Keyword::If) => self.compile_if()?,
                TokenKind::Keyword(Keyword::While) => self.compile_while()?,
                TokenKind::Keyword(Keyword::Do) => self.compile_do()?,
                TokenKind::Keyword(Keyword::Return) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.tokens.consume_keyword(Keyword::Let)?;
        let (_, name) = self.tokens.consume_ident()?;
        let symbol = self.resolve(&name)?;

        if self.tokens.match_token(TokenKind::LeftBracket) {
            // Target is an array cell: compute base + index, then keep
            // the assigned value in temp while `that` is re-anchored.
            self.writer.write_push(symbol.kind.segment(), symbol.index)?;
            self.compile_expression()?;
            self.tokens.consume(TokenKind::RightBracket)?;
            self.writer.write_arithmetic(VmCommand::Add)?;

            self.tokens.consume(TokenKind::Equal)?;
            self.compile_expression()?;
            self.tokens.consume(TokenKind::Semicolon)?;

            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.tokens.consume(TokenKind::Equal)?;
            self.compile_expression()?;
            self.tokens.consume(TokenKind::Semicolon)?;

            self.writer.write_pop(symbol.kind.segment(), symbol.index)?;
        }
        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}'
    /// ('else' '{' statements '}')?`
    ///
    /// Both labels are generated up front. Whether an `else` clause
    /// follows is not known until the then-branch has been consumed.
    fn compile_if(&mut self) -> Result<(), CompileError> {
        let id = self.next_label();
        let else_label = format!("IF_ELSE_{}", id);
        let end_label = format!("IF_END_{}", id);

        self.tokens.consume_keyword(Keyword::If)?;
        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_expression()?;
        self.tokens.consume(TokenKind::RightParen)?;

        // Negate the condition so the branch skips the then-block.
        self.writer.write_arithmetic(VmCommand::Not)?;
        self.writer.write_if(&else_label)?;

        self.tokens.consume(TokenKind::LeftBrace)?;
        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;

        self.writer.write_goto(&end_label)?;
        self.writer.write_label(&else_label)?;

        if self.tokens.match_token(TokenKind::Keyword(Keyword::Else)) {
            self.tokens.consume(TokenKind::LeftBrace)?;
            self.compile_statements()?;
            self.tokens.consume(TokenKind::RightBrace)?;
        }

        self.writer.write_label(&end_label)?;
        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> Result<(), CompileError> {
        let id = self.next_label();
        let cond_label = format!("WHILE_COND_{}", id);
        let end_label = format!("WHILE_END_{}", id);

        self.writer.write_label(&cond_label)?;

        self.tokens.consume_keyword(Keyword::While)?;
        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_expression()?;
        self.tokens.consume(TokenKind::RightParen)?;

        self.writer.write_arithmetic(VmCommand::Not)?;
        self.writer.write_if(&end_label)?;

        self.tokens.consume(TokenKind::LeftBrace)?;
        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;

        self.writer.write_goto(&cond_label)?;
        self.writer.write_label(&end_label)?;
        Ok(())
    }

    /// `'do' subroutineCall ';'`
    ///
    /// The call's return value is discarded.
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.tokens.consume_keyword(Keyword::Do)?;
        let (_, name) = self.tokens.consume_ident()?;
        self.compile_subroutine_call(name)?;
        self.tokens.consume(TokenKind::Semicolon)?;

        self.writer.write_pop(Segment::Temp, 0)?;
        Ok(())
    }

    /// `'return' expression? ';'`
    ///
    /// A subroutine with no explicit value pushes a default for the
    /// caller to pop.
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.tokens.consume_keyword(Keyword::Return)?;

        if self.tokens.peek_kind()? == TokenKind::Semicolon {
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.tokens.consume(TokenKind::Semicolon)?;

        self.writer.write_return()?;
        Ok(())
    }

    /// `term (op term)*`
    ///
    /// Operators associate left to right with no precedence, so each
    /// operation is emitted as soon as its right operand is compiled.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_term()?;

        loop {
            let kind = self.tokens.peek_kind()?;
            if !kind.is_binary_op() {
                return Ok(());
            }
            self.tokens.consume(kind)?;
            self.compile_term()?;
            self.compile_binary_op(kind)?;
        }
    }

    #[rustfmt::skip]
    fn compile_binary_op(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        use TokenKind as TK;
        match kind {
            TK::Plus        => self.writer.write_arithmetic(VmCommand::Add)?,
            TK::Minus       => self.writer.write_arithmetic(VmCommand::Sub)?,
            TK::Ampersand   => self.writer.write_arithmetic(VmCommand::And)?,
            TK::Pipe        => self.writer.write_arithmetic(VmCommand::Or)?,
            TK::LessThan    => self.writer.write_arithmetic(VmCommand::Lt)?,
            TK::GreaterThan => self.writer.write_arithmetic(VmCommand::Gt)?,
            TK::Equal       => self.writer.write_arithmetic(VmCommand::Eq)?,
            // Multiplication and division compile to runtime
            // library calls instead of native instructions.
            TK::Star        => self.writer.write_call("Math.multiply", 2)?,
            TK::Slash       => self.writer.write_call("Math.divide", 2)?,
            _ => return Err(CompileError::unexpected(kind, "binary operator")),
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        match self.tokens.peek_kind()? {
            TokenKind::Int => {
                let token = self.tokens.consume(TokenKind::Int)?;
                let fragment = self.tokens.span_fragment(&token.span);
                let value = fragment
                    .parse::<u16>()
                    .map_err(|_| CompileError::IntOutOfRange(fragment.to_owned()))?;
                self.writer.write_push(Segment::Constant, value)?;
            }
            TokenKind::Str => {
                let token = self.tokens.consume(TokenKind::Str)?;
                let fragment = self.tokens.span_fragment(&token.span);
                // Span includes the surrounding quotes.
                let value = &fragment[1..fragment.len() - 1];
                self.compile_string_constant(value)?;
            }
            TokenKind::Keyword(Keyword::True) => {
                self.tokens.consume_keyword(Keyword::True)?;
                self.writer.write_push(Segment::Constant, 0)?;
                self.writer.write_arithmetic(VmCommand::Not)?;
            }
            TokenKind::Keyword(keyword @ (Keyword::False | Keyword::Null)) => {
                self.tokens.consume_keyword(keyword)?;
                self.writer.write_push(Segment::Constant, 0)?;
            }
            TokenKind::Keyword(Keyword::This) => {
                self.tokens.consume_keyword(Keyword::This)?;
                self.writer.write_push(Segment::Pointer, 0)?;
            }
            TokenKind::LeftParen => {
                self.tokens.consume(TokenKind::LeftParen)?;
                self.compile_expression()?;
                self.tokens.consume(TokenKind::RightParen)?;
            }
            TokenKind::Minus => {
                self.tokens.consume(TokenKind::Minus)?;
                self.compile_term()?;
                self.writer.write_arithmetic(VmCommand::Neg)?;
            }
            TokenKind::Tilde => {
                self.tokens.consume(TokenKind::Tilde)?;
                self.compile_term()?;
                self.writer.write_arithmetic(VmCommand::Not)?;
            }
            TokenKind::Ident => {
                let (_, name) = self.tokens.consume_ident()?;
                self.compile_ident_term(name)?;
            }
            kind => return Err(CompileError::unexpected(kind, "term")),
        }
        Ok(())
    }

    /// A term starting with an identifier: a plain variable, an array
    /// access, or a subroutine call. One token of lookahead decides.
    fn compile_ident_term(&mut self, name: SmolStr) -> Result<(), CompileError> {
        match self.tokens.peek_kind()? {
            TokenKind::LeftBracket => {
                let symbol = self.resolve(&name)?;
                self.writer.write_push(symbol.kind.segment(), symbol.index)?;

                self.tokens.consume(TokenKind::LeftBracket)?;
                self.compile_expression()?;
                self.tokens.consume(TokenKind::RightBracket)?;

                self.writer.write_arithmetic(VmCommand::Add)?;
                self.writer.write_pop(Segment::Pointer, 1)?;
                self.writer.write_push(Segment::That, 0)?;
            }
            TokenKind::LeftParen | TokenKind::Dot => {
                self.compile_subroutine_call(name)?;
            }
            _ => {
                let symbol = self.resolve(&name)?;
                self.writer.write_push(symbol.kind.segment(), symbol.index)?;
            }
        }
        Ok(())
    }

    /// `subroutineName '(' expressionList ')'` or
    /// `(className|varName) '.' subroutineName '(' expressionList ')'`.
    ///
    /// The leading identifier has already been consumed. The receiver
    /// object is pushed before the explicit arguments and included in
    /// the call's argument count.
    fn compile_subroutine_call(&mut self, name: SmolStr) -> Result<(), CompileError> {
        match self.tokens.peek_kind()? {
            TokenKind::Dot => {
                self.tokens.consume(TokenKind::Dot)?;
                let (_, sub_name) = self.tokens.consume_ident()?;

                match self.symbols.resolve(&name).cloned() {
                    Some(symbol) => {
                        // Method call on an object held in a variable.
                        self.writer.write_push(symbol.kind.segment(), symbol.index)?;
                        let n_args = self.compile_call_arguments()?;
                        let full_name = format!("{}.{}", symbol.ty, sub_name);
                        self.writer.write_call(&full_name, n_args + 1)?;
                    }
                    None => {
                        // An unresolved receiver is assumed to name a
                        // class; the call is a static function call.
                        let n_args = self.compile_call_arguments()?;
                        let full_name = format!("{}.{}", name, sub_name);
                        self.writer.write_call(&full_name, n_args)?;
                    }
                }
            }
            TokenKind::LeftParen => {
                // A bare call is a method on the current object.
                self.writer.write_push(Segment::Pointer, 0)?;
                let n_args = self.compile_call_arguments()?;
                let full_name = format!("{}.{}", self.class_name, name);
                self.writer.write_call(&full_name, n_args + 1)?;
            }
            kind => return Err(CompileError::unexpected(kind, "subroutine call")),
        }
        Ok(())
    }

    /// `'(' (expression (',' expression)*)? ')'`
    ///
    /// Returns the number of expressions compiled.
    fn compile_call_arguments(&mut self) -> Result<u16, CompileError> {
        self.tokens.consume(TokenKind::LeftParen)?;

        let mut count = 0;
        if self.tokens.peek_kind()? != TokenKind::RightParen {
            loop {
                self.compile_expression()?;
                count += 1;
                if !self.tokens.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.tokens.consume(TokenKind::RightParen)?;
        Ok(count)
    }

    /// `push constant <len>`, `String.new`, then one `appendChar`
    /// call per character.
    fn compile_string_constant(&mut self, value: &str) -> Result<(), CompileError> {
        self.writer
            .write_push(Segment::Constant, value.chars().count() as u16)?;
        self.writer.write_call("String.new", 1)?;

        for ch in value.chars() {
            self.writer.write_push(Segment::Constant, ch as u16)?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    /// `'int' | 'char' | 'boolean' | className`
    fn consume_type(&mut self) -> Result<SmolStr, CompileError> {
        match self.tokens.peek_kind()? {
            TokenKind::Keyword(keyword @ (Keyword::Int | Keyword::Char | Keyword::Boolean)) => {
                let token = self.tokens.consume_keyword(keyword)?;
                Ok(SmolStr::new(self.tokens.span_fragment(&token.span)))
            }
            TokenKind::Ident => {
                let (_, name) = self.tokens.consume_ident()?;
                Ok(name)
            }
            kind => Err(CompileError::unexpected(kind, "type")),
        }
    }

    fn resolve(&self, name: &str) -> Result<Symbol, CompileError> {
        self.symbols
            .resolve(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownVariable(SmolStr::new(name)))
    }

    fn next_label(&mut self) -> u32 {
        let id = self.label_count;
        self.label_count += 1;
        id
    }
}

#[derive(Debug)]
pub enum CompileError {
    Token(TokenError),
    Unexpected {
        encountered: TokenKind,
        context: &'static str,
    },
    UnknownVariable(SmolStr),
    IntOutOfRange(String),
    Io(io::Error),
}

impl CompileError {
    fn unexpected(encountered: TokenKind, context: &'static str) -> Self {
        CompileError::Unexpected {
            encountered,
            context,
        }
    }
}

impl error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use CompileError as E;
        match self {
            E::Token(err) => fmt::Display::fmt(err, f),
            E::Unexpected {
                encountered,
                context,
            } => write!(
                f,
                "unexpected token '{}' while compiling {}",
                encountered, context
            ),
            E::UnknownVariable(name) => write!(f, "reference to undeclared variable '{}'", name),
            E::IntOutOfRange(fragment) => {
                write!(f, "integer constant '{}' is out of range", fragment)
            }
            E::Io(err) => write!(f, "output error: {}", err),
        }
    }
}

impl From<TokenError> for CompileError {
    fn from(err: TokenError) -> Self {
        CompileError::Token(err)
    }
}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> Self {
        CompileError::Io(err)
    }
}
