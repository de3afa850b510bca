//! Lexer for JavaScript source code
//!
//! Converts source text into a stream of tokens. The parser pulls tokens one
//! at a time and may checkpoint/restore the lexer to try arrow-function heads.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::string_dict::StringDict;
use crate::value::JsString;

/// Source span information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Token types for JavaScript
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    /// BigInt literal, kept only so the parser can reject it by name
    BigInt,
    True,
    False,
    Null,

    Identifier(JsString),

    // Reserved words
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Super,
    Class,
    Extends,
    Import,
    Export,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    Yield,
    Await,
    Debugger,
    With,
    Enum,

    // Operators
    Plus,             // +
    Minus,            // -
    Star,             // *
    Slash,            // /
    Percent,          // %
    StarStar,         // **
    PlusPlus,         // ++
    MinusMinus,       // --
    Eq,               // =
    EqEq,             // ==
    EqEqEq,           // ===
    BangEq,           // !=
    BangEqEq,         // !==
    Lt,               // <
    LtEq,             // <=
    Gt,               // >
    GtEq,             // >=
    LtLt,             // <<
    GtGt,             // >>
    GtGtGt,           // >>>
    Amp,              // &
    AmpAmp,           // &&
    Pipe,             // |
    PipePipe,         // ||
    Caret,            // ^
    Tilde,            // ~
    Bang,             // !
    Question,         // ?
    QuestionQuestion, // ??
    QuestionDot,      // ?.

    // Assignment Operators
    PlusEq,             // +=
    MinusEq,            // -=
    StarEq,             // *=
    SlashEq,            // /=
    PercentEq,          // %=
    StarStarEq,         // **=
    AmpEq,              // &=
    PipeEq,             // |=
    CaretEq,            // ^=
    LtLtEq,             // <<=
    GtGtEq,             // >>=
    GtGtGtEq,           // >>>=
    AmpAmpEq,           // &&=
    PipePipeEq,         // ||=
    QuestionQuestionEq, // ??=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    DotDotDot, // ...
    Comma,     // ,
    Colon,     // :
    Semicolon, // ;
    Arrow,     // =>

    // Template literals (cooked text)
    TemplateHead(JsString),   // `...${
    TemplateMiddle(JsString), // }...${
    TemplateTail(JsString),   // }...`
    TemplateNoSub(JsString),  // `...` (no substitutions)

    // Special
    Eof,
    UnterminatedString,
    Invalid(char),
}

/// Reserved words and the literal words `true`, `false` and `null`.
/// Contextual words (of, async, get, set, static, from, as) lex as identifiers.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("let", TokenKind::Let),
    ("const", TokenKind::Const),
    ("var", TokenKind::Var),
    ("function", TokenKind::Function),
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("while", TokenKind::While),
    ("do", TokenKind::Do),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("finally", TokenKind::Finally),
    ("throw", TokenKind::Throw),
    ("new", TokenKind::New),
    ("this", TokenKind::This),
    ("super", TokenKind::Super),
    ("class", TokenKind::Class),
    ("extends", TokenKind::Extends),
    ("import", TokenKind::Import),
    ("export", TokenKind::Export),
    ("typeof", TokenKind::Typeof),
    ("instanceof", TokenKind::Instanceof),
    ("in", TokenKind::In),
    ("void", TokenKind::Void),
    ("delete", TokenKind::Delete),
    ("yield", TokenKind::Yield),
    ("await", TokenKind::Await),
    ("debugger", TokenKind::Debugger),
    ("with", TokenKind::With),
    ("enum", TokenKind::Enum),
];

impl TokenKind {
    /// Reserved words usable as property names (`obj.default`, `{ if: 1 }`)
    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(text, _)| *text)
    }
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(pos: usize, line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(pos, pos, line, column),
        }
    }
}

/// Lexer state checkpoint for backtracking
#[derive(Clone)]
pub struct LexerCheckpoint {
    current_pos: usize,
    line: u32,
    column: u32,
    saw_newline: bool,
}

/// Lexer for tokenizing JavaScript source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Base offset added to char_indices positions after a reset into the middle of the source
    chars_base_offset: usize,
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
    /// Tracks if we just saw a newline (for ASI)
    saw_newline: bool,
    string_dict: &'a mut StringDict,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            chars_base_offset: 0,
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
            saw_newline: false,
            string_dict,
        }
    }

    pub fn string_dict(&mut self) -> &mut StringDict {
        self.string_dict
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn checkpoint(&self) -> LexerCheckpoint {
        LexerCheckpoint {
            current_pos: self.current_pos,
            line: self.line,
            column: self.column,
            saw_newline: self.saw_newline,
        }
    }

    pub fn restore(&mut self, checkpoint: LexerCheckpoint) {
        self.reset_to(checkpoint.current_pos, checkpoint.line, checkpoint.column);
        self.saw_newline = checkpoint.saw_newline;
    }

    fn reset_to(&mut self, pos: usize, line: u32, column: u32) {
        self.current_pos = pos;
        self.line = line;
        self.column = column;
        self.chars_base_offset = pos;
        self.chars = self.source.get(pos..).unwrap_or("").char_indices().peekable();
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some((_pos, ch)) = self.advance() else {
            return Token::eof(self.current_pos, self.line, self.column);
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            ':' => TokenKind::Colon,

            '.' => self.scan_dot(),
            '+' => self.scan_pair('+', TokenKind::PlusPlus, TokenKind::PlusEq, TokenKind::Plus),
            '-' => self.scan_pair('-', TokenKind::MinusMinus, TokenKind::MinusEq, TokenKind::Minus),
            '*' => self.scan_star(),
            '/' => self.scan_assign_op(TokenKind::SlashEq, TokenKind::Slash),
            '%' => self.scan_assign_op(TokenKind::PercentEq, TokenKind::Percent),
            '^' => self.scan_assign_op(TokenKind::CaretEq, TokenKind::Caret),
            '=' => self.scan_equals(),
            '!' => self.scan_bang(),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '&' => self.scan_logical('&', TokenKind::AmpAmpEq, TokenKind::AmpAmp, TokenKind::AmpEq, TokenKind::Amp),
            '|' => self.scan_logical('|', TokenKind::PipePipeEq, TokenKind::PipePipe, TokenKind::PipeEq, TokenKind::Pipe),
            '?' => self.scan_question(),

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template(true),
            '0'..='9' => self.scan_number(ch),
            '\\' => TokenKind::Invalid('\\'),
            c if is_id_start(c) => self.scan_identifier(c),
            c => TokenKind::Invalid(c),
        };

        Token::new(kind, self.make_span())
    }

    /// Check if there was a line terminator before the last token
    pub fn had_newline_before(&self) -> bool {
        self.saw_newline
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = self.chars_base_offset + pos + ch.len_utf8();
            let crlf = ch == '\r' && self.chars.peek().is_some_and(|(_, next)| *next == '\n');
            if is_line_terminator(ch) && !crlf {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let slice = self.source.get(self.current_pos..)?;
        let mut iter = slice.chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        self.saw_newline = false;

        loop {
            match self.peek() {
                Some(c) if is_line_terminator(c) => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() || c == '\u{FEFF}' => {
                    self.advance();
                }
                Some('/') => {
                    let next = self.peek_next();
                    if next == Some('/') {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    } else if next == Some('*') {
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some((_, '*')) if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some((_, c)) if is_line_terminator(c) => {
                                    self.saw_newline = true;
                                }
                                Some(_) => {}
                                None => break,
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_dot(&mut self) -> TokenKind {
        if self.peek() == Some('.') && self.peek_next() == Some('.') {
            self.advance();
            self.advance();
            TokenKind::DotDotDot
        } else if matches!(self.peek(), Some('0'..='9')) {
            self.scan_number('.')
        } else {
            TokenKind::Dot
        }
    }

    /// `++`/`+=`/`+` style operators
    fn scan_pair(&mut self, twice: char, double: TokenKind, assign: TokenKind, single: TokenKind) -> TokenKind {
        if self.match_char(twice) {
            double
        } else if self.match_char('=') {
            assign
        } else {
            single
        }
    }

    fn scan_assign_op(&mut self, assign: TokenKind, single: TokenKind) -> TokenKind {
        if self.match_char('=') { assign } else { single }
    }

    /// `&&=`/`&&`/`&=`/`&` style operators
    fn scan_logical(
        &mut self,
        ch: char,
        double_assign: TokenKind,
        double: TokenKind,
        assign: TokenKind,
        single: TokenKind,
    ) -> TokenKind {
        if self.match_char(ch) {
            self.scan_assign_op(double_assign, double)
        } else {
            self.scan_assign_op(assign, single)
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        if self.match_char('*') {
            self.scan_assign_op(TokenKind::StarStarEq, TokenKind::StarStar)
        } else {
            self.scan_assign_op(TokenKind::StarEq, TokenKind::Star)
        }
    }

    fn scan_equals(&mut self) -> TokenKind {
        if self.match_char('=') {
            self.scan_assign_op(TokenKind::EqEqEq, TokenKind::EqEq)
        } else if self.match_char('>') {
            TokenKind::Arrow
        } else {
            TokenKind::Eq
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.match_char('=') {
            self.scan_assign_op(TokenKind::BangEqEq, TokenKind::BangEq)
        } else {
            TokenKind::Bang
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.match_char('<') {
            self.scan_assign_op(TokenKind::LtLtEq, TokenKind::LtLt)
        } else {
            self.scan_assign_op(TokenKind::LtEq, TokenKind::Lt)
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.match_char('>') {
            if self.match_char('>') {
                self.scan_assign_op(TokenKind::GtGtGtEq, TokenKind::GtGtGt)
            } else {
                self.scan_assign_op(TokenKind::GtGtEq, TokenKind::GtGt)
            }
        } else {
            self.scan_assign_op(TokenKind::GtEq, TokenKind::Gt)
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        if self.match_char('?') {
            self.scan_assign_op(TokenKind::QuestionQuestionEq, TokenKind::QuestionQuestion)
        } else if self.peek() == Some('.') && !matches!(self.peek_next(), Some('0'..='9')) {
            // `a?.5:b` is a conditional, not an optional chain
            self.advance();
            TokenKind::QuestionDot
        } else {
            TokenKind::Question
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => {
                    if !self.scan_escape(&mut value) {
                        return TokenKind::UnterminatedString;
                    }
                }
                Some((_, c)) if c == '\n' || c == '\r' => return TokenKind::UnterminatedString,
                Some((_, c)) => value.push(c),
                None => return TokenKind::UnterminatedString,
            }
        }

        TokenKind::String(self.string_dict.get_or_insert(&value))
    }

    /// Decode one escape sequence (the backslash is consumed). Returns false at EOF.
    fn scan_escape(&mut self, value: &mut String) -> bool {
        let Some((_, c)) = self.advance() else {
            return false;
        };
        match c {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0C'),
            'v' => value.push('\x0B'),
            '0'..='7' => {
                // \0 and legacy octal escapes
                let mut code = c.to_digit(8).unwrap_or(0);
                let max_len = if c <= '3' { 3 } else { 2 };
                let mut len = 1;
                while len < max_len {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.advance();
                            len += 1;
                        }
                        None => break,
                    }
                }
                value.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            'x' => match self.scan_hex_digits(2) {
                Some(code) => value.push(char::from_u32(code).unwrap_or('\u{FFFD}')),
                None => value.push('x'),
            },
            'u' => {
                let code = self.scan_unicode_escape();
                value.push(code.and_then(char::from_u32).unwrap_or('\u{FFFD}'));
            }
            // Line continuation
            '\r' => {
                self.match_char('\n');
            }
            c if is_line_terminator(c) => {}
            c => value.push(c),
        }
        true
    }

    /// `\uXXXX` or `\u{X...}` after the `u`; joins surrogate pairs written as two escapes.
    fn scan_unicode_escape(&mut self) -> Option<u32> {
        let code = if self.match_char('{') {
            let mut code: u32 = 0;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                code = code.saturating_mul(16).saturating_add(d);
                self.advance();
            }
            if !self.match_char('}') {
                return None;
            }
            code
        } else {
            self.scan_hex_digits(4)?
        };

        if (0xD800..0xDC00).contains(&code) && self.peek() == Some('\\') && self.peek_next() == Some('u') {
            let checkpoint = self.checkpoint();
            self.advance();
            self.advance();
            if let Some(low) = self.scan_hex_digits(4)
                && (0xDC00..0xE000).contains(&low)
            {
                return Some(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00));
            }
            self.restore(checkpoint);
        }
        Some(code)
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self.peek()?.to_digit(16)?;
            self.advance();
            code = code * 16 + digit;
        }
        Some(code)
    }

    /// Scan template text up to `${` or the closing backtick.
    fn scan_template(&mut self, head: bool) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, '`')) => {
                    let text = self.string_dict.get_or_insert(&value);
                    return if head {
                        TokenKind::TemplateNoSub(text)
                    } else {
                        TokenKind::TemplateTail(text)
                    };
                }
                Some((_, '$')) if self.peek() == Some('{') => {
                    self.advance();
                    let text = self.string_dict.get_or_insert(&value);
                    return if head {
                        TokenKind::TemplateHead(text)
                    } else {
                        TokenKind::TemplateMiddle(text)
                    };
                }
                Some((_, '\\')) => {
                    if !self.scan_escape(&mut value) {
                        return TokenKind::UnterminatedString;
                    }
                }
                // CRLF in template text is normalized to LF
                Some((_, '\r')) => {
                    self.match_char('\n');
                    value.push('\n');
                }
                Some((_, c)) => value.push(c),
                None => return TokenKind::UnterminatedString,
            }
        }
    }

    /// Rescan template continuation after the `}` that closed a substitution
    pub fn rescan_template_continuation(&mut self, rbrace_span: Span) -> Token {
        self.reset_to(rbrace_span.end, rbrace_span.line, rbrace_span.column + 1);
        self.start_pos = rbrace_span.start;
        self.start_line = rbrace_span.line;
        self.start_column = rbrace_span.column;
        let kind = self.scan_template(false);
        Token::new(kind, self.make_span())
    }

    fn scan_digits(&mut self, radix: u32, out: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                out.push(ch);
                self.advance();
            } else if ch == '_' && self.peek_next().is_some_and(|c| c.is_digit(radix)) {
                // Numeric separator
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let mut digits = String::new();
                self.scan_digits(radix, &mut digits);
                if self.match_char('n') {
                    return TokenKind::BigInt;
                }
                if digits.is_empty() {
                    return TokenKind::Invalid('0');
                }
                let value = digits
                    .chars()
                    .filter_map(|c| c.to_digit(radix))
                    .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
                return TokenKind::Number(value);
            }
            if matches!(self.peek(), Some('0'..='7')) {
                // Legacy octal literal (sloppy mode), falls back to decimal on 8/9
                let mut digits = String::new();
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        digits.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
                if digits.chars().all(|c| c.is_digit(8)) {
                    let value = digits
                        .chars()
                        .filter_map(|c| c.to_digit(8))
                        .fold(0.0, |acc, d| acc * 8.0 + d as f64);
                    return TokenKind::Number(value);
                }
                return TokenKind::Number(digits.parse().unwrap_or(f64::NAN));
            }
        }

        let mut num_str = String::new();
        if first == '.' {
            num_str.push_str("0.");
            self.scan_digits(10, &mut num_str);
        } else {
            num_str.push(first);
            self.scan_digits(10, &mut num_str);
            if self.match_char('n') {
                return TokenKind::BigInt;
            }
            if self.peek() == Some('.') {
                self.advance();
                num_str.push('.');
                self.scan_digits(10, &mut num_str);
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_then_digit = matches!(self.peek_next(), Some('+' | '-'));
            let digit_next = matches!(self.peek_next(), Some('0'..='9'));
            if sign_then_digit || digit_next {
                self.advance();
                num_str.push('e');
                if sign_then_digit && let Some((_, sign)) = self.advance() {
                    num_str.push(sign);
                }
                self.scan_digits(10, &mut num_str);
            }
        }

        // `3in x` and `1x` are errors in JS; flag an identifier glued to a number
        if self.peek().is_some_and(is_id_start) {
            return TokenKind::Invalid(first);
        }

        TokenKind::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match KEYWORDS.iter().find(|(text, _)| *text == name) {
            Some((_, kind)) => kind.clone(),
            None => TokenKind::Identifier(self.string_dict.get_or_insert(&name)),
        }
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Check if a character can start an identifier
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

/// Check if a character can continue an identifier
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch == '\u{200C}' || ch == '\u{200D}' || ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new(source, &mut dict);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    fn s(value: &str) -> JsString {
        JsString::from(value)
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
        assert_eq!(lex("3.14"), vec![TokenKind::Number(3.14)]);
        assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(lex("1e10"), vec![TokenKind::Number(1e10)]);
        assert_eq!(lex("2E-3"), vec![TokenKind::Number(0.002)]);
        assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(lex("0b1010"), vec![TokenKind::Number(10.0)]);
        assert_eq!(lex("0o17"), vec![TokenKind::Number(15.0)]);
        assert_eq!(lex("017"), vec![TokenKind::Number(15.0)]);
        assert_eq!(lex("1_000_000"), vec![TokenKind::Number(1_000_000.0)]);
        assert_eq!(lex("10n"), vec![TokenKind::BigInt]);
    }

    #[test]
    fn test_member_access_on_number() {
        assert_eq!(
            lex("1..toString"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Dot,
                TokenKind::Identifier(s("toString"))
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#""hello""#), vec![TokenKind::String(s("hello"))]);
        assert_eq!(lex(r#"'world'"#), vec![TokenKind::String(s("world"))]);
        assert_eq!(lex(r#""line\nbreak""#), vec![TokenKind::String(s("line\nbreak"))]);
        assert_eq!(lex(r#""\x41B\u{43}""#), vec![TokenKind::String(s("ABC"))]);
        assert_eq!(lex(r#""😀""#), vec![TokenKind::String(s("😀"))]);
        assert_eq!(lex("\"abc"), vec![TokenKind::UnterminatedString]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("+ - * /"),
            vec![TokenKind::Plus, TokenKind::Minus, TokenKind::Star, TokenKind::Slash]
        );
        assert_eq!(lex("=== !== "), vec![TokenKind::EqEqEq, TokenKind::BangEqEq]);
        assert_eq!(lex("&&="), vec![TokenKind::AmpAmpEq]);
        assert_eq!(lex("??="), vec![TokenKind::QuestionQuestionEq]);
        assert_eq!(lex(">>>="), vec![TokenKind::GtGtGtEq]);
        assert_eq!(lex("**="), vec![TokenKind::StarStarEq]);
        assert_eq!(lex("a?.b"), vec![TokenKind::Identifier(s("a")), TokenKind::QuestionDot, TokenKind::Identifier(s("b"))]);
        assert_eq!(
            lex("a?.5:1"),
            vec![
                TokenKind::Identifier(s("a")),
                TokenKind::Question,
                TokenKind::Number(0.5),
                TokenKind::Colon,
                TokenKind::Number(1.0)
            ]
        );
    }

    #[test]
    fn test_keywords_and_contextual_words() {
        assert_eq!(lex("let const var"), vec![TokenKind::Let, TokenKind::Const, TokenKind::Var]);
        assert_eq!(lex("with"), vec![TokenKind::With]);
        assert_eq!(
            lex("of async"),
            vec![TokenKind::Identifier(s("of")), TokenKind::Identifier(s("async"))]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("1 // comment\n2 /* a\nb */ 3", &mut dict);
        assert_eq!(lexer.next_token().kind, TokenKind::Number(1.0));
        assert!(!lexer.had_newline_before());
        assert_eq!(lexer.next_token().kind, TokenKind::Number(2.0));
        assert!(lexer.had_newline_before());
        assert_eq!(lexer.next_token().kind, TokenKind::Number(3.0));
        assert!(lexer.had_newline_before());
    }

    #[test]
    fn test_template_literal() {
        assert_eq!(lex("`plain`"), vec![TokenKind::TemplateNoSub(s("plain"))]);

        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("`a${x}b`", &mut dict);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateHead(s("a")));
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("x")));
        let rbrace = lexer.next_token();
        assert_eq!(rbrace.kind, TokenKind::RBrace);
        assert_eq!(lexer.rescan_template_continuation(rbrace.span).kind, TokenKind::TemplateTail(s("b")));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("a b c", &mut dict);
        lexer.next_token();
        let checkpoint = lexer.checkpoint();
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("b")));
        lexer.restore(checkpoint);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("b")));
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier(s("c")));
    }
}
