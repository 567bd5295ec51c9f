//! Tokenizer for native constant expressions.
//!
//! Handles the literal forms found in header macros: decimal, hex and octal
//! integers with `u`/`l`/`ll`/`i64` suffixes, floating literals, character and
//! string literals (optionally `L`-prefixed), identifiers and C operators.

use std::fmt;

use interop_core::{EvalError, LiteralType};

/// An integer literal as written: its value and the narrowest type its suffix
/// allows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLiteral {
    pub value: u64,
    /// Lower bound on the literal's type; `Int32` without a suffix.
    pub floor: LiteralType,
    /// Whether the suffix demands an unsigned type.
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(IntLiteral),
    Float { value: f64, single: bool },
    Char(char),
    Str(String),
    Bool(bool),
    Ident(String),
    Punct(Punct),
}

/// Operators and delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    PipePipe,
    Tilde,
    Bang,
    Question,
    Colon,
    LeftParen,
    RightParen,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Shl => "<<",
            Punct::Shr => ">>",
            Punct::Less => "<",
            Punct::LessEqual => "<=",
            Punct::Greater => ">",
            Punct::GreaterEqual => ">=",
            Punct::EqualEqual => "==",
            Punct::NotEqual => "!=",
            Punct::Amp => "&",
            Punct::Caret => "^",
            Punct::Pipe => "|",
            Punct::AmpAmp => "&&",
            Punct::PipePipe => "||",
            Punct::Tilde => "~",
            Punct::Bang => "!",
            Punct::Question => "?",
            Punct::Colon => ":",
            Punct::LeftParen => "(",
            Punct::RightParen => ")",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(lit) => write!(f, "{}", lit.value),
            Token::Float { value, .. } => write!(f, "{value}"),
            Token::Char(c) => write!(f, "{c:?}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Ident(name) => f.write_str(name),
            Token::Punct(p) => f.write_str(p.as_str()),
        }
    }
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    Lexer::new(source).run()
}

struct Lexer<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn run(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            let token = match c {
                '0'..='9' => self.number()?,
                '.' if self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                '\'' => {
                    self.bump();
                    Token::Char(self.char_literal()?)
                }
                '"' => {
                    self.bump();
                    Token::Str(self.string_literal()?)
                }
                'L' if matches!(self.peek_nth(1), Some('\'' | '"')) => {
                    self.bump();
                    continue;
                }
                c if c == '_' || c.is_ascii_alphabetic() => self.identifier(),
                '/' if self.peek_nth(1) == Some('*') => {
                    self.block_comment()?;
                    continue;
                }
                '/' if self.peek_nth(1) == Some('/') => break,
                _ => Token::Punct(self.punct()?),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn identifier(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c == '_' || c.is_ascii_alphanumeric()) {
            self.bump();
        }
        match &self.source[start..self.pos] {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            name => Token::Ident(name.to_string()),
        }
    }

    fn block_comment(&mut self) -> Result<(), EvalError> {
        self.pos += 2;
        match self.rest().find("*/") {
            Some(end) => {
                self.pos += end + 2;
                Ok(())
            }
            None => Err(EvalError::MalformedLiteral {
                text: self.source.to_string(),
            }),
        }
    }

    fn punct(&mut self) -> Result<Punct, EvalError> {
        let c = self.bump().unwrap_or_default();
        let next = self.peek();
        let two = |lexer: &mut Self, p: Punct| {
            lexer.bump();
            p
        };
        let punct = match (c, next) {
            ('<', Some('<')) => two(self, Punct::Shl),
            ('>', Some('>')) => two(self, Punct::Shr),
            ('<', Some('=')) => two(self, Punct::LessEqual),
            ('>', Some('=')) => two(self, Punct::GreaterEqual),
            ('=', Some('=')) => two(self, Punct::EqualEqual),
            ('!', Some('=')) => two(self, Punct::NotEqual),
            ('&', Some('&')) => two(self, Punct::AmpAmp),
            ('|', Some('|')) => two(self, Punct::PipePipe),
            ('+', _) => Punct::Plus,
            ('-', _) => Punct::Minus,
            ('*', _) => Punct::Star,
            ('/', _) => Punct::Slash,
            ('%', _) => Punct::Percent,
            ('<', _) => Punct::Less,
            ('>', _) => Punct::Greater,
            ('&', _) => Punct::Amp,
            ('^', _) => Punct::Caret,
            ('|', _) => Punct::Pipe,
            ('~', _) => Punct::Tilde,
            ('!', _) => Punct::Bang,
            ('?', _) => Punct::Question,
            (':', _) => Punct::Colon,
            ('(', _) => Punct::LeftParen,
            (')', _) => Punct::RightParen,
            (other, _) => {
                return Err(EvalError::UnsupportedOperator {
                    token: other.to_string(),
                });
            }
        };
        Ok(punct)
    }

    fn number(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.pos];
            return self.integer(start, digits, 16);
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_nth(1), Some('+' | '-')));
            if self.peek_nth(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        if is_float {
            let text = &self.source[start..self.pos];
            let value: f64 = text.parse().map_err(|_| EvalError::MalformedLiteral {
                text: text.to_string(),
            })?;
            let single = matches!(self.peek(), Some('f' | 'F'));
            if single || matches!(self.peek(), Some('l' | 'L')) {
                self.bump();
            }
            return Ok(Token::Float { value, single });
        }

        let digits = &self.source[start..self.pos];
        if digits.len() > 1 && digits.starts_with('0') {
            self.integer(start, &digits[1..], 8)
        } else {
            self.integer(start, digits, 10)
        }
    }

    fn integer(&mut self, start: usize, digits: &str, radix: u32) -> Result<Token, EvalError> {
        let suffix_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.bump();
        }
        let suffix = self.source[suffix_start..self.pos].to_ascii_lowercase();
        let malformed = || EvalError::MalformedLiteral {
            text: self.source[start..self.pos].to_string(),
        };

        let (unsigned, floor) = match suffix.as_str() {
            "" | "l" | "i32" | "i16" | "i8" => (false, LiteralType::Int32),
            "u" | "ul" | "lu" | "ui32" | "ui16" | "ui8" => (true, LiteralType::UInt32),
            "ll" | "i64" => (false, LiteralType::Int64),
            "ull" | "llu" | "ui64" => (true, LiteralType::UInt64),
            _ => return Err(malformed()),
        };
        if digits.is_empty() {
            return Err(malformed());
        }
        let value = u64::from_str_radix(digits, radix).map_err(|_| malformed())?;
        Ok(Token::Int(IntLiteral {
            value,
            floor,
            unsigned,
        }))
    }

    fn escape(&mut self) -> Result<char, EvalError> {
        let malformed = |text: &str| EvalError::MalformedLiteral {
            text: text.to_string(),
        };
        let c = self.bump().ok_or_else(|| malformed("\\"))?;
        let value = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                char::from_u32(code).ok_or_else(|| malformed("\\0"))?
            }
            'x' => {
                let start = self.pos;
                while self.peek().is_some_and(|d| d.is_ascii_hexdigit()) {
                    self.bump();
                }
                let hex = &self.source[start..self.pos];
                u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| malformed(hex))?
            }
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' | '\'' | '"' | '?' => c,
            other => return Err(malformed(&other.to_string())),
        };
        Ok(value)
    }

    fn char_literal(&mut self) -> Result<char, EvalError> {
        let c = match self.bump() {
            Some('\\') => self.escape()?,
            Some('\'') | None => {
                return Err(EvalError::MalformedLiteral {
                    text: "''".to_string(),
                });
            }
            Some(c) => c,
        };
        if !self.eat('\'') {
            return Err(EvalError::MalformedLiteral {
                text: format!("'{c}"),
            });
        }
        Ok(c)
    }

    fn string_literal(&mut self) -> Result<String, EvalError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
                None => {
                    return Err(EvalError::MalformedLiteral {
                        text: format!("\"{out}"),
                    });
                }
            }
        }
    }
}
