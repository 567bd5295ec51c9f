//! Constant expression syntax tree and its Pratt parser.

use std::fmt;

use interop_core::EvalError;

use super::lexer::{IntLiteral, Punct, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    LogicalNot,
    BitwiseNot,
}

impl UnaryOp {
    pub fn binding_power() -> u8 {
        25 // Higher than all binary operators
    }

    fn from_punct(punct: Punct) -> Option<Self> {
        Some(match punct {
            Punct::Minus => UnaryOp::Neg,
            Punct::Plus => UnaryOp::Plus,
            Punct::Bang => UnaryOp::LogicalNot,
            Punct::Tilde => UnaryOp::BitwiseNot,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Left and right binding power; every operator is left-associative.
    pub fn binding_power(&self) -> (u8, u8) {
        use BinaryOp::*;
        match self {
            LogicalOr => (3, 4),
            LogicalAnd => (5, 6),
            BitwiseOr => (7, 8),
            BitwiseXor => (9, 10),
            BitwiseAnd => (11, 12),
            Equal | NotEqual => (13, 14),
            Less | LessEqual | Greater | GreaterEqual => (15, 16),
            ShiftLeft | ShiftRight => (17, 18),
            Add | Sub => (19, 20),
            Mul | Div | Mod => (21, 22),
        }
    }

    fn from_punct(punct: Punct) -> Option<Self> {
        use BinaryOp::*;
        Some(match punct {
            Punct::PipePipe => LogicalOr,
            Punct::AmpAmp => LogicalAnd,
            Punct::Pipe => BitwiseOr,
            Punct::Caret => BitwiseXor,
            Punct::Amp => BitwiseAnd,
            Punct::EqualEqual => Equal,
            Punct::NotEqual => NotEqual,
            Punct::Less => Less,
            Punct::LessEqual => LessEqual,
            Punct::Greater => Greater,
            Punct::GreaterEqual => GreaterEqual,
            Punct::Shl => ShiftLeft,
            Punct::Shr => ShiftRight,
            Punct::Plus => Add,
            Punct::Minus => Sub,
            Punct::Star => Mul,
            Punct::Slash => Div,
            Punct::Percent => Mod,
            _ => return None,
        })
    }

    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;
        let s = match self {
            LogicalOr => "||",
            LogicalAnd => "&&",
            BitwiseOr => "|",
            BitwiseXor => "^",
            BitwiseAnd => "&",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
        };
        f.write_str(s)
    }
}

/// A parsed constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(IntLiteral),
    Float { value: f64, single: bool },
    Char(char),
    Str(String),
    Bool(bool),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// `(target) operand`; `pointer` when the target was written with `*`.
    Cast {
        target: String,
        pointer: bool,
        operand: Box<Expr>,
    },
}

/// Parse a token stream into one expression.
///
/// `is_type` decides whether a parenthesized name is a cast target or an
/// ordinary parenthesized identifier.
pub fn parse(tokens: &[Token], is_type: &dyn Fn(&str) -> bool) -> Result<Expr, EvalError> {
    if tokens.is_empty() {
        return Err(EvalError::EmptyExpression);
    }
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        is_type,
    };
    let expr = parser.parse_expr(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(EvalError::UnsupportedOperator {
            token: extra.to_string(),
        }),
    }
}

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    is_type: &'t dyn Fn(&str) -> bool,
}

impl<'t> ExprParser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek() {
            Some(Token::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, punct: Punct) -> Result<(), EvalError> {
        match self.advance() {
            Some(Token::Punct(p)) if *p == punct => Ok(()),
            Some(other) => Err(EvalError::UnsupportedOperator {
                token: other.to_string(),
            }),
            None => Err(EvalError::UnsupportedOperator {
                token: format!("missing '{}'", punct.as_str()),
            }),
        }
    }

    /// Parse an expression with a minimum binding power.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(punct) = self.peek_punct() else {
                break;
            };

            if punct == Punct::Question {
                if 2 < min_bp {
                    break;
                }
                self.advance();
                let then_expr = self.parse_expr(0)?;
                self.expect(Punct::Colon)?;
                let else_expr = self.parse_expr(2)?;
                lhs = Expr::Ternary {
                    condition: Box::new(lhs),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                };
                continue;
            }

            let Some(op) = BinaryOp::from_punct(punct) else {
                break;
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, EvalError> {
        let token = self.advance().ok_or(EvalError::EmptyExpression)?;
        let expr = match token {
            Token::Int(lit) => Expr::Int(*lit),
            Token::Float { value, single } => Expr::Float {
                value: *value,
                single: *single,
            },
            Token::Char(c) => Expr::Char(*c),
            Token::Bool(b) => Expr::Bool(*b),
            Token::Str(s) => {
                // adjacent literals concatenate
                let mut text = s.clone();
                while let Some(Token::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.pos += 1;
                }
                Expr::Str(text)
            }
            Token::Ident(name) => Expr::Ident(name.clone()),
            Token::Punct(Punct::LeftParen) => {
                if let Some(cast) = self.try_parse_cast()? {
                    return Ok(cast);
                }
                let inner = self.parse_expr(0)?;
                self.expect(Punct::RightParen)?;
                inner
            }
            Token::Punct(p) => match UnaryOp::from_punct(*p) {
                Some(op) => {
                    let operand = self.parse_expr(UnaryOp::binding_power())?;
                    Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    }
                }
                None => {
                    return Err(EvalError::UnsupportedOperator {
                        token: p.as_str().to_string(),
                    });
                }
            },
        };
        Ok(expr)
    }

    /// After an opening parenthesis, recognize `name [name...] [*...] )`
    /// followed by an operand. Leaves the position untouched when the
    /// parenthesis does not open a cast.
    fn try_parse_cast(&mut self) -> Result<Option<Expr>, EvalError> {
        let start = self.pos;
        let mut words = Vec::new();
        while let Some(Token::Ident(word)) = self.tokens.get(self.pos) {
            words.push(word.as_str());
            self.pos += 1;
        }
        let mut pointer = false;
        while let Some(Token::Punct(Punct::Star)) = self.tokens.get(self.pos) {
            pointer = true;
            self.pos += 1;
        }
        let closes = matches!(self.tokens.get(self.pos), Some(Token::Punct(Punct::RightParen)));
        let target = words.join(" ");

        if words.is_empty() || !closes || !(self.is_type)(&target) {
            self.pos = start;
            return Ok(None);
        }
        self.pos += 1;

        // `(T)` followed by something that cannot start an operand is just a
        // parenthesized name
        let starts_operand = match self.peek() {
            None => false,
            Some(Token::Punct(p)) => {
                matches!(p, Punct::LeftParen) || UnaryOp::from_punct(*p).is_some()
            }
            Some(_) => true,
        };
        if !starts_operand && !pointer {
            self.pos = start;
            return Ok(None);
        }

        let operand = self.parse_expr(UnaryOp::binding_power())?;
        Ok(Some(Expr::Cast {
            target,
            pointer,
            operand: Box::new(operand),
        }))
    }
}
