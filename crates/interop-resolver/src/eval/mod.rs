//! Constant-expression evaluation.
//!
//! Turns the text of a macro body or an enum initializer into an
//! [`EvaluatedValue`]. Integer results are typed with the narrowest of
//! `Int32`, `UInt32`, `Int64`, `UInt64` that holds them, starting from the
//! widest operand type (C's usual promotion to at least `int`) and widening on
//! overflow. A cast to an integer type fixes the result type instead.
//!
//! ```
//! use interop_core::{EvaluatedValue, LiteralType};
//! use interop_resolver::eval::{evaluate_str, EmptyContext};
//!
//! let v = evaluate_str("0x1", &EmptyContext).unwrap();
//! assert_eq!(v, EvaluatedValue::integer(1).unwrap());
//!
//! let v = evaluate_str("((DWORD)-1)", &EmptyContext);
//! assert!(v.is_err()); // DWORD is not a builtin; a store context knows it
//!
//! let v = evaluate_str("((unsigned long)-1)", &EmptyContext).unwrap();
//! assert_eq!(v.ty, LiteralType::UInt32);
//! ```

pub mod expr;
pub mod lexer;

use interop_core::{BuiltinKind, BuiltinType, EvalError, EvaluatedValue, Literal, LiteralType};

pub use expr::{parse, BinaryOp, Expr, UnaryOp};
pub use lexer::{tokenize, Token};

// ============================================================================
// Context
// ============================================================================

/// Outcome of looking an identifier up.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(EvaluatedValue),
    /// Known, but its value has not been evaluated yet.
    Pending,
    Unknown,
}

/// What a cast target name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    NotAType,
    Integer(LiteralType),
    Floating { single: bool },
    Boolean,
    /// A type with no literal form (pointers, records, `void`).
    Opaque,
}

impl CastTarget {
    pub fn from_builtin(builtin: BuiltinType) -> Self {
        let unsigned = builtin.is_unsigned;
        match builtin.kind {
            BuiltinKind::Void => CastTarget::Opaque,
            BuiltinKind::Boolean => CastTarget::Boolean,
            BuiltinKind::Char if unsigned => CastTarget::Integer(LiteralType::Byte),
            BuiltinKind::Char => CastTarget::Integer(LiteralType::SByte),
            BuiltinKind::Byte => CastTarget::Integer(LiteralType::Byte),
            BuiltinKind::WChar => CastTarget::Integer(LiteralType::UInt16),
            BuiltinKind::Int16 if unsigned => CastTarget::Integer(LiteralType::UInt16),
            BuiltinKind::Int16 => CastTarget::Integer(LiteralType::Int16),
            BuiltinKind::Int32 if unsigned => CastTarget::Integer(LiteralType::UInt32),
            BuiltinKind::Int32 => CastTarget::Integer(LiteralType::Int32),
            BuiltinKind::Int64 if unsigned => CastTarget::Integer(LiteralType::UInt64),
            BuiltinKind::Int64 => CastTarget::Integer(LiteralType::Int64),
            BuiltinKind::Float => CastTarget::Floating { single: true },
            BuiltinKind::Double => CastTarget::Floating { single: false },
        }
    }
}

/// Where identifiers and type names get their meaning.
pub trait EvalContext {
    fn lookup_value(&self, name: &str) -> Lookup;

    /// Only builtin spellings are types unless the context knows more.
    fn cast_target(&self, name: &str) -> CastTarget {
        BuiltinType::from_c_name(name)
            .map(CastTarget::from_builtin)
            .unwrap_or(CastTarget::NotAType)
    }
}

/// A context with no identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl EvalContext for EmptyContext {
    fn lookup_value(&self, _name: &str) -> Lookup {
        Lookup::Unknown
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Tokenize, parse and evaluate `source`.
pub fn evaluate_str(source: &str, ctx: &dyn EvalContext) -> Result<EvaluatedValue, EvalError> {
    let tokens = tokenize(source)?;
    let is_type = |name: &str| ctx.cast_target(name) != CastTarget::NotAType;
    let expr = parse(&tokens, &is_type)?;
    evaluate(&expr, ctx)
}

/// Evaluate a parsed expression.
pub fn evaluate(expr: &Expr, ctx: &dyn EvalContext) -> Result<EvaluatedValue, EvalError> {
    Evaluator { ctx }.eval(expr)?.into_evaluated()
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int { value: i128, ty: LiteralType },
    Float { value: f64, single: bool },
    Char(char),
    Str(String),
    Bool(bool),
}

impl Value {
    fn from_evaluated(v: EvaluatedValue) -> Self {
        match v.literal {
            Literal::Int(i) => Value::Int {
                value: i128::from(i),
                ty: v.ty,
            },
            Literal::UInt(u) => Value::Int {
                value: i128::from(u),
                ty: v.ty,
            },
            Literal::Single(f) => Value::Float {
                value: f64::from(f.0),
                single: true,
            },
            Literal::Double(f) => Value::Float {
                value: f.0,
                single: false,
            },
            Literal::Char(c) => Value::Char(c),
            Literal::String(s) => Value::Str(s),
            Literal::Bool(b) => Value::Bool(b),
        }
    }

    fn into_evaluated(self) -> Result<EvaluatedValue, EvalError> {
        Ok(match self {
            Value::Int { value, ty } => {
                EvaluatedValue::integer_as(value, ty).ok_or(EvalError::OutOfRange)?
            }
            Value::Float { value, single: true } => EvaluatedValue::single(value as f32),
            Value::Float { value, .. } => EvaluatedValue::double(value),
            Value::Char(c) => EvaluatedValue::character(c),
            Value::Str(s) => EvaluatedValue::string(s),
            Value::Bool(b) => EvaluatedValue::boolean(b),
        })
    }

    /// Integer view after the usual promotion to at least `Int32`.
    fn promoted(&self) -> Option<(i128, LiteralType)> {
        match self {
            Value::Int { value, ty } => Some((*value, (*ty).max(LiteralType::Int32))),
            Value::Char(c) => Some((i128::from(u32::from(*c)), LiteralType::Int32)),
            Value::Bool(b) => Some((i128::from(*b), LiteralType::Int32)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<(f64, bool)> {
        match self {
            Value::Float { value, single } => Some((*value, *single)),
            _ => self.promoted().map(|(v, _)| (v as f64, true)),
        }
    }

    fn truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Float { value, .. } => Ok(*value != 0.0),
            Value::Str(_) => Err(unsupported("string in condition")),
            other => Ok(other.promoted().is_some_and(|(v, _)| v != 0)),
        }
    }
}

fn unsupported(token: impl Into<String>) -> EvalError {
    EvalError::UnsupportedOperator {
        token: token.into(),
    }
}

fn bit_width(ty: LiteralType) -> Option<u32> {
    Some(match ty {
        LiteralType::SByte | LiteralType::Byte => 8,
        LiteralType::Int16 | LiteralType::UInt16 => 16,
        LiteralType::Int32 | LiteralType::UInt32 => 32,
        LiteralType::Int64 | LiteralType::UInt64 => 64,
        _ => return None,
    })
}

/// Reinterpret `value` as `ty`'s two's-complement width.
fn wrap_to(value: i128, ty: LiteralType) -> Option<i128> {
    let bits = bit_width(ty)?;
    let modulus = 1i128 << bits;
    let wrapped = value.rem_euclid(modulus);
    if !ty.is_unsigned() && wrapped >= modulus / 2 {
        Some(wrapped - modulus)
    } else {
        Some(wrapped)
    }
}

/// Type an arithmetic result: keep `floor` when it holds the value, wrap
/// negative results of unsigned arithmetic, otherwise widen.
fn integer_result(value: i128, floor: LiteralType) -> Result<Value, EvalError> {
    if floor.can_hold(value) {
        return Ok(Value::Int { value, ty: floor });
    }
    if value < 0 && floor.is_unsigned() {
        let value = wrap_to(value, floor).ok_or(EvalError::OutOfRange)?;
        return Ok(Value::Int { value, ty: floor });
    }
    [
        LiteralType::Int32,
        LiteralType::UInt32,
        LiteralType::Int64,
        LiteralType::UInt64,
    ]
    .into_iter()
    .filter(|ty| *ty >= floor)
    .find(|ty| ty.can_hold(value))
    .map(|ty| Value::Int { value, ty })
    .ok_or(EvalError::OutOfRange)
}

fn flag(b: bool) -> Value {
    Value::Int {
        value: i128::from(b),
        ty: LiteralType::Int32,
    }
}

struct Evaluator<'c> {
    ctx: &'c dyn EvalContext,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Int(lit) => {
                // an unsigned suffix never widens into a signed type
                match integer_result(i128::from(lit.value), lit.floor)? {
                    Value::Int { value, ty } if lit.unsigned && !ty.is_unsigned() => Ok(Value::Int {
                        value,
                        ty: LiteralType::UInt64,
                    }),
                    other => Ok(other),
                }
            }
            Expr::Float { value, single } => Ok(Value::Float {
                value: *value,
                single: *single,
            }),
            Expr::Char(c) => Ok(Value::Char(*c)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Ident(name) => match self.ctx.lookup_value(name) {
                Lookup::Found(v) => Ok(Value::from_evaluated(v)),
                Lookup::Pending => Err(EvalError::PendingIdentifier { name: name.clone() }),
                Lookup::Unknown => Err(EvalError::UnknownIdentifier { name: name.clone() }),
            },
            Expr::Unary { op, operand } => self.unary(*op, self.eval(operand)?),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval(condition)?.truthy()? {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            Expr::Cast {
                target,
                pointer,
                operand,
            } => self.cast(target, *pointer, self.eval(operand)?),
        }
    }

    fn unary(&self, op: UnaryOp, value: Value) -> Result<Value, EvalError> {
        if let Value::Float { value, single } = value {
            return match op {
                UnaryOp::Neg => Ok(Value::Float {
                    value: -value,
                    single,
                }),
                UnaryOp::Plus => Ok(Value::Float { value, single }),
                UnaryOp::LogicalNot => Ok(flag(value == 0.0)),
                UnaryOp::BitwiseNot => Err(unsupported("~ on floating value")),
            };
        }
        let (v, ty) = value
            .promoted()
            .ok_or_else(|| unsupported(format!("{op:?} on string")))?;
        match op {
            UnaryOp::Neg => integer_result(-v, ty),
            UnaryOp::Plus => integer_result(v, ty),
            UnaryOp::LogicalNot => Ok(flag(v == 0)),
            UnaryOp::BitwiseNot => {
                let inverted = wrap_to(!v, ty).ok_or(EvalError::OutOfRange)?;
                Ok(Value::Int { value: inverted, ty })
            }
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        let lhs = self.eval(left)?;

        // short-circuit: the untaken side may name something unevaluated
        match op {
            BinaryOp::LogicalAnd if !lhs.truthy()? => return Ok(flag(false)),
            BinaryOp::LogicalOr if lhs.truthy()? => return Ok(flag(true)),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                return Ok(flag(self.eval(right)?.truthy()?));
            }
            _ => {}
        }

        let rhs = self.eval(right)?;
        if matches!(lhs, Value::Float { .. }) || matches!(rhs, Value::Float { .. }) {
            return float_binary(op, &lhs, &rhs);
        }

        let (a, lty) = lhs
            .promoted()
            .ok_or_else(|| unsupported(format!("{op} on string")))?;
        let (b, rty) = rhs
            .promoted()
            .ok_or_else(|| unsupported(format!("{op} on string")))?;
        let ty = lty.max(rty);

        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a.checked_mul(b).ok_or(EvalError::OutOfRange)?,
            BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
                let amount = u32::try_from(b)
                    .ok()
                    .filter(|n| *n < 64)
                    .ok_or(EvalError::OutOfRange)?;
                // the left operand alone decides the result type
                let value = if op == BinaryOp::ShiftLeft {
                    a << amount
                } else {
                    a >> amount
                };
                return integer_result(value, lty);
            }
            BinaryOp::BitwiseAnd => a & b,
            BinaryOp::BitwiseOr => a | b,
            BinaryOp::BitwiseXor => a ^ b,
            BinaryOp::Equal => return Ok(flag(a == b)),
            BinaryOp::NotEqual => return Ok(flag(a != b)),
            BinaryOp::Less => return Ok(flag(a < b)),
            BinaryOp::LessEqual => return Ok(flag(a <= b)),
            BinaryOp::Greater => return Ok(flag(a > b)),
            BinaryOp::GreaterEqual => return Ok(flag(a >= b)),
            BinaryOp::LogicalAnd => return Ok(flag(a != 0 && b != 0)),
            BinaryOp::LogicalOr => return Ok(flag(a != 0 || b != 0)),
        };
        integer_result(value, ty)
    }

    fn cast(&self, target: &str, pointer: bool, value: Value) -> Result<Value, EvalError> {
        let kind = if pointer {
            CastTarget::Opaque
        } else {
            self.ctx.cast_target(target)
        };
        match kind {
            CastTarget::Integer(ty) => {
                let v = match value {
                    Value::Float { value, .. } if value.is_finite() => value.trunc() as i128,
                    Value::Float { .. } => return Err(EvalError::OutOfRange),
                    ref other => other
                        .promoted()
                        .map(|(v, _)| v)
                        .ok_or_else(|| unsupported(format!("({target}) on string")))?,
                };
                let value = wrap_to(v, ty).ok_or(EvalError::OutOfRange)?;
                Ok(Value::Int { value, ty })
            }
            CastTarget::Floating { single } => {
                let (v, _) = value
                    .as_float()
                    .ok_or_else(|| unsupported(format!("({target}) on string")))?;
                Ok(Value::Float { value: v, single })
            }
            CastTarget::Boolean => Ok(Value::Bool(value.truthy()?)),
            CastTarget::Opaque => Err(unsupported(format!(
                "({target}{})",
                if pointer { "*" } else { "" }
            ))),
            CastTarget::NotAType => Err(EvalError::UnknownIdentifier {
                name: target.to_string(),
            }),
        }
    }
}

fn float_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let operands = lhs.as_float().zip(rhs.as_float());
    let Some(((a, a_single), (b, b_single))) = operands else {
        return Err(unsupported(format!("{op} on string")));
    };
    let single = a_single && b_single;
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Equal => return Ok(flag(a == b)),
        BinaryOp::NotEqual => return Ok(flag(a != b)),
        BinaryOp::Less => return Ok(flag(a < b)),
        BinaryOp::LessEqual => return Ok(flag(a <= b)),
        BinaryOp::Greater => return Ok(flag(a > b)),
        BinaryOp::GreaterEqual => return Ok(flag(a >= b)),
        other => return Err(unsupported(format!("{other} on floating values"))),
    };
    Ok(Value::Float { value, single })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct MapContext {
        values: FxHashMap<String, EvaluatedValue>,
        pending: Vec<String>,
    }

    impl MapContext {
        fn with(mut self, name: &str, value: EvaluatedValue) -> Self {
            self.values.insert(name.to_string(), value);
            self
        }
    }

    impl EvalContext for MapContext {
        fn lookup_value(&self, name: &str) -> Lookup {
            if let Some(v) = self.values.get(name) {
                Lookup::Found(v.clone())
            } else if self.pending.iter().any(|p| p == name) {
                Lookup::Pending
            } else {
                Lookup::Unknown
            }
        }

        fn cast_target(&self, name: &str) -> CastTarget {
            match name {
                "DWORD" | "UINT" => CastTarget::Integer(LiteralType::UInt32),
                "HANDLE" => CastTarget::Opaque,
                _ => BuiltinType::from_c_name(name)
                    .map(CastTarget::from_builtin)
                    .unwrap_or(CastTarget::NotAType),
            }
        }
    }

    fn eval(src: &str) -> EvaluatedValue {
        evaluate_str(src, &MapContext::default()).unwrap()
    }

    fn int(value: i128, ty: LiteralType) -> EvaluatedValue {
        EvaluatedValue::integer_as(value, ty).unwrap()
    }

    #[test]
    fn narrowest_integer_types() {
        assert_eq!(eval("0x1"), int(1, LiteralType::Int32));
        assert_eq!(eval("0x7FFFFFFF"), int(0x7FFF_FFFF, LiteralType::Int32));
        assert_eq!(eval("0x80000000"), int(0x8000_0000, LiteralType::UInt32));
        assert_eq!(eval("0x100000000"), int(0x1_0000_0000, LiteralType::Int64));
        assert_eq!(
            eval("0xFFFFFFFFFFFFFFFF"),
            int(i128::from(u64::MAX), LiteralType::UInt64)
        );
        assert_eq!(eval("-1"), int(-1, LiteralType::Int32));
        assert_eq!(eval("1u"), int(1, LiteralType::UInt32));
        assert_eq!(eval("1i64"), int(1, LiteralType::Int64));
    }

    #[test]
    fn arithmetic_and_bitwise() {
        assert_eq!(eval("(1 << 4) | 3"), int(19, LiteralType::Int32));
        assert_eq!(eval("7 / 2"), int(3, LiteralType::Int32));
        assert_eq!(eval("-7 % 3"), int(-1, LiteralType::Int32));
        assert_eq!(eval("0xF0 & 0x3C ^ 1"), int(0x31, LiteralType::Int32));
        assert_eq!(eval("~0"), int(-1, LiteralType::Int32));
        assert_eq!(eval("~0u"), int(0xFFFF_FFFF, LiteralType::UInt32));
        assert_eq!(eval("0x7FFFFFFF + 1"), int(0x8000_0000, LiteralType::UInt32));
        assert_eq!(eval("0u - 1"), int(0xFFFF_FFFF, LiteralType::UInt32));
    }

    #[test]
    fn comparisons_logic_and_ternary() {
        assert_eq!(eval("3 > 2 && 1 == 1"), int(1, LiteralType::Int32));
        assert_eq!(eval("!5"), int(0, LiteralType::Int32));
        assert_eq!(eval("0 ? 10 : 20"), int(20, LiteralType::Int32));
        // untaken side is not evaluated
        assert_eq!(eval("0 && MISSING"), int(0, LiteralType::Int32));
        assert_eq!(eval("1 ? 2 : MISSING"), int(2, LiteralType::Int32));
    }

    #[test]
    fn casts_fix_the_type() {
        let ctx = MapContext::default();
        assert_eq!(
            evaluate_str("((DWORD)-1)", &ctx).unwrap(),
            int(0xFFFF_FFFF, LiteralType::UInt32)
        );
        assert_eq!(
            evaluate_str("(unsigned char)0x1FF", &ctx).unwrap(),
            int(0xFF, LiteralType::Byte)
        );
        assert_eq!(
            evaluate_str("(short)0x8000", &ctx).unwrap(),
            int(-0x8000, LiteralType::Int16)
        );
        assert_eq!(evaluate_str("(double)1", &ctx).unwrap(), EvaluatedValue::double(1.0));
        assert!(matches!(
            evaluate_str("((HANDLE)-1)", &ctx),
            Err(EvalError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn non_integer_literals() {
        assert_eq!(eval("'a'"), EvaluatedValue::character('a'));
        assert_eq!(eval("L\"wide\""), EvaluatedValue::string("wide"));
        assert_eq!(eval("true"), EvaluatedValue::boolean(true));
        assert_eq!(eval("1.5"), EvaluatedValue::double(1.5));
        assert_eq!(eval("2.0f * 2"), EvaluatedValue::single(4.0));
        assert_eq!(eval("'a' + 1"), int(98, LiteralType::Int32));
    }

    #[test]
    fn identifiers() {
        let ctx = MapContext::default().with("WM_PAINT", EvaluatedValue::integer(0xF).unwrap());
        assert_eq!(evaluate_str("WM_PAINT", &ctx).unwrap(), eval("0xF"));
        assert_eq!(
            evaluate_str("WM_PAINT + 1", &ctx).unwrap(),
            int(16, LiteralType::Int32)
        );

        let ctx = MapContext {
            pending: vec!["LATER".to_string()],
            ..MapContext::default()
        };
        assert!(evaluate_str("LATER + 1", &ctx).unwrap_err().is_pending());
        assert_eq!(
            evaluate_str("NOPE", &ctx),
            Err(EvalError::UnknownIdentifier { name: "NOPE".into() })
        );
    }

    #[test]
    fn failures() {
        let ctx = MapContext::default();
        assert_eq!(evaluate_str("1 / 0", &ctx), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate_str("1 << 64", &ctx), Err(EvalError::OutOfRange));
        assert_eq!(evaluate_str("", &ctx), Err(EvalError::EmptyExpression));
        assert_eq!(
            evaluate_str("0xFFFFFFFFFFFFFFFF + 1", &ctx),
            Err(EvalError::OutOfRange)
        );
        assert!(matches!(
            evaluate_str("\"a\" + 1", &ctx),
            Err(EvalError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            evaluate_str("1.0 % 2", &ctx),
            Err(EvalError::UnsupportedOperator { .. })
        ));
    }
}
