//! Constant folding of literal arithmetic.
//!
//! `reduce` never transforms a node partially: a binary expression either
//! becomes a single literal or comes back with (already reduced) children and
//! the same operator.

use super::{BinaryExpression, BinaryOperator, Expression, ExpressionKind};
use crate::error::FoldError;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;

/// Big-integer shifts with a larger count are left for the runtime.
const MAX_FOLDED_SHIFT: usize = 1 << 16;

impl Expression {
    /// Returns a simpler, equivalent expression, or a copy of `self`.
    ///
    /// Folds integer and big-integer arithmetic (`+ - * /`), shifts and
    /// comparisons when both operands are literals of the same kind.
    /// Integer division by zero is an error rather than a missed fold.
    pub fn reduce(&self) -> Result<Expression, FoldError> {
        let ExpressionKind::Binary(binary) = &self.kind else {
            return Ok(self.clone());
        };

        let left = binary.left.reduce()?;
        let right = binary.right.reduce()?;

        let folded = match (&left.kind, &right.kind) {
            (ExpressionKind::Integer(a), ExpressionKind::Integer(b)) => {
                fold_integer(binary.operator, *a, *b, self)?
            }
            (ExpressionKind::BigInteger(a), ExpressionKind::BigInteger(b)) => {
                fold_big_integer(binary.operator, a, b, self)?
            }
            _ => None,
        };

        Ok(folded
            .map(|kind| Expression::new(kind, self.location.clone()))
            .unwrap_or_else(|| {
                Expression::new(
                    ExpressionKind::Binary(BinaryExpression {
                        operator: binary.operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                    self.location.clone(),
                )
            }))
    }
}

fn compare(operator: BinaryOperator, ordering: Ordering) -> Option<ExpressionKind> {
    let result = match operator {
        BinaryOperator::Equals => ordering == Ordering::Equal,
        BinaryOperator::NotEquals => ordering != Ordering::Equal,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        BinaryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        _ => return None,
    };
    Some(ExpressionKind::Boolean(result))
}

fn fold_integer(
    operator: BinaryOperator,
    a: i64,
    b: i64,
    node: &Expression,
) -> Result<Option<ExpressionKind>, FoldError> {
    // Wrapping matches the runtime's unchecked 64-bit arithmetic.
    let value = match operator {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Sub => a.wrapping_sub(b),
        BinaryOperator::Mul => a.wrapping_mul(b),
        BinaryOperator::Div => {
            if b == 0 {
                return Err(FoldError::DivisionByZero(node.location.clone()));
            }
            a.checked_div(b)
                .ok_or_else(|| FoldError::Overflow(node.location.clone()))?
        }
        BinaryOperator::LeftShift => a.wrapping_shl(b as u32),
        BinaryOperator::RightShift => a.wrapping_shr(b as u32),
        op if op.is_comparison() => return Ok(compare(op, a.cmp(&b))),
        _ => return Ok(None),
    };
    Ok(Some(ExpressionKind::Integer(value)))
}

fn fold_big_integer(
    operator: BinaryOperator,
    a: &BigInt,
    b: &BigInt,
    node: &Expression,
) -> Result<Option<ExpressionKind>, FoldError> {
    let value = match operator {
        BinaryOperator::Add => a + b,
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div => {
            if b.is_zero() {
                return Err(FoldError::DivisionByZero(node.location.clone()));
            }
            a / b
        }
        BinaryOperator::LeftShift | BinaryOperator::RightShift => {
            let Some(count) = b.to_usize().filter(|c| *c <= MAX_FOLDED_SHIFT) else {
                return Ok(None);
            };
            if operator == BinaryOperator::LeftShift {
                a << count
            } else {
                a >> count
            }
        }
        op if op.is_comparison() => return Ok(compare(op, a.cmp(b))),
        _ => return Ok(None),
    };
    Ok(Some(ExpressionKind::BigInteger(value)))
}
