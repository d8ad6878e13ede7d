//! Evaluation of parsed conditions against the live process state.

use serde_json::Value;

use super::parser::{Ast, CmpOp, Path, Root, Segment};
use crate::error::ExprError;
use crate::state::{GlobalState, Section};

pub(crate) fn eval(ast: &Ast, state: &GlobalState) -> Result<Value, ExprError> {
    match ast {
        Ast::Or(operands) => {
            for operand in operands {
                if truthy(&eval(operand, state)?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Ast::And(operands) => {
            for operand in operands {
                if !truthy(&eval(operand, state)?) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Ast::Not(operand) => Ok(Value::Bool(!truthy(&eval(operand, state)?))),
        Ast::Compare { lhs, op, rhs } => {
            let left = eval(lhs, state)?;
            let right = eval(rhs, state)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        Ast::IsNone { operand, negated } => {
            let value = eval(operand, state)?;
            let is_null = value.is_null();
            Ok(Value::Bool(if *negated { !is_null } else { is_null }))
        }
        Ast::Literal(value) => Ok(value.clone()),
        Ast::Path(path) => Ok(resolve(path, state)),
        Ast::Len(path) => length(&resolve(path, state)).map(Value::from),
    }
}

/// Python-style truthiness over JSON values.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, ExprError> {
    match op {
        CmpOp::Eq => Ok(loose_eq(left, right)),
        CmpOp::Ne => Ok(!loose_eq(left, right)),
        ordering => {
            // Ordering against null never matches, never raises.
            if left.is_null() || right.is_null() {
                return Ok(false);
            }
            let result = match (left, right) {
                (Value::Number(a), Value::Number(b)) => {
                    let (a, b) = (
                        a.as_f64().unwrap_or(f64::NAN),
                        b.as_f64().unwrap_or(f64::NAN),
                    );
                    match ordering {
                        CmpOp::Lt => a < b,
                        CmpOp::Le => a <= b,
                        CmpOp::Gt => a > b,
                        CmpOp::Ge => a >= b,
                        _ => unreachable!(),
                    }
                }
                (Value::String(a), Value::String(b)) => match ordering {
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                    _ => unreachable!(),
                },
                _ => {
                    return Err(ExprError::Incomparable {
                        left: type_name(left),
                        right: type_name(right),
                    })
                }
            };
            Ok(result)
        }
    }
}

/// Equality with numeric cross-representation tolerance (`1 == 1.0`).
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn length(value: &Value) -> Result<usize, ExprError> {
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(items) => Ok(items.len()),
        Value::Object(map) => Ok(map.len()),
        other => Err(ExprError::NotAContainer(type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn resolve(path: &Path, state: &GlobalState) -> Value {
    let section: &Section = match path.root {
        Root::Context => &state.context,
        Root::Artifacts => &state.artifacts,
        Root::Quality => &state.quality,
    };

    let mut segments = path.segments.iter();
    let mut current = match segments.next() {
        Some(Segment::Field(key)) => match section.get(key) {
            Some(value) => value.clone(),
            None => return Value::Null,
        },
        // An index directly on a section never resolves; a bare root
        // yields the whole section.
        Some(Segment::Index(_)) => return Value::Null,
        None => return Value::Object(section.clone()),
    };

    for segment in segments {
        current = match (&current, segment) {
            (Value::Object(map), Segment::Field(key)) => match map.get(key) {
                Some(value) => value.clone(),
                None => return Value::Null,
            },
            (Value::Array(items), Segment::Index(index)) => match items.get(*index) {
                Some(value) => value.clone(),
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current
}
