//! Tree-walking evaluation over an explicit [`Env`].

use crate::expr::parser::{BinaryOp, CmpOp, Node, UnaryOp};
use crate::expr::{Env, ExprError, Value};
use std::cmp::Ordering;

pub struct Evaluator<'a> {
    src: &'a str,
    env: &'a Env,
}

impl<'a> Evaluator<'a> {
    pub fn new(src: &'a str, env: &'a Env) -> Self {
        Self { src, env }
    }

    fn mismatch(&self, message: String) -> ExprError {
        ExprError::TypeMismatch {
            expr: self.src.to_string(),
            message,
        }
    }

    pub fn eval(&self, node: &Node) -> Result<Value, ExprError> {
        match node {
            Node::Literal(v) => Ok(v.clone()),
            Node::Name(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::NameReference {
                    expr: self.src.to_string(),
                    name: name.clone(),
                }),
            Node::Unary(op, inner) => {
                let v = self.eval(inner)?;
                let n = v.as_number().ok_or_else(|| {
                    self.mismatch(format!("bad operand type for unary op: {}", v.type_name()))
                })?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -n,
                    UnaryOp::Pos => n,
                }))
            }
            Node::Binary(op, l, r) => {
                let lhs = self.eval(l)?;
                let rhs = self.eval(r)?;
                self.binary(*op, lhs, rhs)
            }
            Node::Compare(first, rest) => {
                let mut lhs = self.eval(first)?;
                for (op, node) in rest {
                    let rhs = self.eval(node)?;
                    if !self.compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Node::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Node::And(l, r) => {
                let lhs = self.eval(l)?;
                if !lhs.is_truthy() {
                    return Ok(lhs);
                }
                self.eval(r)
            }
            Node::Or(l, r) => {
                let lhs = self.eval(l)?;
                if lhs.is_truthy() {
                    return Ok(lhs);
                }
                self.eval(r)
            }
        }
    }

    fn binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
        if let (BinaryOp::Add, Value::Str(a), Value::Str(b)) = (op, &lhs, &rhs) {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }

        let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
            return Err(self.mismatch(format!(
                "unsupported operand types for {}: {} and {}",
                binary_symbol(op),
                lhs.type_name(),
                rhs.type_name()
            )));
        };

        let n = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::FloorDiv => (a / b).floor(),
            // Result takes the sign of the divisor.
            BinaryOp::Mod => a - b * (a / b).floor(),
            BinaryOp::Pow => a.powf(b),
        };
        Ok(Value::Number(n))
    }

    fn compare(&self, op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ExprError> {
        match op {
            CmpOp::Eq => return Ok(values_equal(lhs, rhs)),
            CmpOp::Ne => return Ok(!values_equal(lhs, rhs)),
            _ => {}
        }

        let ordering = match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => match (lhs.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return Err(self.mismatch(format!(
                        "'{}' not supported between {} and {}",
                        cmp_symbol(op),
                        lhs.type_name(),
                        rhs.type_name()
                    )));
                }
            },
        };

        // NaN compares false against everything.
        let Some(ordering) = ordering else {
            return Ok(false);
        };

        Ok(match op {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
        })
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
    }
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
    }
}
