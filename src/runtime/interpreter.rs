use crate::language::ast::{ElaboratedCall, Expr, Literal, RangeExpr, SeqExpr};
use crate::runtime::{
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    seq::LazySeq,
    value::{RangeValue, ReferenceValue, SliceValue, Value},
};
use std::cell::RefCell;
use std::rc::Rc;

/// Arguments of an elaborated call after evaluation, ready to bind to parameters.
#[derive(Debug)]
pub struct EvaluatedCall {
    pub callee: String,
    pub fixed: Vec<Value>,
    pub spread: Option<LazySeq>,
}

/// Evaluates call arguments, including synthesized spread sequences.
///
/// Every identifier read, borrow, or move is appended to the access trace, which records the
/// order argument expressions were evaluated in.
#[derive(Default)]
pub struct Interpreter {
    env: Environment,
    trace: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, value: Value) {
        self.env.declare(name, value, false);
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Evaluates fixed arguments, then the spread argument, left to right. Spread sources are
    /// evaluated here; their items are produced only when the returned sequence is iterated.
    pub fn eval_call(&mut self, call: &ElaboratedCall) -> RuntimeResult<EvaluatedCall> {
        let mut fixed = Vec::with_capacity(call.fixed.len());
        for arg in &call.fixed {
            fixed.push(self.eval_expression(&arg.expr)?);
        }
        let spread = match &call.spread {
            Some(spread) => Some(self.eval_seq(&spread.seq)?),
            None => None,
        };
        Ok(EvaluatedCall {
            callee: call.callee.clone(),
            fixed,
            spread,
        })
    }

    pub fn eval_expression(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Identifier(ident) => {
                self.trace.push(ident.name.clone());
                let value =
                    self.env
                        .get(&ident.name)
                        .ok_or_else(|| RuntimeError::UnknownSymbol {
                            name: ident.name.clone(),
                        })?;
                if matches!(value, Value::Moved) {
                    return Err(RuntimeError::MovedValue {
                        name: ident.name.clone(),
                    });
                }
                Ok(value)
            }
            Expr::Literal(lit) => Ok(match lit {
                Literal::Int(v, _) => Value::Int(*v),
                Literal::Bool(v, _) => Value::Bool(*v),
                Literal::String(v, _) => Value::String(v.clone()),
                Literal::Rune(v, _) => Value::Rune(*v),
            }),
            Expr::Tuple(values, _) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    items.push(self.eval_expression(value)?);
                }
                Ok(Value::Tuple(items))
            }
            Expr::ArrayLiteral(values, _) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    items.push(self.eval_expression(value)?);
                }
                Ok(Value::Slice(SliceValue::from_vec(items)))
            }
            Expr::Range(range) => self.eval_range(range),
            Expr::Reference { mutable, expr, .. } => self.build_reference(expr, *mutable),
            Expr::Move { expr, .. } => self.eval_move_expression(expr),
            Expr::Seq(seq, _) => Ok(Value::Seq(Box::new(self.eval_seq(seq)?))),
        }
    }

    pub fn eval_seq(&mut self, seq: &SeqExpr) -> RuntimeResult<LazySeq> {
        match seq {
            SeqExpr::Empty { .. } => Ok(LazySeq::empty()),
            SeqExpr::Once { value, .. } => Ok(LazySeq::once(self.eval_expression(value)?)),
            SeqExpr::Owned { source, .. } => LazySeq::owned(self.eval_expression(source)?),
            SeqExpr::Copied { source, .. } => LazySeq::borrowed(self.eval_expression(source)?),
            SeqExpr::Chain { left, right, .. } => {
                let left = self.eval_seq(left)?;
                let right = self.eval_seq(right)?;
                Ok(LazySeq::chain(left, right))
            }
        }
    }

    fn eval_range(&mut self, range: &RangeExpr) -> RuntimeResult<Value> {
        let start = self.eval_expression(&range.start)?;
        let end = self.eval_expression(&range.end)?;
        match (start.as_int(), end.as_int()) {
            (Some(start), Some(end)) => Ok(Value::Range(RangeValue {
                start,
                end,
                inclusive: range.inclusive,
            })),
            _ => Err(RuntimeError::TypeMismatch {
                message: format!(
                    "range bounds must be integers, found {} and {}",
                    start.type_name(),
                    end.type_name()
                ),
            }),
        }
    }

    fn build_reference(&mut self, expr: &Expr, mutable: bool) -> RuntimeResult<Value> {
        match expr {
            Expr::Identifier(ident) => {
                self.trace.push(ident.name.clone());
                let (cell, _) =
                    self.env
                        .get_cell(&ident.name)
                        .ok_or_else(|| RuntimeError::UnknownSymbol {
                            name: ident.name.clone(),
                        })?;
                if matches!(*cell.borrow(), Value::Moved) {
                    return Err(RuntimeError::MovedValue {
                        name: ident.name.clone(),
                    });
                }
                Ok(Value::Reference(ReferenceValue {
                    cell,
                    mutable,
                    origin: Some(ident.name.clone()),
                }))
            }
            _ => {
                let value = self.eval_expression(expr)?;
                Ok(Value::Reference(ReferenceValue {
                    cell: Rc::new(RefCell::new(value)),
                    mutable,
                    origin: None,
                }))
            }
        }
    }

    fn eval_move_expression(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Identifier(ident) => {
                self.trace.push(ident.name.clone());
                self.env.take(&ident.name)
            }
            _ => Err(RuntimeError::Unsupported {
                message: "move expressions require identifiers".into(),
            }),
        }
    }
}
