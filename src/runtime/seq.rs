use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{RangeValue, ReferenceValue, Value},
};
use std::cell::RefCell;
use std::rc::Rc;

/// Lazy sequence of values: the runtime form of a spread argument.
///
/// Iteration is single-pass and consumes the sequence. A sequence is restartable only when
/// every underlying source is: borrowed collections and ranges can be re-read from their start,
/// while moved-in values and collections are gone once yielded.
#[derive(Clone, Debug)]
pub struct LazySeq {
    source: Source,
}

#[derive(Clone, Debug)]
enum Source {
    Empty,
    Once(Option<Value>),
    Items {
        items: Rc<RefCell<Vec<Value>>>,
        next: usize,
    },
    Borrowed {
        cell: Rc<RefCell<Value>>,
        next: usize,
    },
    Chars {
        text: Rc<str>,
        offset: usize,
    },
    Range {
        start: i128,
        next: i128,
        end: i128,
        inclusive: bool,
        exhausted: bool,
    },
    Chain {
        left: Box<LazySeq>,
        right: Box<LazySeq>,
    },
}

impl LazySeq {
    pub fn empty() -> Self {
        Self {
            source: Source::Empty,
        }
    }

    pub fn once(value: Value) -> Self {
        Self {
            source: Source::Once(Some(value)),
        }
    }

    pub fn chain(left: LazySeq, right: LazySeq) -> Self {
        Self {
            source: Source::Chain {
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Takes ownership of an iterable value. A reference to a collection is read in place.
    pub fn owned(value: Value) -> RuntimeResult<Self> {
        let source = match value {
            Value::Slice(slice) => Source::Items {
                items: slice.items,
                next: 0,
            },
            Value::String(text) => Source::Chars {
                text: Rc::from(text),
                offset: 0,
            },
            Value::Range(range) => range_source(range),
            Value::Seq(seq) => return Ok(*seq),
            Value::Reference(reference) => return owned_through_reference(&reference),
            Value::Moved => {
                return Err(RuntimeError::Unsupported {
                    message: "cannot iterate a moved value".into(),
                })
            }
            other => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!("{} is not iterable", other.type_name()),
                })
            }
        };
        Ok(Self { source })
    }

    /// Reads a borrowed collection without moving it, duplicating each item as it is yielded.
    pub fn borrowed(value: Value) -> RuntimeResult<Self> {
        let reference = match value {
            Value::Reference(reference) => reference,
            other => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!("expected a reference, found {}", other.type_name()),
                })
            }
        };
        if !matches!(*reference.cell.borrow(), Value::Slice(_)) {
            return Err(RuntimeError::TypeMismatch {
                message: format!(
                    "borrowed iteration needs a collection, found {}",
                    reference.cell.borrow().type_name()
                ),
            });
        }
        Ok(Self {
            source: Source::Borrowed {
                cell: reference.cell,
                next: 0,
            },
        })
    }

    pub fn is_restartable(&self) -> bool {
        match &self.source {
            Source::Empty | Source::Borrowed { .. } | Source::Range { .. } => true,
            Source::Once(_) | Source::Items { .. } | Source::Chars { .. } => false,
            Source::Chain { left, right } => left.is_restartable() && right.is_restartable(),
        }
    }

    /// A fresh sequence positioned at the start, if every source can be re-read.
    pub fn restart(&self) -> Option<LazySeq> {
        let source = match &self.source {
            Source::Empty => Source::Empty,
            Source::Borrowed { cell, .. } => Source::Borrowed {
                cell: cell.clone(),
                next: 0,
            },
            Source::Range {
                start,
                end,
                inclusive,
                ..
            } => Source::Range {
                start: *start,
                next: *start,
                end: *end,
                inclusive: *inclusive,
                exhausted: false,
            },
            Source::Chain { left, right } => Source::Chain {
                left: Box::new(left.restart()?),
                right: Box::new(right.restart()?),
            },
            Source::Once(_) | Source::Items { .. } | Source::Chars { .. } => return None,
        };
        Some(Self { source })
    }
}

fn range_source(range: RangeValue) -> Source {
    Source::Range {
        start: range.start,
        next: range.start,
        end: range.end,
        inclusive: range.inclusive,
        exhausted: false,
    }
}

fn owned_through_reference(reference: &ReferenceValue) -> RuntimeResult<LazySeq> {
    match &*reference.cell.borrow() {
        Value::String(text) => Ok(LazySeq {
            source: Source::Chars {
                text: Rc::from(text.as_str()),
                offset: 0,
            },
        }),
        Value::Range(range) => Ok(LazySeq {
            source: range_source(*range),
        }),
        Value::Slice(_) => Ok(LazySeq {
            source: Source::Borrowed {
                cell: reference.cell.clone(),
                next: 0,
            },
        }),
        other => Err(RuntimeError::Unsupported {
            message: format!("cannot take items of {} through a reference", other.type_name()),
        }),
    }
}

impl Iterator for LazySeq {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match &mut self.source {
            Source::Empty => None,
            Source::Once(value) => value.take(),
            Source::Items { items, next } => {
                let item = items.borrow().get(*next).cloned()?;
                *next += 1;
                Some(item)
            }
            Source::Borrowed { cell, next } => {
                let item = match &*cell.borrow() {
                    Value::Slice(slice) => slice.get(*next)?,
                    _ => return None,
                };
                *next += 1;
                Some(item)
            }
            Source::Chars { text, offset } => {
                let ch = text[*offset..].chars().next()?;
                *offset += ch.len_utf8();
                Some(Value::Rune(ch))
            }
            Source::Range {
                next,
                end,
                inclusive,
                exhausted,
                ..
            } => {
                let past_end = if *inclusive { *next > *end } else { *next >= *end };
                if *exhausted || past_end {
                    *exhausted = true;
                    return None;
                }
                let value = *next;
                // Never step past `end`.
                if value == *end {
                    *exhausted = true;
                } else {
                    *next += 1;
                }
                Some(Value::Int(value))
            }
            Source::Chain { left, right } => left.next().or_else(|| right.next()),
        }
    }
}
