use crate::runtime::seq::LazySeq;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Int(i128),
    Bool(bool),
    String(String),
    Rune(char),
    Tuple(Vec<Value>),
    Range(RangeValue),
    Reference(ReferenceValue),
    Slice(SliceValue),
    Seq(Box<LazySeq>),
    Moved,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Rune(_) => "rune",
            Value::Tuple(_) => "tuple",
            Value::Range(_) => "range",
            Value::Reference(_) => "reference",
            Value::Slice(_) => "Slice",
            Value::Seq(_) => "Iterator",
            Value::Moved => "moved",
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn into_seq(self) -> Option<LazySeq> {
        match self {
            Value::Seq(seq) => Some(*seq),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Rune(v) => write!(f, "{v}"),
            Value::Tuple(values) => {
                write!(f, "(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Value::Range(range) => write!(
                f,
                "{}{}{}",
                range.start,
                if range.inclusive { "..=" } else { ".." },
                range.end
            ),
            Value::Reference(reference) => write!(f, "&{}", reference.cell.borrow()),
            Value::Slice(slice) => {
                write!(f, "[")?;
                for (idx, value) in slice.items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Seq(_) => write!(f, "<iterator>"),
            Value::Moved => write!(f, "<moved>"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReferenceValue {
    pub cell: Rc<RefCell<Value>>,
    pub mutable: bool,
    pub origin: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i128,
    pub end: i128,
    pub inclusive: bool,
}

#[derive(Clone, Debug)]
pub struct SliceValue {
    pub items: Rc<RefCell<Vec<Value>>>,
}

impl SliceValue {
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }
}
