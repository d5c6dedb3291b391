use std::collections::HashMap;
use std::fmt;

/// Name of the lazy sequence type a spread parameter is exposed as.
pub const ITERATOR_TYPE: &str = "Iterator";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Named(String, Vec<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { size: usize, ty: Box<TypeExpr> },
    Reference { mutable: bool, ty: Box<TypeExpr> },
    Tuple(Vec<TypeExpr>),
    Dyn(String),
    Unit,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into(), Vec::new())
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named(name.into(), args)
    }

    pub fn shared_ref(ty: TypeExpr) -> Self {
        TypeExpr::Reference {
            mutable: false,
            ty: Box::new(ty),
        }
    }

    pub fn unique_ref(ty: TypeExpr) -> Self {
        TypeExpr::Reference {
            mutable: true,
            ty: Box::new(ty),
        }
    }

    pub fn slice(ty: TypeExpr) -> Self {
        TypeExpr::Slice(Box::new(ty))
    }

    /// `Iterator[item]`, the static type of a synthesized spread argument.
    pub fn iterator(item: TypeExpr) -> Self {
        TypeExpr::Named(ITERATOR_TYPE.into(), vec![item])
    }

    pub fn iterator_item(&self) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Named(name, args) if name == ITERATOR_TYPE && args.len() == 1 => {
                args.first()
            }
            _ => None,
        }
    }

    /// Slices and `dyn` objects have no static size; aggregates inherit sizedness from their
    /// parts. References and named types are always sized.
    pub fn is_sized(&self) -> bool {
        match self {
            TypeExpr::Slice(_) | TypeExpr::Dyn(_) => false,
            TypeExpr::Array { ty, .. } => ty.is_sized(),
            TypeExpr::Tuple(types) => types.iter().all(TypeExpr::is_sized),
            TypeExpr::Named(..) | TypeExpr::Reference { .. } | TypeExpr::Unit => true,
        }
    }

    pub fn substitute(&self, map: &HashMap<String, TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::Named(name, args) => {
                if args.is_empty() {
                    map.get(name)
                        .cloned()
                        .unwrap_or_else(|| TypeExpr::Named(name.clone(), Vec::new()))
                } else {
                    TypeExpr::Named(
                        name.clone(),
                        args.iter().map(|ty| ty.substitute(map)).collect(),
                    )
                }
            }
            TypeExpr::Slice(inner) => TypeExpr::Slice(Box::new(inner.substitute(map))),
            TypeExpr::Array { size, ty } => TypeExpr::Array {
                size: *size,
                ty: Box::new(ty.substitute(map)),
            },
            TypeExpr::Reference { mutable, ty } => TypeExpr::Reference {
                mutable: *mutable,
                ty: Box::new(ty.substitute(map)),
            },
            TypeExpr::Tuple(types) => {
                TypeExpr::Tuple(types.iter().map(|ty| ty.substitute(map)).collect())
            }
            TypeExpr::Dyn(name) => TypeExpr::Dyn(name.clone()),
            TypeExpr::Unit => TypeExpr::Unit,
        }
    }

    pub fn canonical_name(&self) -> String {
        match self {
            TypeExpr::Named(name, args) => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let rendered: Vec<String> = args.iter().map(|ty| ty.canonical_name()).collect();
                    format!("{}[{}]", name, rendered.join(","))
                }
            }
            TypeExpr::Slice(inner) => format!("[]{}", inner.canonical_name()),
            TypeExpr::Array { size, ty } => format!("[{};{}]", ty.canonical_name(), size),
            TypeExpr::Reference { mutable, ty } => {
                if *mutable {
                    format!("&mut {}", ty.canonical_name())
                } else {
                    format!("&{}", ty.canonical_name())
                }
            }
            TypeExpr::Tuple(types) => {
                let rendered: Vec<String> = types.iter().map(|ty| ty.canonical_name()).collect();
                format!("({})", rendered.join(","))
            }
            TypeExpr::Dyn(name) => format!("dyn {name}"),
            TypeExpr::Unit => "()".into(),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}
