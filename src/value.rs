use std::{fmt, rc::Rc};

use indexmap::IndexSet;

use crate::{
    diagnostics::{EvalError, Result},
    environment::EnvironmentRef,
};

/// Native function signature. Arguments arrive unevaluated, together with the
/// caller's scope.
pub type NativeFn = Rc<dyn Fn(&[Value], &EnvironmentRef) -> Result<Value>>;

/// A datum that is both syntax and runtime value. Cloning shares the
/// underlying node; nodes are never mutated after construction.
#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

#[derive(Clone)]
pub enum ValueKind {
    Unit,
    Atom(String),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Quote(Value),
    Lambda(Lambda),
    Builtin(Builtin),
}

#[derive(Clone)]
pub struct Lambda {
    /// Parameter forms as written; each must be an Atom to be applicable.
    pub params: Vec<Value>,
    pub body: Value,
    /// Free atoms of `body` resolved in the defining scope. Has no parent.
    pub closure: EnvironmentRef,
}

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub function: NativeFn,
}

impl Builtin {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value], &EnvironmentRef) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            function: Rc::new(function),
        }
    }

    pub fn call(&self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        (self.function)(args, env)
    }
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn unit() -> Self {
        Self::new(ValueKind::Unit)
    }

    pub fn atom(name: impl Into<String>) -> Self {
        Self::new(ValueKind::Atom(name.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::new(ValueKind::List(values))
    }

    pub fn quote(inner: Value) -> Self {
        Self::new(ValueKind::Quote(inner))
    }

    pub fn bool(value: bool) -> Self {
        Self::int(i64::from(value))
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Self::new(ValueKind::Builtin(builtin))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Unit => "unit",
            ValueKind::Atom(_) => "atom",
            ValueKind::Int(_) => "int",
            ValueKind::Float(_) => "float",
            ValueKind::String(_) => "str",
            ValueKind::List(_) => "list",
            ValueKind::Quote(_) => "quote",
            ValueKind::Lambda(_) => "lambda",
            ValueKind::Builtin(_) => "builtin",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind(), ValueKind::Unit)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self.kind() {
            ValueKind::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.kind() {
            ValueKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Values that evaluate to themselves.
    pub fn is_self_evaluating(&self) -> bool {
        !matches!(
            self.kind(),
            ValueKind::Atom(_) | ValueKind::List(_) | ValueKind::Quote(_)
        )
    }

    /// Unit, zero and the empty string are false; other kinds have no truth value.
    pub fn truthiness(&self) -> std::result::Result<bool, EvalError> {
        match self.kind() {
            ValueKind::Unit => Ok(false),
            ValueKind::Int(n) => Ok(*n != 0),
            ValueKind::Float(f) => Ok(*f != 0.0),
            ValueKind::String(s) => Ok(!s.is_empty()),
            _ => Err(EvalError::type_mismatch(format!(
                "condition must be int, float, str or unit, found {}",
                self.type_name()
            ))),
        }
    }

    /// Every distinct atom name occurring in this value, in order of first
    /// appearance. Quotes and lambda bodies are walked too.
    pub fn atoms(&self) -> IndexSet<String> {
        let mut atoms = IndexSet::new();
        self.collect_atoms(&mut atoms);
        atoms
    }

    fn collect_atoms(&self, atoms: &mut IndexSet<String>) {
        match self.kind() {
            ValueKind::Atom(name) => {
                atoms.insert(name.clone());
            }
            ValueKind::Quote(inner) => inner.collect_atoms(atoms),
            ValueKind::Lambda(lambda) => lambda.body.collect_atoms(atoms),
            ValueKind::List(items) => {
                for item in items {
                    item.collect_atoms(atoms);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Unit => write!(f, "Unit"),
            ValueKind::Atom(name) => write!(f, "Atom({name})"),
            ValueKind::Int(n) => write!(f, "Int({n})"),
            ValueKind::Float(n) => write!(f, "Float({n:?})"),
            ValueKind::String(s) => write!(f, "String({s:?})"),
            ValueKind::List(items) => f.debug_list().entries(items.iter()).finish(),
            ValueKind::Quote(inner) => write!(f, "Quote({inner:?})"),
            ValueKind::Lambda(lambda) => f
                .debug_struct("Lambda")
                .field("params", &lambda.params)
                .field("body", &lambda.body)
                .finish_non_exhaustive(),
            ValueKind::Builtin(builtin) => write!(f, "Builtin({})", builtin.name),
        }
    }
}

/// Canonical rendering, as printed by the REPL.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Unit => write!(f, "unit"),
            ValueKind::Atom(name) => write!(f, "{name} : atom"),
            ValueKind::Int(n) => write!(f, "{n} : int"),
            ValueKind::Float(n) => write!(f, "{n:?} : float"),
            ValueKind::String(s) => write!(f, "\"{s}\" : str"),
            ValueKind::List(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            ValueKind::Quote(inner) => write!(f, "'{inner}"),
            ValueKind::Lambda(_) => write!(f, "<lambda>"),
            ValueKind::Builtin(_) => write!(f, "<builtin>"),
        }
    }
}

/// Structural equality over data. Lambdas and builtins compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind(), other.kind()) {
            (ValueKind::Unit, ValueKind::Unit) => true,
            (ValueKind::Atom(a), ValueKind::Atom(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => a == b,
            (ValueKind::Quote(a), ValueKind::Quote(b)) => a == b,
            (ValueKind::Lambda(_), ValueKind::Lambda(_))
            | (ValueKind::Builtin(_), ValueKind::Builtin(_)) => Rc::ptr_eq(&self.0, &other.0),
            _ => false,
        }
    }
}
