use std::{
    cell::RefCell,
    io::{self, BufRead, Write},
    rc::Rc,
};

use crate::{
    builtin::BuiltinRegistry,
    diagnostics::{EvalError, Result},
    environment::{Environment, EnvironmentRef},
    parser,
    runtime::{apply, eval, make_lambda},
    value::{Value, ValueKind},
};

/// Source of lines for `input`.
pub enum Input {
    Stdin,
    Reader(Box<dyn BufRead>),
}

impl Input {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            Input::Stdin => io::stdin().read_line(buf),
            Input::Reader(reader) => reader.read_line(buf),
        }
    }
}

/// Streams used by `print` and `input`.
#[derive(Clone)]
pub struct StdIo {
    pub input: Rc<RefCell<Input>>,
    pub output: Rc<RefCell<dyn Write>>,
}

impl StdIo {
    pub fn new(input: impl BufRead + 'static, output: Rc<RefCell<dyn Write>>) -> Self {
        Self {
            input: Rc::new(RefCell::new(Input::Reader(Box::new(input)))),
            output,
        }
    }
}

impl Default for StdIo {
    fn default() -> Self {
        Self {
            input: Rc::new(RefCell::new(Input::Stdin)),
            output: Rc::new(RefCell::new(io::stdout())),
        }
    }
}

pub fn register(registry: &mut BuiltinRegistry, io: StdIo) {
    registry
        .register("lambda", lambda)
        .register("let", let_binding)
        .register("define", define)
        .register("if", if_expr)
        .register("list", list);

    registry
        .register("map", map)
        .register("zip", zip)
        .register("fold", fold)
        .register("filter", filter);

    registry
        .register("+", plus)
        .register("-", minus)
        .register("*", times)
        .register("/", divide);

    registry
        .register("==", |args, env| equality(args, env, "==", true))
        .register("!=", |args, env| equality(args, env, "!=", false))
        .register("<", |args, env| comparison(args, env, "<", |a, b| a < b, |a, b| a < b))
        .register(">", |args, env| comparison(args, env, ">", |a, b| a > b, |a, b| a > b))
        .register("<=", |args, env| {
            comparison(args, env, "<=", |a, b| a <= b, |a, b| a <= b)
        })
        .register(">=", |args, env| {
            comparison(args, env, ">=", |a, b| a >= b, |a, b| a >= b)
        });

    registry
        .register("abs", abs)
        .register("odd?", |args, env| parity(args, env, "odd?", true))
        .register("even?", |args, env| parity(args, env, "even?", false));

    registry
        .register("upper", |args, env| {
            map_string(args, env, "upper", |s| s.to_uppercase())
        })
        .register("lower", |args, env| {
            map_string(args, env, "lower", |s| s.to_lowercase())
        })
        .register("to_str", to_str);

    registry
        .register("head", head)
        .register("tail", tail)
        .register("range", range);

    let StdIo { input, output } = io;
    registry
        .register("print", move |args, env| io_print(&output, args, env))
        .register("input", move |args, _env| io_input(&input, args));

    registry
        .register("parse", meta_parse)
        .register("eval", meta_eval);
}

/// Non-callable bindings of the root scope.
pub fn install_constants(env: &EnvironmentRef) {
    env.borrow_mut().set("nil", Value::unit());
}

fn ensure_exact(args: &[Value], expected: usize, name: &str) -> Result<()> {
    Ok(EvalError::check_arity(name, expected, args.len())?)
}

fn ensure_min(args: &[Value], min: usize, name: &str) -> Result<()> {
    Ok(EvalError::check_min_arity(name, min, args.len())?)
}

fn eval_args(args: &[Value], env: &EnvironmentRef) -> Result<Vec<Value>> {
    args.iter().map(|arg| eval(arg, env)).collect()
}

fn expect_string<'v>(value: &'v Value, name: &str) -> Result<&'v str> {
    match value.kind() {
        ValueKind::String(s) => Ok(s),
        _ => Err(EvalError::type_mismatch(format!(
            "`{name}` expected str but found {}",
            value.type_name()
        ))
        .into()),
    }
}

fn expect_int(value: &Value, name: &str) -> Result<i64> {
    match value.kind() {
        ValueKind::Int(n) => Ok(*n),
        _ => Err(EvalError::type_mismatch(format!(
            "`{name}` expected int but found {}",
            value.type_name()
        ))
        .into()),
    }
}

fn expect_list<'v>(value: &'v Value, name: &str) -> Result<&'v [Value]> {
    value.as_list().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "`{name}` expected list but found {}",
            value.type_name()
        ))
        .into()
    })
}

fn expect_atom<'v>(value: &'v Value, name: &str) -> Result<&'v str> {
    value.as_atom().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "`{name}` binding name must be an atom, found {}",
            value.type_name()
        ))
        .into()
    })
}

fn lambda(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_min(args, 2, "lambda")?;
    let params = args[0].as_list().ok_or_else(|| {
        EvalError::InvalidLambda(format!("expected parameter list, found {}", args[0]))
    })?;
    Ok(make_lambda(params.to_vec(), args[1].clone(), env))
}

fn let_binding(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 2, "let")?;
    let binding = expect_list(&args[0], "let")?;
    if binding.len() != 2 {
        return Err(EvalError::type_mismatch(format!(
            "`let` binding must be a (name value) pair, found {} elements",
            binding.len()
        ))
        .into());
    }
    let name = expect_atom(&binding[0], "let")?;
    let value = eval(&binding[1], env)?;
    let scope = Environment::with_parent(env.clone());
    scope.borrow_mut().set(name, value);
    eval(&args[1], &scope)
}

fn define(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 2, "define")?;
    let name = expect_atom(&args[0], "define")?;
    let value = eval(&args[1], env)?;
    env.borrow_mut().set(name, value.clone());
    Ok(value)
}

fn if_expr(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 3, "if")?;
    if eval(&args[0], env)?.truthiness()? {
        eval(&args[1], env)
    } else {
        eval(&args[2], env)
    }
}

fn list(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::list(eval_args(args, env)?))
}

/// Applies `callable` to already-evaluated values. Builtins evaluate what they
/// receive, so values that are not self-evaluating are quoted first.
fn call_with(callable: &Value, values: Vec<Value>, env: &EnvironmentRef) -> Result<Value> {
    let args: Vec<Value> = match callable.kind() {
        ValueKind::Builtin(_) => values
            .into_iter()
            .map(|value| {
                if value.is_self_evaluating() {
                    value
                } else {
                    Value::quote(value)
                }
            })
            .collect(),
        _ => values,
    };
    apply(callable, &args, env)
}

fn map(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 2, "map")?;
    let args = eval_args(args, env)?;
    let items = expect_list(&args[0], "map")?;
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        result.push(call_with(&args[1], vec![item.clone()], env)?);
    }
    Ok(Value::list(result))
}

fn filter(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 2, "filter")?;
    let args = eval_args(args, env)?;
    let items = expect_list(&args[0], "filter")?;
    let mut result = Vec::new();
    for item in items {
        if call_with(&args[1], vec![item.clone()], env)?.truthiness()? {
            result.push(item.clone());
        }
    }
    Ok(Value::list(result))
}

fn fold(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 3, "fold")?;
    let args = eval_args(args, env)?;
    let items = expect_list(&args[0], "fold")?;
    let mut acc = args[2].clone();
    for item in items {
        acc = call_with(&args[1], vec![acc, item.clone()], env)?;
    }
    Ok(acc)
}

fn zip(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 2, "zip")?;
    let args = eval_args(args, env)?;
    let left = expect_list(&args[0], "zip")?;
    let right = expect_list(&args[1], "zip")?;
    if left.len() != right.len() {
        return Err(EvalError::type_mismatch(format!(
            "`zip` expected lists of equal length, found {} and {}",
            left.len(),
            right.len()
        ))
        .into());
    }
    let pairs = left
        .iter()
        .zip(right)
        .map(|(l, r)| Value::list(vec![l.clone(), r.clone()]))
        .collect();
    Ok(Value::list(pairs))
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value, name: &str) -> Result<Number> {
        match value.kind() {
            ValueKind::Int(n) => Ok(Number::Int(*n)),
            ValueKind::Float(f) => Ok(Number::Float(*f)),
            _ => Err(EvalError::type_mismatch(format!(
                "`{name}` expected numeric operand but found {}",
                value.type_name()
            ))
            .into()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// Int with Int stays Int; any Float operand promotes both sides.
    fn combine(
        self,
        rhs: Number,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => Number::Int(int_op(a, b)),
            (a, b) => Number::Float(float_op(a.as_f64(), b.as_f64())),
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Int(n) => Value::int(n),
            Number::Float(f) => Value::float(f),
        }
    }
}

fn variadic(
    args: &[Value],
    env: &EnvironmentRef,
    name: &str,
    identity: i64,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let args = eval_args(args, env)?;
    let mut acc = Number::Int(identity);
    for (idx, arg) in args.iter().enumerate() {
        let operand = Number::from_value(arg, name)?;
        acc = if idx == 0 {
            operand
        } else {
            acc.combine(operand, int_op, float_op)
        };
    }
    Ok(acc.into())
}

fn binary_operands(args: &[Value], env: &EnvironmentRef, name: &str) -> Result<(Number, Number)> {
    ensure_exact(args, 2, name)?;
    let args = eval_args(args, env)?;
    Ok((
        Number::from_value(&args[0], name)?,
        Number::from_value(&args[1], name)?,
    ))
}

fn plus(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    variadic(args, env, "+", 0, i64::wrapping_add, |a, b| a + b)
}

fn times(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    variadic(args, env, "*", 1, i64::wrapping_mul, |a, b| a * b)
}

fn minus(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    let (lhs, rhs) = binary_operands(args, env, "-")?;
    Ok(lhs.combine(rhs, i64::wrapping_sub, |a, b| a - b).into())
}

fn divide(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    let (lhs, rhs) = binary_operands(args, env, "/")?;
    if rhs.is_zero() {
        return Err(EvalError::DivisionByZero.into());
    }
    Ok(lhs.combine(rhs, i64::wrapping_div, |a, b| a / b).into())
}

fn comparison(
    args: &[Value],
    env: &EnvironmentRef,
    name: &str,
    int_cmp: fn(i64, i64) -> bool,
    float_cmp: fn(f64, f64) -> bool,
) -> Result<Value> {
    let (lhs, rhs) = binary_operands(args, env, name)?;
    let result = match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => int_cmp(a, b),
        (a, b) => float_cmp(a.as_f64(), b.as_f64()),
    };
    Ok(Value::bool(result))
}

fn values_equal(lhs: &Value, rhs: &Value) -> Result<bool> {
    match (lhs.kind(), rhs.kind()) {
        (ValueKind::Unit, _) => Ok(rhs.is_unit()),
        (_, ValueKind::Unit) => Ok(false),
        (ValueKind::Int(a), ValueKind::Int(b)) => Ok(a == b),
        (ValueKind::Int(_) | ValueKind::Float(_), ValueKind::Int(_) | ValueKind::Float(_)) => {
            Ok(Number::from_value(lhs, "==")?.as_f64() == Number::from_value(rhs, "==")?.as_f64())
        }
        (ValueKind::String(a), ValueKind::String(b)) => Ok(a == b),
        (ValueKind::Int(_) | ValueKind::Float(_), _) => Err(EvalError::type_mismatch(format!(
            "cannot compare numeric value with {}",
            rhs.type_name()
        ))
        .into()),
        (ValueKind::String(_), _) => Err(EvalError::type_mismatch(format!(
            "cannot compare str with {}",
            rhs.type_name()
        ))
        .into()),
        _ => Err(EvalError::type_mismatch(format!(
            "only int, float, str and unit values can be compared, found {}",
            lhs.type_name()
        ))
        .into()),
    }
}

fn equality(args: &[Value], env: &EnvironmentRef, name: &str, expected: bool) -> Result<Value> {
    ensure_exact(args, 2, name)?;
    let args = eval_args(args, env)?;
    Ok(Value::bool(values_equal(&args[0], &args[1])? == expected))
}

fn abs(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "abs")?;
    let value = eval(&args[0], env)?;
    Ok(match Number::from_value(&value, "abs")? {
        Number::Int(n) => Value::int(n.wrapping_abs()),
        Number::Float(f) => Value::float(f.abs()),
    })
}

fn parity(args: &[Value], env: &EnvironmentRef, name: &str, odd: bool) -> Result<Value> {
    ensure_exact(args, 1, name)?;
    let value = eval(&args[0], env)?;
    let n = match Number::from_value(&value, name)? {
        Number::Int(n) => n,
        Number::Float(f) => f.trunc() as i64,
    };
    Ok(Value::bool((n % 2 != 0) == odd))
}

fn map_string(
    args: &[Value],
    env: &EnvironmentRef,
    name: &str,
    transform: fn(&str) -> String,
) -> Result<Value> {
    ensure_exact(args, 1, name)?;
    let value = eval(&args[0], env)?;
    Ok(Value::string(transform(expect_string(&value, name)?)))
}

fn to_str(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "to_str")?;
    Ok(Value::string(eval(&args[0], env)?.to_string()))
}

fn head(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "head")?;
    let value = eval(&args[0], env)?;
    let items = expect_list(&value, "head")?;
    Ok(items.first().cloned().unwrap_or_else(Value::unit))
}

/// Unit when no elements would remain.
fn tail(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "tail")?;
    let value = eval(&args[0], env)?;
    let items = expect_list(&value, "tail")?;
    if items.len() <= 1 {
        return Ok(Value::unit());
    }
    Ok(Value::list(items[1..].to_vec()))
}

fn range(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "range")?;
    let value = eval(&args[0], env)?;
    let end = expect_int(&value, "range")?;
    Ok(Value::list((0..end).map(Value::int).collect()))
}

fn io_print(output: &RefCell<dyn Write>, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "print")?;
    let value = eval(&args[0], env)?;
    let text = expect_string(&value, "print")?;
    let mut out = output.borrow_mut();
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(Value::unit())
}

fn io_input(input: &RefCell<Input>, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 0, "input")?;
    let mut line = String::new();
    input.borrow_mut().read_line(&mut line)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::string(line))
}

fn meta_parse(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "parse")?;
    let value = eval(&args[0], env)?;
    Ok(parser::parse(expect_string(&value, "parse")?)?)
}

fn meta_eval(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_exact(args, 1, "eval")?;
    let value = eval(&args[0], env)?;
    eval(&value, env)
}
