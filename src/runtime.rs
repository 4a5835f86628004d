use log::{debug, trace};

use crate::{
    builtin::BuiltinRegistry,
    diagnostics::{EvalError, LispError, Result},
    environment::{Environment, EnvironmentRef},
    parser,
    stdlib::{self, StdIo},
    value::{Lambda, Value, ValueKind},
};

/// Evaluates `value` in `env`.
///
/// Builtins receive their arguments unevaluated and decide themselves what to
/// evaluate; lambda arguments are evaluated left to right before the call.
pub fn eval(value: &Value, env: &EnvironmentRef) -> Result<Value> {
    match value.kind() {
        ValueKind::Unit
        | ValueKind::Int(_)
        | ValueKind::Float(_)
        | ValueKind::String(_)
        | ValueKind::Lambda(_)
        | ValueKind::Builtin(_) => Ok(value.clone()),
        ValueKind::Atom(name) => Environment::get(env, name)
            .ok_or_else(|| EvalError::UnboundSymbol(name.clone()).into()),
        ValueKind::Quote(inner) => Ok(inner.clone()),
        ValueKind::List(items) => {
            let Some((head, rest)) = items.split_first() else {
                return Ok(Value::unit());
            };
            let callee = eval(head, env)?;
            match callee.kind() {
                ValueKind::Builtin(_) => apply(&callee, rest, env),
                ValueKind::Lambda(_) => {
                    let args = rest
                        .iter()
                        .map(|arg| eval(arg, env))
                        .collect::<Result<Vec<_>>>()?;
                    apply(&callee, &args, env)
                }
                _ => Err(EvalError::NotCallable(callee.to_string()).into()),
            }
        }
    }
}

/// Applies a callable. Lambda arguments must already be evaluated; builtin
/// arguments are passed through as given.
pub fn apply(callable: &Value, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    match callable.kind() {
        ValueKind::Lambda(lambda) => apply_lambda(lambda, args, env),
        ValueKind::Builtin(builtin) => {
            trace!("applying builtin `{}` to {} args", builtin.name, args.len());
            builtin.call(args, env)
        }
        _ => Err(EvalError::NotCallable(callable.to_string()).into()),
    }
}

/// Each call gets its own scope, parented to the caller and seeded with the
/// captured closure, so nested or recursive calls never share parameter slots.
fn apply_lambda(lambda: &Lambda, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    EvalError::check_arity("lambda", lambda.params.len(), args.len())?;
    let scope = Environment::with_parent(env.clone());
    {
        let mut frame = scope.borrow_mut();
        frame.combine(&lambda.closure.borrow());
        for (param, arg) in lambda.params.iter().zip(args) {
            let name = param.as_atom().ok_or_else(|| {
                EvalError::InvalidLambda(format!("parameter `{param}` is not an atom"))
            })?;
            frame.set(name, arg.clone());
        }
    }
    trace!("applying lambda to {} args", args.len());
    eval(&lambda.body, &scope)
}

/// Builds a lambda, capturing only the free atoms of `body` that resolve in `env`.
pub fn make_lambda(params: Vec<Value>, body: Value, env: &EnvironmentRef) -> Value {
    let closure = Environment::new();
    {
        let mut captured = closure.borrow_mut();
        for atom in body.atoms() {
            if let Some(value) = Environment::get(env, &atom) {
                captured.set(atom, value);
            }
        }
    }
    Value::new(ValueKind::Lambda(Lambda {
        params,
        body,
        closure,
    }))
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Name used to prefix reported positions.
    pub source_name: Option<String>,
    /// Install the standard library into the root scope.
    pub prelude: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            source_name: None,
            prelude: true,
        }
    }
}

/// Owns a persistent root scope. Bindings made by successful evaluations
/// survive failures of later ones.
pub struct Interpreter {
    env: EnvironmentRef,
    context: ExecutionContext,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        Self::with_io(context, StdIo::default())
    }

    pub fn with_io(context: ExecutionContext, io: StdIo) -> Self {
        let env = Environment::new();
        if context.prelude {
            let mut registry = BuiltinRegistry::new();
            stdlib::register(&mut registry, io);
            registry.install(&env);
            stdlib::install_constants(&env);
            debug!("installed {} builtins into root scope", registry.len());
        }
        Self { env, context }
    }

    pub fn env(&self) -> &EnvironmentRef {
        &self.env
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Parses and evaluates every top-level form, returning the last result
    /// (Unit for empty input).
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let forms = parser::parse_all(source)?;
        debug!("evaluating {} top-level forms", forms.len());
        let mut last = Value::unit();
        for form in &forms {
            last = eval(form, &self.env)?;
        }
        Ok(last)
    }

    pub fn eval(&mut self, value: &Value) -> Result<Value> {
        eval(value, &self.env)
    }

    /// Renders `err`, prefixing positions with the configured source name.
    pub fn report(&self, err: &LispError) -> String {
        err.report(self.context.source_name.as_deref())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
