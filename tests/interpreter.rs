use std::{cell::RefCell, io::Cursor, rc::Rc};

use lispr::{
    diagnostics::{EvalError, LispError, ParseError},
    environment::Environment,
    runtime::{eval, ExecutionContext, Interpreter},
    stdlib::StdIo,
    value::{Builtin, Value, ValueKind},
    BuiltinRegistry,
};

fn eval_src(source: &str) -> Value {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> EvalError {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(LispError::Eval(err)) => err,
        Err(other) => panic!("expected eval error, received {other}"),
    }
}

fn expect_int(value: &Value) -> i64 {
    match value.kind() {
        ValueKind::Int(n) => *n,
        _ => panic!("expected int, found {}", value.type_name()),
    }
}

fn expect_float(value: &Value) -> f64 {
    match value.kind() {
        ValueKind::Float(f) => *f,
        _ => panic!("expected float, found {}", value.type_name()),
    }
}

#[test]
fn literals_evaluate_to_themselves() {
    for n in [0_i64, 7, 42, 123_456_789] {
        assert_eq!(expect_int(&eval_src(&n.to_string())), n);
    }
    assert_eq!(expect_float(&eval_src("2.75")), 2.75);
    assert_eq!(eval_src("\"hi\""), Value::string("hi"));
    assert!(eval_src("").is_unit());
    assert!(eval_src("()").is_unit());
}

#[test]
fn evaluates_basic_arithmetic() {
    assert_eq!(expect_int(&eval_src("(+ 1 2)")), 3);
    assert_eq!(expect_int(&eval_src("(* (+ 1 1) 3)")), 6);
    assert_eq!(expect_int(&eval_src("(- 10 4)")), 6);
    assert_eq!(expect_int(&eval_src("(/ 7 2)")), 3);
    assert_eq!(expect_int(&eval_src("(+)")), 0);
    assert_eq!(expect_int(&eval_src("(*)")), 1);
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(expect_float(&eval_src("(+ 1 2.5)")), 3.5);
    assert_eq!(expect_float(&eval_src("(- 2.5 1)")), 1.5);
    assert_eq!(expect_float(&eval_src("(/ 1 2.0)")), 0.5);
}

#[test]
fn division_by_zero_fails() {
    assert_eq!(eval_error("(/ 1 0)"), EvalError::DivisionByZero);
    assert_eq!(eval_error("(/ 1.5 0.0)"), EvalError::DivisionByZero);
}

#[test]
fn arithmetic_rejects_non_numbers() {
    assert!(matches!(
        eval_error("(+ 1 \"two\")"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn quote_suppresses_evaluation() {
    assert_eq!(eval_src("'a"), Value::atom("a"));
    assert_eq!(
        eval_src("'(undefined 1)"),
        Value::list(vec![Value::atom("undefined"), Value::int(1)])
    );
    assert_eq!(eval_src("''a"), Value::quote(Value::atom("a")));
}

#[test]
fn unbound_atom_fails() {
    assert_eq!(
        eval_error("nope"),
        EvalError::UnboundSymbol("nope".to_string())
    );
}

#[test]
fn calling_a_non_callable_fails() {
    assert!(matches!(eval_error("(1 2)"), EvalError::NotCallable(_)));
    assert!(matches!(eval_error("(\"f\")"), EvalError::NotCallable(_)));
}

#[test]
fn lambda_arity_is_exact() {
    assert!(matches!(
        eval_error("((lambda (x y) x) 1)"),
        EvalError::TooFewArguments {
            expected: 2,
            received: 1,
            ..
        }
    ));
    assert!(matches!(
        eval_error("((lambda (x y) x) 1 2 3)"),
        EvalError::TooManyArguments {
            expected: 2,
            received: 3,
            ..
        }
    ));
    assert_eq!(expect_int(&eval_src("((lambda (x y) x) (+ 1 1) 5)")), 2);
}

#[test]
fn lambda_parameters_must_be_atoms() {
    assert!(matches!(
        eval_error("((lambda (1) 1) 2)"),
        EvalError::InvalidLambda(_)
    ));
    assert!(matches!(
        eval_error("(lambda x x)"),
        EvalError::InvalidLambda(_)
    ));
}

#[test]
fn if_only_evaluates_selected_branch() {
    assert_eq!(expect_int(&eval_src("(if 0 (undefined_atom) 5)")), 5);
    assert_eq!(expect_int(&eval_src("(if 1 7 (undefined_atom))")), 7);
    assert_eq!(expect_int(&eval_src("(if \"\" 1 2)")), 2);
    assert_eq!(expect_int(&eval_src("(if nil 1 2)")), 2);
    assert_eq!(expect_int(&eval_src("(if 0.5 1 2)")), 1);
}

#[test]
fn if_rejects_untyped_conditions() {
    assert!(matches!(
        eval_error("(if '(1) 1 2)"),
        EvalError::TypeMismatch(_)
    ));
    assert!(matches!(
        eval_error("(if 1 2)"),
        EvalError::TooFewArguments { .. }
    ));
}

#[test]
fn closure_outlives_defining_call() {
    assert_eq!(
        expect_int(&eval_src("(((lambda (x) (lambda (y) (+ x y))) 3) 4)")),
        7
    );
}

#[test]
fn closure_captures_at_construction_time() {
    let value = eval_src(
        r#"
        (define x 1)
        (define get-x (lambda () x))
        (define x 2)
        (get-x)
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn recursive_lambda_resolves_through_caller() {
    let value = eval_src(
        r#"
        (define fact (lambda (n) (if (<= n 1) 1 (* n (fact (- n 1))))))
        (fact 10)
        "#,
    );
    assert_eq!(expect_int(&value), 3_628_800);
}

#[test]
fn nested_calls_of_same_lambda_keep_their_own_parameters() {
    let value = eval_src(
        r#"
        (define f (lambda (a b) (+ a b)))
        (f (f 1 2) (f 10 20))
        "#,
    );
    assert_eq!(expect_int(&value), 33);
}

#[test]
fn parameter_survives_recursive_call() {
    let value = eval_src(
        r#"
        (define g (lambda (n) (if (<= n 0) 0 (+ (g (- n 1)) n))))
        (g 4)
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn unit_equality_is_symmetric() {
    assert_eq!(expect_int(&eval_src("(== nil 1)")), 0);
    assert_eq!(expect_int(&eval_src("(== 1 nil)")), 0);
    assert_eq!(expect_int(&eval_src("(!= \"a\" nil)")), 1);
}

#[test]
fn let_binds_in_fresh_scope() {
    assert_eq!(expect_int(&eval_src("(let (x 4) (* x x))")), 16);
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source("(let (tmp 1) tmp)")
        .expect("let should succeed");
    assert!(matches!(
        interpreter.eval_source("tmp"),
        Err(LispError::Eval(EvalError::UnboundSymbol(_)))
    ));
}

#[test]
fn let_rejects_malformed_bindings() {
    assert!(matches!(
        eval_error("(let (1 2) 3)"),
        EvalError::TypeMismatch(_)
    ));
    assert!(matches!(
        eval_error("(let (x) 3)"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn equality_follows_numeric_and_unit_rules() {
    assert_eq!(expect_int(&eval_src("(== 1 1.0)")), 1);
    assert_eq!(expect_int(&eval_src("(== \"a\" \"b\")")), 0);
    assert_eq!(expect_int(&eval_src("(!= 1 2)")), 1);
    assert_eq!(expect_int(&eval_src("(== nil nil)")), 1);
    assert_eq!(expect_int(&eval_src("(== nil 0)")), 0);
    assert!(matches!(
        eval_error("(== \"1\" 1)"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn comparisons_are_numeric() {
    assert_eq!(expect_int(&eval_src("(< 1 2)")), 1);
    assert_eq!(expect_int(&eval_src("(>= 2 2.5)")), 0);
    assert!(matches!(
        eval_error("(< \"a\" \"b\")"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn list_builtins() {
    assert_eq!(expect_int(&eval_src("(head '(4 5 6))")), 4);
    assert_eq!(
        eval_src("(tail '(4 5 6))"),
        Value::list(vec![Value::int(5), Value::int(6)])
    );
    assert!(eval_src("(tail '(4))").is_unit());
    assert!(eval_src("(head '())").is_unit());
    assert_eq!(
        eval_src("(range 3)"),
        Value::list(vec![Value::int(0), Value::int(1), Value::int(2)])
    );
    assert_eq!(
        eval_src("(list 1 (+ 1 1))"),
        Value::list(vec![Value::int(1), Value::int(2)])
    );
}

#[test]
fn higher_order_builtins() {
    assert_eq!(
        eval_src("(map (range 3) (lambda (x) (* x 10)))"),
        Value::list(vec![Value::int(0), Value::int(10), Value::int(20)])
    );
    assert_eq!(
        eval_src("(filter (range 6) even?)"),
        Value::list(vec![Value::int(0), Value::int(2), Value::int(4)])
    );
    assert_eq!(expect_int(&eval_src("(fold (range 5) + 0)")), 10);
    assert_eq!(
        eval_src("(zip '(1 2) '(a b))"),
        Value::list(vec![
            Value::list(vec![Value::int(1), Value::atom("a")]),
            Value::list(vec![Value::int(2), Value::atom("b")]),
        ])
    );
    assert!(matches!(
        eval_error("(zip '(1) '(1 2))"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn builtins_receive_elements_unchanged() {
    assert_eq!(
        eval_src("(map '(\"a\" \"b\") upper)"),
        Value::list(vec![Value::string("A"), Value::string("B")])
    );
    assert_eq!(
        eval_src("(map '(a b) to_str)"),
        Value::list(vec![Value::string("a : atom"), Value::string("b : atom")])
    );
}

#[test]
fn number_and_string_builtins() {
    assert_eq!(expect_int(&eval_src("(abs (- 0 5))")), 5);
    assert_eq!(expect_int(&eval_src("(odd? 3)")), 1);
    assert_eq!(expect_int(&eval_src("(even? 3.9)")), 0);
    assert_eq!(eval_src("(lower \"AbC\")"), Value::string("abc"));
    assert_eq!(eval_src("(to_str 3)"), Value::string("3 : int"));
    assert!(matches!(
        eval_error("(upper 1)"),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn builtin_arity_mismatch_is_distinct() {
    assert!(matches!(
        eval_error("(- 1)"),
        EvalError::TooFewArguments { .. }
    ));
    assert!(matches!(
        eval_error("(abs 1 2)"),
        EvalError::TooManyArguments { .. }
    ));
}

#[test]
fn metacircular_parse_and_eval() {
    assert_eq!(expect_int(&eval_src("(eval (parse \"(+ 1 2)\"))")), 3);
    assert_eq!(expect_int(&eval_src("(eval '(* 2 21))")), 42);
    let mut interpreter = Interpreter::new();
    assert!(matches!(
        interpreter.eval_source("(parse \"(1\")"),
        Err(LispError::Parse(ParseError::UnterminatedList { .. }))
    ));
}

#[test]
fn failures_keep_earlier_bindings() {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source("(define kept 5)")
        .expect("define should succeed");
    assert!(interpreter.eval_source("(define lost (undefined))").is_err());
    assert_eq!(
        expect_int(&interpreter.eval_source("kept").expect("kept is bound")),
        5
    );
    assert!(interpreter.eval_source("lost").is_err());
}

#[test]
fn print_and_input_use_injected_streams() {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let io = StdIo::new(Cursor::new(b"hello\nworld\n".to_vec()), buffer.clone());
    let mut interpreter = Interpreter::with_io(ExecutionContext::default(), io);
    let value = interpreter
        .eval_source("(print (upper (input))) (input)")
        .expect("io should succeed");
    assert_eq!(value, Value::string("world"));
    assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "HELLO\n");
}

#[test]
fn bare_interpreter_has_no_prelude() {
    let mut interpreter = Interpreter::with_context(ExecutionContext {
        source_name: None,
        prelude: false,
    });
    assert!(!interpreter.context().prelude);
    assert!(interpreter.env().borrow().is_empty());
    assert!(matches!(
        interpreter.eval_source("(+ 1 2)"),
        Err(LispError::Eval(EvalError::UnboundSymbol(_)))
    ));
    assert_eq!(
        expect_int(&interpreter.eval_source("42").expect("literal")),
        42
    );
}

#[test]
fn custom_builtins_receive_unevaluated_arguments() {
    let env = Environment::new();
    let mut registry = BuiltinRegistry::new();
    assert!(registry.is_empty());
    registry.register("quote-first", |args, _env| Ok(args[0].clone()));
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["quote-first"]);
    registry.install(&env);
    let form = lispr::parser::parse("(quote-first (missing))").expect("parse");
    assert_eq!(
        eval(&form, &env).expect("eval"),
        Value::list(vec![Value::atom("missing")])
    );
    assert!(matches!(
        registry.get("quote-first"),
        Some(Builtin { name, .. }) if name == "quote-first"
    ));
}

#[test]
fn environment_lookup_delegates_to_parent() {
    let root = Environment::new();
    root.borrow_mut().set("a", Value::int(1));
    let child = Environment::with_parent(root.clone());
    child.borrow_mut().set("b", Value::int(2));
    assert_eq!(Environment::get(&child, "a"), Some(Value::int(1)));
    assert_eq!(Environment::get(&child, "b"), Some(Value::int(2)));
    assert_eq!(Environment::get(&root, "b"), None);

    let other = Environment::new();
    other.borrow_mut().set("a", Value::int(9));
    child.borrow_mut().combine(&other.borrow());
    assert_eq!(Environment::get(&child, "a"), Some(Value::int(9)));
    assert_eq!(Environment::get(&root, "a"), Some(Value::int(1)));
}

#[test]
fn set_parent_rebinds_lookup_chain() {
    let first = Environment::new();
    first.borrow_mut().set("v", Value::string("first"));
    let second = Environment::new();
    second.borrow_mut().set("v", Value::string("second"));

    let child = Environment::with_parent(first);
    assert_eq!(Environment::get(&child, "v"), Some(Value::string("first")));
    child.borrow_mut().set_parent(second.clone());
    assert_eq!(Environment::get(&child, "v"), Some(Value::string("second")));
    assert!(Rc::ptr_eq(
        child.borrow().parent().expect("parent is set"),
        &second
    ));
    assert_eq!(child.borrow().len(), 0);
}
