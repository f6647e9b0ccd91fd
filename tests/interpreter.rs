use selene::{
    diagnostics::{DiagnosticKind, SeleneError},
    runtime::Interpreter,
    value::Value,
};

fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::new();
    interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_error(source: &str) -> SeleneError {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_kind(source: &str, kind: DiagnosticKind) -> String {
    let err = eval_error(source);
    assert_eq!(err.diagnostic_kind(), Some(kind), "{err}");
    format!("{err}")
}

fn expect_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        _ => panic!("expected Int, found {}", value.type_name()),
    }
}

fn expect_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        _ => panic!("expected Bool, found {}", value.type_name()),
    }
}

fn expect_double(value: &Value) -> f64 {
    match value {
        Value::Double(n) => *n,
        _ => panic!("expected Double, found {}", value.type_name()),
    }
}

fn expect_string(value: &Value) -> &str {
    match value {
        Value::String(s) => s,
        _ => panic!("expected String, found {}", value.type_name()),
    }
}

fn expect_array(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        _ => panic!("expected Array, found {}", value.type_name()),
    }
}

#[test]
fn evaluates_basic_arithmetic() {
    assert_eq!(expect_int(&eval("2 + 2")), 4);
    assert_eq!(expect_int(&eval("7 - 2 * 3")), 1);
    assert_eq!(expect_int(&eval("(7 - 2) * 3")), 15);
    assert_eq!(expect_int(&eval("17 % 5")), 2);
    assert!((expect_double(&eval("1.5 + 2.25")) - 3.75).abs() < 1e-9);
}

#[test]
fn returns_last_expression_from_script() {
    let value = eval(
        r#"
        x = 40
        x + 2
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn top_level_return_yields_value() {
    let value = eval("return 2 + 2;");
    assert_eq!(expect_int(&value), 4);
}

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(expect_string(&eval(r#""foo" + "bar""#)), "foobar");
    assert!(expect_bool(&eval(r#""abc" < "abd""#)));
    assert!(expect_bool(&eval("'a' < 'b'")));
}

#[test]
fn unary_operators() {
    assert_eq!(expect_int(&eval("-5")), -5);
    assert!((expect_double(&eval("-2.5")) + 2.5).abs() < 1e-9);
    assert!(!expect_bool(&eval("!true")));
    assert_eq!(expect_int(&eval("~0")), -1);
}

#[test]
fn no_numeric_promotion_between_int_and_double() {
    let message = expect_kind("1 + 2.0", DiagnosticKind::Type);
    assert!(message.contains("Int and Double"), "{message}");
}

#[test]
fn equality_across_kinds_is_false_not_an_error() {
    assert!(!expect_bool(&eval("1 == 1.0")));
    assert!(expect_bool(&eval("1 != \"1\"")));
    assert!(expect_bool(&eval("[1, 2] == [1, 2]")));
    assert!(!expect_bool(&eval("[1, 2] == [1, 3]")));
    assert!(expect_bool(&eval("null == null")));
}

#[test]
fn logical_operators_do_not_short_circuit() {
    // Both operands run: with short-circuiting `y` would stay undefined.
    let value = eval(
        r#"
        (x = true) || (y = true)
        y
        "#,
    );
    assert!(expect_bool(&value));

    let value = eval(
        r#"
        (x = false) && (y = true)
        y
        "#,
    );
    assert!(expect_bool(&value));
}

#[test]
fn logical_operators_require_bool_operands() {
    expect_kind("1 && true", DiagnosticKind::Type);
    expect_kind("false || 0", DiagnosticKind::Type);
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let message = expect_kind("nowhere + 1", DiagnosticKind::Runtime);
    assert!(
        message.contains("use of undefined variable `nowhere`"),
        "{message}"
    );
}

#[test]
fn compound_assignment_requires_existing_binding() {
    let value = eval(
        r#"
        x = 10
        x *= 3
        x
        "#,
    );
    assert_eq!(expect_int(&value), 30);

    let message = expect_kind("missing += 1", DiagnosticKind::Runtime);
    assert!(message.contains("use of undefined variable"), "{message}");
}

#[test]
fn division_and_modulo_by_zero() {
    let message = expect_kind("1 / 0", DiagnosticKind::Runtime);
    assert!(message.contains("division by zero"), "{message}");
    expect_kind("1 % 0", DiagnosticKind::Runtime);
}

#[test]
fn if_condition_must_be_bool() {
    let message = expect_kind("if (1) { x = 1 }", DiagnosticKind::Type);
    assert!(message.contains("expected Bool condition"), "{message}");
}

#[test]
fn if_branch_scope_is_discarded() {
    let err = eval_error(
        r#"
        if (true) {
            hidden = 1
        }
        hidden
        "#,
    );
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Runtime));
}

#[test]
fn if_branch_can_update_outer_bindings() {
    let value = eval(
        r#"
        x = 1
        if (x == 1) {
            x = 5
        } else {
            x = 9
        }
        x
        "#,
    );
    assert_eq!(expect_int(&value), 5);
}

#[test]
fn while_body_shares_one_scope_across_iterations() {
    // `prev` is created in the first iteration and must still be bound in
    // the second; with a per-iteration scope this would be an undefined
    // variable error.
    let value = eval(
        r#"
        i = 0
        out = 0
        while (i < 2) {
            if (i == 1) {
                out = prev + 1
            }
            prev = 42
            i += 1
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 43);
}

#[test]
fn while_loop_variable_is_discarded_after_loop() {
    let err = eval_error(
        r#"
        i = 0
        while (i < 1) {
            inner = 7
            i += 1
        }
        inner
        "#,
    );
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Runtime));
}

#[test]
fn for_loop_accumulates_sum() {
    let value = eval(
        r#"
        total = 0
        for (i = 0; i < 5; i += 1) {
            total += i
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn foreach_sums_array_elements() {
    let value = eval(
        r#"
        total = 0
        for (item in [1, 2, 3, 4]) {
            total += item
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 10);
}

#[test]
fn foreach_iterates_a_snapshot() {
    // Mutating the source array mid-loop does not change the sequence.
    let value = eval(
        r#"
        arr = [1, 2, 3]
        total = 0
        for (x in arr) {
            arr[0] = 100
            total += x
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 6);
}

#[test]
fn foreach_requires_an_array() {
    let message = expect_kind("for (x in 5) { }", DiagnosticKind::Type);
    assert!(message.contains("foreach expects Array"), "{message}");
}

#[test]
fn break_inside_if_exits_enclosing_while() {
    let value = eval(
        r#"
        i = 0
        while (true) {
            i += 1
            if (i == 3) {
                break
            }
        }
        i
        "#,
    );
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn continue_skips_to_next_iteration() {
    let value = eval(
        r#"
        total = 0
        for (i = 0; i < 6; i += 1) {
            if (i % 2 == 0) {
                continue
            }
            total += i
        }
        total
        "#,
    );
    assert_eq!(expect_int(&value), 9);
}

#[test]
fn break_outside_loop_is_an_error() {
    let message = expect_kind("break", DiagnosticKind::Runtime);
    assert!(message.contains("`break` outside loop"), "{message}");
    expect_kind("continue", DiagnosticKind::Runtime);
}

#[test]
fn break_cannot_escape_a_function_call() {
    let message = expect_kind(
        r#"
        func leak() {
            break
        }
        while (true) {
            leak()
        }
        "#,
        DiagnosticKind::Runtime,
    );
    assert!(
        message.contains("loop control flow cannot escape a function"),
        "{message}"
    );
}

#[test]
fn match_selects_first_equal_case() {
    let value = eval(
        r#"
        out = 0
        match (2) {
            1 -> { out = 10 }
            2 -> { out = 20 }
            _ -> { out = 99 }
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 20);
}

#[test]
fn match_falls_back_to_wildcard() {
    let value = eval(
        r#"
        out = 0
        match (5) {
            1 -> { out = 10 }
            _ -> { out = 99 }
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 99);
}

#[test]
fn match_wildcard_is_never_evaluated_as_an_identifier() {
    // `_` is unbound; if the arm evaluated it as a variable this would be
    // an undefined variable error.
    let value = eval(
        r#"
        out = 0
        match (5) {
            _ -> { out = 1 }
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn match_stops_before_evaluating_cases_after_a_hit() {
    // The second arm's case would be an undefined-variable error if tried.
    let value = eval(
        r#"
        out = 0
        match (5) {
            _ -> { out = 1 }
            boom -> { out = 2 }
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn subjectless_match_uses_arms_as_guards() {
    let value = eval(
        r#"
        n = 7
        out = 0
        match {
            n < 5 -> { out = 1 }
            n < 10 -> { out = 2 }
            _ -> { out = 3 }
        }
        out
        "#,
    );
    assert_eq!(expect_int(&value), 2);
}

#[test]
fn match_arm_scope_is_discarded() {
    let err = eval_error(
        r#"
        match (1) {
            1 -> { inside = 5 }
        }
        inside
        "#,
    );
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Runtime));
}

#[test]
fn assignment_between_arrays_copies() {
    let value = eval(
        r#"
        a = [1, 2, 3]
        b = a
        b[0] = 99
        a[0]
        "#,
    );
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn array_element_assignment_updates_value() {
    let value = eval(
        r#"
        numbers = [1, 2, 3]
        numbers[1] += 5
        numbers
        "#,
    );
    let items = expect_array(&value);
    assert_eq!(items.len(), 3);
    assert_eq!(expect_int(&items[1]), 7);
}

#[test]
fn index_out_of_range_is_an_index_error() {
    let message = expect_kind(
        r#"
        arr = [1, 2, 3]
        arr[3]
        "#,
        DiagnosticKind::Index,
    );
    assert!(message.contains("index 3 out of range"), "{message}");

    expect_kind(
        r#"
        arr = [1]
        arr[-1] = 0
        "#,
        DiagnosticKind::Index,
    );
}

#[test]
fn non_int_index_is_a_type_error() {
    let message = expect_kind(
        r#"
        arr = [1, 2, 3]
        arr["one"]
        "#,
        DiagnosticKind::Type,
    );
    assert!(message.contains("expected Int index"), "{message}");
}

#[test]
fn indexing_a_non_array_is_a_type_error() {
    expect_kind(
        r#"
        n = 5
        n[0]
        "#,
        DiagnosticKind::Type,
    );
}

#[test]
fn recursive_function_evaluates() {
    let value = eval(
        r#"
        func factorial(n) {
            if (n <= 1) {
                return 1
            }
            return n * factorial(n - 1)
        }
        factorial(5)
        "#,
    );
    assert_eq!(expect_int(&value), 120);
}

#[test]
fn named_functions_are_visible_before_their_definition() {
    let value = eval(
        r#"
        x = double(21)
        func double(n) {
            return n * 2
        }
        x
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn named_functions_start_from_a_fresh_chain() {
    let err = eval_error(
        r#"
        g = 10
        func peek() {
            return g
        }
        peek()
        "#,
    );
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Runtime));
}

#[test]
fn function_without_return_yields_null() {
    let value = eval(
        r#"
        func noop(n) {
            n + 1
        }
        noop(1)
        "#,
    );
    assert!(matches!(value, Value::Null));
}

#[test]
fn arity_mismatch_is_an_argument_error() {
    let message = expect_kind(
        r#"
        func pair(a, b) {
            return a
        }
        pair(1)
        "#,
        DiagnosticKind::Argument,
    );
    assert!(message.contains("expects 2 arguments but got 1"), "{message}");
}

#[test]
fn unknown_function_is_a_runtime_error() {
    let message = expect_kind("vanish(1)", DiagnosticKind::Runtime);
    assert!(
        message.contains("cannot find function definition of `vanish`"),
        "{message}"
    );
}

#[test]
fn closure_stored_in_a_variable_is_callable() {
    let value = eval(
        r#"
        twice = func(x) {
            return x * 2
        }
        twice(21)
        "#,
    );
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn closure_counter_shares_its_creation_environment() {
    let value = eval(
        r#"
        func make_counter() {
            count = 0
            return func() {
                count += 1
                return count
            }
        }
        c = make_counter()
        first = c()
        second = c()
        d = make_counter()
        third = d()
        [first, second, third]
        "#,
    );
    let items = expect_array(&value);
    assert_eq!(expect_int(&items[0]), 1);
    assert_eq!(expect_int(&items[1]), 2);
    // A second counter owns an independent environment.
    assert_eq!(expect_int(&items[2]), 1);
}

#[test]
fn closure_sees_later_mutation_of_captured_variable() {
    let value = eval(
        r#"
        x = 1
        read = func() {
            return x
        }
        x = 5
        read()
        "#,
    );
    assert_eq!(expect_int(&value), 5);
}

#[test]
fn interpreter_state_persists_across_eval_calls() {
    let mut interpreter = Interpreter::new();
    interpreter.eval_source("x = 41").expect("define x");
    let value = interpreter.eval_source("x + 1").expect("read x");
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn builtin_typeof_and_len() {
    assert_eq!(expect_string(&eval("typeof(1)")), "Int");
    assert_eq!(expect_string(&eval("typeof(1.0)")), "Double");
    assert_eq!(expect_string(&eval("typeof(null)")), "Null");
    assert_eq!(expect_string(&eval("typeof([1, 2])")), "Array");
    assert_eq!(expect_int(&eval(r#"len("hello")"#)), 5);
    assert_eq!(expect_int(&eval("len([1, 2, 3])")), 3);
    expect_kind("len(1)", DiagnosticKind::Runtime);
}

#[test]
fn builtin_conversions() {
    assert_eq!(expect_string(&eval("str(42)")), "42");
    assert_eq!(expect_int(&eval("to_int(3.9)")), 3);
    assert_eq!(expect_int(&eval(r#"to_int("17")"#)), 17);
    assert_eq!(expect_int(&eval("to_int('A')")), 65);
    assert!((expect_double(&eval("to_double(2)")) - 2.0).abs() < 1e-9);
    expect_kind(r#"to_int("nope")"#, DiagnosticKind::Runtime);
}

#[test]
fn builtin_range() {
    let ascending = eval("range(0, 4)");
    let items = expect_array(&ascending);
    assert_eq!(items.len(), 4);
    assert_eq!(expect_int(&items[0]), 0);
    assert_eq!(expect_int(&items[3]), 3);

    let descending = eval("range(3, 0)");
    let items = expect_array(&descending);
    assert_eq!(items.len(), 3);
    assert_eq!(expect_int(&items[0]), 3);
    assert_eq!(expect_int(&items[2]), 1);
}

#[test]
fn builtin_assert() {
    assert!(matches!(eval("assert(1 == 1)"), Value::Null));
    let message = expect_kind("assert(false)", DiagnosticKind::Runtime);
    assert!(message.contains("assertion failed"), "{message}");
    let message = expect_kind(r#"assert(false, "boom")"#, DiagnosticKind::Runtime);
    assert!(message.contains("boom"), "{message}");
}

#[test]
fn builtin_arity_is_checked() {
    expect_kind("typeof(1, 2)", DiagnosticKind::Argument);
    expect_kind("len()", DiagnosticKind::Argument);
}

#[test]
fn builtins_shadow_named_functions() {
    let value = eval(
        r#"
        func typeof(x) {
            return "shadowed"
        }
        typeof(1)
        "#,
    );
    assert_eq!(expect_string(&value), "Int");
}

#[test]
fn parse_errors_carry_positions() {
    let err = eval_error("1 +");
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Parse));

    let err = eval_error("x = 1\n1 + @");
    match err {
        SeleneError::Diagnostic(diag) => {
            let pos = diag.pos.expect("parse errors should carry a position");
            assert_eq!(pos.line, 2);
        }
        other => panic!("expected diagnostic, found {other}"),
    }
}

#[test]
fn runtime_errors_carry_positions() {
    let err = eval_error("x = 1\ny + 1");
    match err {
        SeleneError::Diagnostic(diag) => {
            assert_eq!(diag.kind, DiagnosticKind::Runtime);
            let pos = diag.pos.expect("runtime errors should carry a position");
            assert_eq!(pos.line, 2);
        }
        other => panic!("expected diagnostic, found {other}"),
    }
}

#[test]
fn invalid_assignment_target_is_rejected() {
    let err = eval_error("1 = 2");
    assert_eq!(err.diagnostic_kind(), Some(DiagnosticKind::Parse));
}

#[test]
fn comments_are_ignored() {
    let value = eval(
        r#"
        // line comment
        x = 1 /* inline */ + 2
        /* block
           spanning lines */
        x
        "#,
    );
    assert_eq!(expect_int(&value), 3);
}

#[test]
fn char_literals_support_escapes() {
    assert_eq!(expect_int(&eval(r"to_int('\n')")), 10);
    assert!(expect_bool(&eval(r"'\t' == '\t'")));
}

#[test]
fn example_scripts_run() {
    for script in ["demos/quickstart.sel", "demos/closures.sel"] {
        let source = std::fs::read_to_string(script)
            .unwrap_or_else(|err| panic!("failed to read {script}: {err}"));
        let mut interpreter = Interpreter::new();
        assert!(
            interpreter.eval_source(&source).is_ok(),
            "{script} should run"
        );
    }
}
