// Property-based tests for mint arithmetic and parsing
//
// These tests verify:
// - Integer arithmetic is exact and division always yields the real quotient
// - Mixed int/float arithmetic promotes to float
// - String repetition works with the count on either side
// - String comparison follows lexicographic order
// - Printing a parsed expression and running it again gives the same result

use mint::{execute, ErrorKind, Expr, Lexer, Parser, Scopes, TokenSpan, Value};
use proptest::prelude::*;

/// Runs a program, returning its output or the kind of error it stopped with
fn run(source: &str) -> (String, Result<(), ErrorKind>) {
    let mut out = Vec::new();
    let result = execute(source, &mut out).map_err(|e| e.kind);
    (String::from_utf8_lossy(&out).into_owned(), result)
}

fn print_of(expression: &str) -> String {
    let (output, result) = run(&format!("print {}", expression));
    assert_eq!(result, Ok(()), "`print {}` failed", expression);
    output
}

fn parse_expression(source: &str) -> Expr {
    let tokens = Lexer::new(source).scan_tokens().expect("lexes");
    let scopes = Scopes::new();
    let mut parser = Parser::new(TokenSpan::program(tokens), scopes.root());
    parser.expression(&scopes).expect("parses")
}

/// Arithmetic and comparison expressions over small integer literals
fn arb_expression() -> impl Strategy<Value = String> {
    let leaf = (0i64..100).prop_map(|n| n.to_string());
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "%", "<", "=="]),
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.prop_map(|e| format!("({})", e)),
        ]
    })
}

// ============================================================================
// 1. Arithmetic
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn int_addition_is_exact(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        prop_assert_eq!(print_of(&format!("{} + {}", a, b)), format!("{}\n", a + b));
    }

    #[test]
    fn int_subtraction_is_exact(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        prop_assert_eq!(print_of(&format!("{} - {}", a, b)), format!("{}\n", a - b));
    }

    #[test]
    fn int_multiplication_is_exact(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        prop_assert_eq!(print_of(&format!("{} * {}", a, b)), format!("{}\n", a * b));
    }

    #[test]
    fn division_is_real_quotient(a in -1_000_000i64..1_000_000, b in 1i64..1_000) {
        let expected = Value::Float(a as f64 / b as f64);
        prop_assert_eq!(print_of(&format!("{} / {}", a, b)), format!("{}\n", expected));
        let expected = Value::Float(a as f64 / -b as f64);
        prop_assert_eq!(print_of(&format!("{} / -{}", a, b)), format!("{}\n", expected));
    }

    #[test]
    fn mixed_arithmetic_promotes(a in -10_000i64..10_000, quarters in -4_000i64..4_000) {
        // Multiples of 0.25 print exactly and never in exponent form
        let f = quarters as f64 / 4.0;
        let expected = Value::Float(a as f64 + f);
        prop_assert_eq!(print_of(&format!("{} + {:?}", a, f)), format!("{}\n", expected));
    }

    #[test]
    fn division_by_zero_is_arithmetic_error(a in -1_000i64..1_000) {
        let (_, result) = run(&format!("print {} / 0", a));
        prop_assert_eq!(result, Err(ErrorKind::ArithmeticError));
    }
}

// ============================================================================
// 2. Strings
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn repetition_is_commutative(s in "[a-z]{0,5}", n in 0i64..6) {
        let expected = format!("{}\n", s.repeat(n as usize));
        prop_assert_eq!(print_of(&format!("'{}' * {}", s, n)), expected.clone());
        prop_assert_eq!(print_of(&format!("{} * '{}'", n, s)), expected);
    }

    #[test]
    fn strings_compare_lexicographically(a in "[a-z]{0,6}", b in "[a-z]{0,6}") {
        prop_assert_eq!(print_of(&format!("'{}' < '{}'", a, b)), format!("{}\n", a < b));
        prop_assert_eq!(print_of(&format!("'{}' == '{}'", a, b)), format!("{}\n", a == b));
    }

    #[test]
    fn int_never_equals_string(n in 0i64..1_000, s in "[a-z0-9]{0,4}") {
        let (_, result) = run(&format!("print {} == '{}'", n, s));
        prop_assert_eq!(result, Err(ErrorKind::TypeError));
    }
}

// ============================================================================
// 3. Parsing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn printed_expression_evaluates_the_same(source in arb_expression()) {
        let printed = parse_expression(&source).to_string();
        prop_assert_eq!(
            run(&format!("print {}", source)),
            run(&format!("print {}", printed)),
            "{} was printed as {}", source, printed
        );
    }
}

#[test]
fn precedence_survives_printing() {
    let expr = parse_expression("1 + 2 * 3");
    assert_eq!(expr.to_string(), "(1 + (2 * 3))");
    assert_eq!(print_of(&expr.to_string()), "7\n");
}
