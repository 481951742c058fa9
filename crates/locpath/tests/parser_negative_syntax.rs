use locpath::{LexError, ParseError, parse_xpath};
use rstest::rstest;

#[rstest]
#[case("")]
#[case("//")]
#[case("a/")]
#[case("a[")]
#[case("a[]")]
#[case("a[1")]
#[case("(1 + 2")]
#[case("1 +")]
#[case("foo(")]
#[case("foo(1,)")]
#[case("child::")]
#[case("@")]
#[case("$")]
#[case("1 2")]
#[case("a b")]
#[case("!=")]
#[case("| a")]
#[case("a | ")]
#[case("..[1]")]
fn malformed_expressions_are_rejected(#[case] expr: &str) {
    assert!(
        parse_xpath(expr).is_err(),
        "expected '{expr}' to fail to parse"
    );
}

#[test]
fn syntax_errors_carry_the_failing_position() {
    let err = parse_xpath("a and +").unwrap_err();
    let ParseError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!(syntax.position, 6);
    assert!(syntax.found.contains('+'), "found: {}", syntax.found);
}

#[test]
fn keyword_after_operator_is_an_ordinary_name() {
    // After an operator, a bare word is a name test, so "a and and" is a
    // legal expression selecting <and> elements.
    assert!(parse_xpath("a and and").is_ok());
    assert!(parse_xpath("a div div").is_ok());
}

#[test]
fn error_at_end_of_input_points_past_the_last_token() {
    let err = parse_xpath("1 +").unwrap_err();
    let ParseError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!(syntax.position, 3);
    assert_eq!(syntax.found, "end of expression");
}

#[test]
fn unknown_axis_name_is_a_syntax_error() {
    let err = parse_xpath("sideways::a").unwrap_err();
    let ParseError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert!(syntax.expected.contains("axis"), "{}", syntax.expected);
}

#[test]
fn lexical_errors_surface_through_parse() {
    let err = parse_xpath("a = 'oops").unwrap_err();
    assert_eq!(
        err,
        ParseError::Lex(LexError::UnterminatedLiteral { offset: 4 })
    );
}

#[test]
fn function_call_is_not_a_location_step() {
    // FilterExpr is only allowed at the start of a path in XPath 1.0.
    assert!(parse_xpath("a/foo()").is_err());
}
