use locpath::parse_xpath;
use locpath::parser::ast::{Axis, Expr, KindTest, NameTest, NodeTest, PathStart};
use rstest::rstest;

fn path(expr: &str) -> locpath::parser::ast::PathExpr {
    match parse_xpath(expr).unwrap() {
        Expr::Path(p) => p,
        other => panic!("expected a path for '{expr}', got {other:?}"),
    }
}

#[rstest]
#[case("child::para", Axis::Child)]
#[case("attribute::href", Axis::Attribute)]
#[case("ancestor::div", Axis::Ancestor)]
#[case("ancestor-or-self::div", Axis::AncestorOrSelf)]
#[case("descendant::para", Axis::Descendant)]
#[case("descendant-or-self::para", Axis::DescendantOrSelf)]
#[case("following::para", Axis::Following)]
#[case("following-sibling::para", Axis::FollowingSibling)]
#[case("namespace::p", Axis::Namespace)]
#[case("parent::para", Axis::Parent)]
#[case("preceding::para", Axis::Preceding)]
#[case("preceding-sibling::para", Axis::PrecedingSibling)]
#[case("self::para", Axis::SelfAxis)]
fn all_thirteen_axes_parse(#[case] expr: &str, #[case] axis: Axis) {
    let p = path(expr);
    assert_eq!(p.steps.len(), 1);
    assert_eq!(p.steps[0].axis, axis);
}

#[test]
fn default_axis_is_child() {
    let p = path("para");
    assert_eq!(p.start, PathStart::Relative);
    assert_eq!(p.steps[0].axis, Axis::Child);
    assert_eq!(
        p.steps[0].test,
        NodeTest::Name(NameTest::Name(locpath::QName::local("para")))
    );
}

#[test]
fn at_sign_abbreviates_the_attribute_axis() {
    let p = path("@href");
    assert_eq!(p.steps[0].axis, Axis::Attribute);
}

#[test]
fn dot_and_dotdot_desugar() {
    let p = path(".");
    assert_eq!(p.steps[0].axis, Axis::SelfAxis);
    assert_eq!(p.steps[0].test, NodeTest::Kind(KindTest::Node));

    let p = path("..");
    assert_eq!(p.steps[0].axis, Axis::Parent);
    assert_eq!(p.steps[0].test, NodeTest::Kind(KindTest::Node));
}

#[test]
fn double_slash_inserts_descendant_or_self_step() {
    let p = path("//para");
    assert_eq!(p.start, PathStart::Root);
    assert_eq!(p.steps.len(), 2);
    assert_eq!(p.steps[0].axis, Axis::DescendantOrSelf);
    assert_eq!(p.steps[0].test, NodeTest::Kind(KindTest::Node));
    assert_eq!(p.steps[1].axis, Axis::Child);

    let p = path("div//para");
    assert_eq!(p.start, PathStart::Relative);
    assert_eq!(p.steps.len(), 3);
    assert_eq!(p.steps[1].axis, Axis::DescendantOrSelf);
}

#[test]
fn root_path_alone_is_valid() {
    let p = path("/");
    assert_eq!(p.start, PathStart::Root);
    assert!(p.steps.is_empty());
}

#[rstest]
#[case("*", NodeTest::Name(NameTest::Any))]
#[case("svg:*", NodeTest::Name(NameTest::Namespace("svg".into())))]
#[case("node()", NodeTest::Kind(KindTest::Node))]
#[case("text()", NodeTest::Kind(KindTest::Text))]
#[case("comment()", NodeTest::Kind(KindTest::Comment))]
#[case("processing-instruction()", NodeTest::Kind(KindTest::ProcessingInstruction(None)))]
#[case(
    "processing-instruction('xml-stylesheet')",
    NodeTest::Kind(KindTest::ProcessingInstruction(Some("xml-stylesheet".into())))
)]
fn node_tests_parse(#[case] expr: &str, #[case] expected: NodeTest) {
    let p = path(expr);
    assert_eq!(p.steps[0].test, expected);
}

#[test]
fn prefixed_name_test_keeps_its_prefix_for_later_resolution() {
    let p = path("svg:rect");
    let NodeTest::Name(NameTest::Name(q)) = &p.steps[0].test else {
        panic!("expected a name test");
    };
    assert_eq!(q.prefix.as_deref(), Some("svg"));
    assert_eq!(q.local, "rect");
    assert_eq!(q.ns_uri, None);
}

#[test]
fn predicates_attach_to_their_step() {
    let p = path("chapter[title]/para[2][@ok]");
    assert_eq!(p.steps[0].predicates.len(), 1);
    assert_eq!(p.steps[1].predicates.len(), 2);
    assert_eq!(p.steps[1].predicates[0], Expr::Number(2.0));
}

#[test]
fn filter_expression_with_trailing_path() {
    let Expr::Path(p) = parse_xpath("$doc/chapter").unwrap() else {
        panic!("expected a path");
    };
    let PathStart::Filter(primary) = &p.start else {
        panic!("expected a filter start");
    };
    assert_eq!(**primary, Expr::VarRef(locpath::QName::local("doc")));
    assert_eq!(p.steps.len(), 1);
}

#[test]
fn parenthesized_set_with_predicate_is_a_filter() {
    let Expr::Filter {
        primary,
        predicates,
    } = parse_xpath("(//a)[2]").unwrap()
    else {
        panic!("expected a filter");
    };
    assert!(matches!(*primary, Expr::Path(_)));
    assert_eq!(predicates, vec![Expr::Number(2.0)]);
}

#[test]
fn union_is_left_associative() {
    let Expr::Union { left, .. } = parse_xpath("a | b | c").unwrap() else {
        panic!("expected a union");
    };
    assert!(matches!(*left, Expr::Union { .. }));
}

#[test]
fn operator_precedence_nests_correctly() {
    use locpath::parser::ast::BinaryOp;
    // 1 + 2 * 3 must parse as 1 + (2 * 3)
    let Expr::Binary { op, right, .. } = parse_xpath("1 + 2 * 3").unwrap() else {
        panic!("expected a binary expression");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(
        *right,
        Expr::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));

    // a or b and c must parse as a or (b and c)
    let Expr::Binary { op, right, .. } = parse_xpath("a or b and c").unwrap() else {
        panic!("expected a binary expression");
    };
    assert_eq!(op, BinaryOp::Or);
    assert!(matches!(
        *right,
        Expr::Binary {
            op: BinaryOp::And,
            ..
        }
    ));
}

#[test]
fn unary_minus_nests() {
    let Expr::Negate(inner) = parse_xpath("--1").unwrap() else {
        panic!("expected a negation");
    };
    assert!(matches!(*inner, Expr::Negate(_)));
}

#[test]
fn function_calls_parse_with_any_arity() {
    // Arity is the registry's business at evaluation time; the parser
    // accepts any argument count for any name.
    let Expr::FunctionCall { name, args } = parse_xpath("true(1, 2, 3)").unwrap() else {
        panic!("expected a function call");
    };
    assert_eq!(name.local, "true");
    assert_eq!(args.len(), 3);
}
