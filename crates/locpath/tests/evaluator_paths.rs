//! Location paths, predicates and set operations over `SimpleNode` trees.

use locpath::simple_node::{attr, doc, elem, text};
use locpath::{
    DynamicContextBuilder, ExpandedName, SimpleNode, StaticContext, Value, XPathNode, evaluate,
    evaluate_on, parse_xpath,
};
use rstest::{fixture, rstest};

// <library>
//   <book year="1965">Dune</book>
//   <book year="1961">Solaris</book>
//   <book year="1969">Ubik</book>
//   <magazine>Analog</magazine>
// </library>
#[fixture]
fn library() -> SimpleNode {
    doc()
        .child(
            elem("library")
                .child(
                    elem("book")
                        .attr(attr("year", "1965"))
                        .child(text("Dune")),
                )
                .child(
                    elem("book")
                        .attr(attr("year", "1961"))
                        .child(text("Solaris")),
                )
                .child(
                    elem("book")
                        .attr(attr("year", "1969"))
                        .child(text("Ubik")),
                )
                .child(elem("magazine").child(text("Analog"))),
        )
        .build()
}

fn run(expr: &str, context: SimpleNode) -> Value<SimpleNode> {
    let parsed = parse_xpath(expr).unwrap();
    evaluate_on(&parsed, context).unwrap()
}

fn strings(value: &Value<SimpleNode>) -> Vec<String> {
    let Value::NodeSet(set) = value else {
        panic!("expected a node-set, got {value:?}");
    };
    set.iter().map(|n| n.string_value()).collect()
}

#[rstest]
fn absolute_and_relative_paths_agree(library: SimpleNode) {
    let child = library.children()[0].clone(); // <library>
    let absolute = run("/library/book", child.clone());
    let relative = run("book", child);
    assert_eq!(strings(&absolute), strings(&relative));
    assert_eq!(strings(&absolute), vec!["Dune", "Solaris", "Ubik"]);
}

#[rstest]
fn double_slash_finds_all_books_in_document_order(library: SimpleNode) {
    let out = run("//book", library);
    assert_eq!(strings(&out), vec!["Dune", "Solaris", "Ubik"]);
}

#[rstest]
fn number_predicate_selects_by_proximity_position(library: SimpleNode) {
    let out = run("//book[position() = 1]", library.clone());
    assert_eq!(strings(&out), vec!["Dune"]);
    let out = run("//book[2]", library.clone());
    assert_eq!(strings(&out), vec!["Solaris"]);
    let out = run("//book[last()]", library);
    assert_eq!(strings(&out), vec!["Ubik"]);
}

#[rstest]
fn nested_predicates_rerank_after_each_filter(library: SimpleNode) {
    // [@year > 1962] keeps Dune and Ubik; [2] then selects Ubik, which
    // was 3rd before the first filter.
    let out = run("//book[@year > 1962][2]", library);
    assert_eq!(strings(&out), vec!["Ubik"]);
}

#[rstest]
fn predicates_on_attributes_and_content(library: SimpleNode) {
    let out = run("//book[@year = '1961']", library.clone());
    assert_eq!(strings(&out), vec!["Solaris"]);
    let out = run("//book[. = 'Dune']", library);
    assert_eq!(strings(&out), vec!["Dune"]);
}

#[rstest]
fn union_merges_dedupes_and_orders(library: SimpleNode) {
    let out = run("//magazine | //book[1] | //book", library);
    assert_eq!(strings(&out), vec!["Dune", "Solaris", "Ubik", "Analog"]);
}

#[rstest]
fn union_of_non_node_sets_is_an_error(library: SimpleNode) {
    let parsed = parse_xpath("//book | 1").unwrap();
    let err = evaluate_on(&parsed, library).unwrap_err();
    assert!(matches!(err, locpath::EvalError::NotANodeSet("number")));
}

#[rstest]
fn filter_expression_positions_use_document_order(library: SimpleNode) {
    // (//book)[2] filters the whole set, unlike //book[2] which filters
    // per parent. Here both agree because all books share a parent.
    let out = run("(//book)[2]", library);
    assert_eq!(strings(&out), vec!["Solaris"]);
}

#[rstest]
fn variable_start_path(library: SimpleNode) {
    let parsed = parse_xpath("$shelf/book[1]").unwrap();
    let shelf = library.children()[0].clone();
    let ctx = DynamicContextBuilder::new()
        .with_context_node(library)
        .with_variable(
            ExpandedName::local("shelf"),
            Value::NodeSet(vec![shelf].into()),
        )
        .build();
    let out = evaluate(&parsed, &StaticContext::default(), &ctx).unwrap();
    assert_eq!(strings(&out), vec!["Dune"]);
}

#[rstest]
fn text_node_test(library: SimpleNode) {
    let out = run("//book[1]/text()", library);
    assert_eq!(strings(&out), vec!["Dune"]);
}

#[rstest]
fn step_over_multiple_context_nodes_dedupes(library: SimpleNode) {
    // Every book contributes the same parent; the result holds it once.
    let out = run("//book/..", library);
    let Value::NodeSet(set) = &out else {
        panic!("expected a node-set");
    };
    assert_eq!(set.len(), 1);
    assert_eq!(set.first().unwrap().name().unwrap().local, "library");
}

#[test]
fn missing_context_node_is_an_error() {
    let parsed = parse_xpath("/library").unwrap();
    let ctx = DynamicContextBuilder::<SimpleNode>::new().build();
    let err = evaluate(&parsed, &StaticContext::default(), &ctx).unwrap_err();
    assert!(matches!(err, locpath::EvalError::MissingContextNode));
}

#[rstest]
fn evaluation_error_leaves_the_ast_reusable(library: SimpleNode) {
    let parsed = parse_xpath("$undeclared").unwrap();
    let ctx = DynamicContextBuilder::new()
        .with_context_node(library.clone())
        .build();
    assert!(evaluate(&parsed, &StaticContext::default(), &ctx).is_err());

    let ctx = DynamicContextBuilder::new()
        .with_context_node(library)
        .with_variable(ExpandedName::local("undeclared"), Value::Number(7.0))
        .build();
    let out = evaluate(&parsed, &StaticContext::default(), &ctx).unwrap();
    assert_eq!(out, Value::Number(7.0));
}

#[test]
fn comments_and_pis_are_addressable() {
    let tree = doc()
        .child(locpath::simple_node::comment("header"))
        .child(locpath::simple_node::pi("xml-stylesheet", "href='s.css'"))
        .child(elem("root").child(text("body")))
        .build();
    let out = run("comment()", tree.clone());
    assert_eq!(strings(&out), vec!["header"]);
    let out = run("processing-instruction('xml-stylesheet')", tree.clone());
    assert_eq!(strings(&out), vec!["href='s.css'"]);
    let out = run("processing-instruction('other')", tree);
    assert!(strings(&out).is_empty());
}
