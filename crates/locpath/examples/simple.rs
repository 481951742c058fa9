use locpath::simple_node::{attr, doc as simple_doc, elem, text};
use locpath::{SimpleNode, evaluate, parse_xpath};
use locpath::{DynamicContextBuilder, StaticContext};

fn main() {
    let doc_node = simple_doc()
        .child(
            elem("root")
                .attr(attr("id", "r"))
                .child(
                    elem("a")
                        .child(elem("b").child(text("one")))
                        .child(elem("b").child(text("two"))),
                )
                .child(elem("c").child(elem("d").child(text("three")))),
        )
        .build();

    let expr = parse_xpath("//b[2] | /root/c/d").expect("parse");
    println!("Canonical form: {expr}");

    let ctx = DynamicContextBuilder::<SimpleNode>::new()
        .with_context_node(doc_node)
        .build();
    let result = evaluate(&expr, &StaticContext::default(), &ctx);
    println!("{result:?}");
}
