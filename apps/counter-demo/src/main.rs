//! A stateful counter rendered into the in-memory host: initial render,
//! two synthetic clicks, and a dump of the resulting tree.

use anchorage_core::{
    children, create_element, render, Component, HostDocument, HostError, MemoryHost, NodeKind,
    NodeRef, PropValue, Scope, VNode,
};
use serde_json::{json, Value};

#[derive(Default)]
struct Counter;

impl Component for Counter {
    fn initial_state(&self) -> Value {
        json!({"count": 0})
    }

    fn render(&self, scope: Scope<'_>) -> VNode {
        let count = scope.state["count"].as_i64().unwrap_or(0);
        let owner = scope.owner.clone();
        create_element(
            "div",
            &[("className", "counter".into())],
            children![
                create_element(
                    "button",
                    &[(
                        "onClick",
                        PropValue::listener(move |host, _event| {
                            if let Err(err) = owner.set_state(json!({"count": count + 1}), host) {
                                log::error!("state update failed: {err}");
                            }
                        }),
                    )],
                    children!["+1"],
                ),
                format!("count: {count}"),
            ],
        )
    }
}

/// The button is rebuilt on every update (its listener closure changes), so
/// it is located fresh before each click.
fn find_button(host: &MemoryHost, body: NodeRef) -> Result<NodeRef, HostError> {
    let div = host.children(body)?[0];
    Ok(host.children(div)?[0])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut host = MemoryHost::new();
    let body = host.create_element("body");
    let app = create_element(NodeKind::composite::<Counter>(), &[], children![]);
    render(&app, &mut host, body)?;

    for _ in 0..2 {
        let button = find_button(&host, body)?;
        host.dispatch(button, "click")?;
    }

    print!("{}", host.dump_tree(body));
    Ok(())
}
