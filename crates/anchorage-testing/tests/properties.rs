//! Minimality properties of the reconciler, proven against the recorded
//! host-operation log.

use anchorage_core::{children, create_element, reconcile, render, VNode};
use anchorage_testing::{recording_fixture, HostOp};

fn item(text: &str) -> anchorage_core::Child {
    anchorage_core::Child::from(create_element("li", &[], children![text]))
}

fn sample_tree() -> VNode {
    create_element(
        "div",
        &[("id", "sample".into()), ("class", "wide".into())],
        children![
            create_element("ul", &[], children![item("a"), item("b")]),
            "tail text",
        ],
    )
}

#[test]
fn reconciling_an_identical_tree_touches_the_host_not_at_all() {
    let (mut host, root) = recording_fixture();
    let old = sample_tree();
    render(&old, &mut host, root).unwrap();
    host.clear();

    let new = sample_tree().expand();
    reconcile(&old, &new, &mut host).unwrap();

    assert!(
        host.ops().is_empty(),
        "unexpected host ops: {:?}",
        host.ops()
    );
}

#[test]
fn growing_a_child_list_builds_only_the_new_child() {
    let (mut host, root) = recording_fixture();
    let old = create_element("ul", &[], children![item("a"), item("b")]);
    render(&old, &mut host, root).unwrap();
    host.clear();

    let new = create_element("ul", &[], children![item("a"), item("b"), item("c")]).expand();
    reconcile(&old, &new, &mut host).unwrap();

    let creations: Vec<&HostOp> = host.ops().iter().filter(|op| op.is_node_creation()).collect();
    assert_eq!(
        creations,
        [
            &HostOp::CreateElement {
                tag: "li".to_string()
            },
            &HostOp::CreateText {
                content: "c".to_string()
            },
        ]
    );
    // Two installs: the text into the new li, the li into the ul.
    assert_eq!(host.count(|op| matches!(op, HostOp::InsertNode { .. })), 2);
}

#[test]
fn a_tag_change_rebuilds_the_subtree_instead_of_patching_children() {
    let (mut host, root) = recording_fixture();
    let old = create_element("div", &[], children!["x"]);
    render(&old, &mut host, root).unwrap();
    host.clear();

    let new = create_element("span", &[], children!["x"]).expand();
    reconcile(&old, &new, &mut host).unwrap();

    // A full build of the span and its text child, landing in the old range.
    assert_eq!(
        host.count(|op| matches!(op, HostOp::CreateElement { tag } if tag == "span")),
        1
    );
    assert_eq!(
        host.count(|op| matches!(op, HostOp::CreateText { content } if content == "x")),
        1
    );
    assert!(host.count(|op| matches!(op, HostOp::DeleteContents { .. })) >= 1);

    let inner = host.inner();
    let top = inner.children(root).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(inner.tag(top[0]).unwrap(), "span");
}

#[test]
fn a_changed_prop_value_rebuilds_the_node() {
    let (mut host, root) = recording_fixture();
    let old = create_element("div", &[("id", "a".into())], children![]);
    render(&old, &mut host, root).unwrap();
    host.clear();

    let new = create_element("div", &[("id", "b".into())], children![]).expand();
    reconcile(&old, &new, &mut host).unwrap();

    assert_eq!(
        host.count(|op| matches!(op, HostOp::CreateElement { .. })),
        1
    );
    assert_eq!(
        host.count(|op| matches!(op, HostOp::SetAttribute { name, value } if name == "id" && value == "b")),
        1
    );
}
