//! Virtual-node data model and construction API.
//!
//! A [`VNode`] is a cheaply clonable handle over one of three variants:
//! Element, Text, or Composite. Element and Text map directly onto host
//! content; a Composite delegates to a user-supplied [`Component`] whose
//! `render` output (its *expansion*) is what actually reaches the host. The
//! expansion of a whole tree contains only Element and Text nodes, which is
//! the shape the reconciler diffs.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::host::{EventHandler, HostDocument, HostError, RangeId};
use crate::state::merge_state;
use crate::RenderError;

/// A prop is either attribute text or an event listener; which one a name
/// means is decided at build time by the `on` prefix convention.
#[derive(Clone)]
pub enum PropValue {
    Text(String),
    Listener(EventHandler),
}

impl PropValue {
    /// Wrap a callback as a listener prop.
    pub fn listener(handler: impl Fn(&mut dyn HostDocument, &crate::host::Event) + 'static) -> Self {
        PropValue::Listener(Rc::new(handler))
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            // Listeners compare by identity, like any other opaque reference.
            (PropValue::Listener(a), PropValue::Listener(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(text) => write!(f, "Text({text:?})"),
            PropValue::Listener(_) => write!(f, "Listener(..)"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

pub type Props = IndexMap<String, PropValue>;

/// Everything a component may read while rendering.
pub struct Scope<'a> {
    pub props: &'a Props,
    pub children: &'a [VNode],
    pub state: &'a Value,
    /// The composite node being rendered; listeners that call
    /// [`VNode::set_state`] capture a clone of this handle.
    pub owner: &'a VNode,
}

/// User-supplied behavior for a Composite node.
///
/// `render` must produce exactly one virtual node; the signature makes any
/// other outcome unrepresentable.
pub trait Component: Any {
    fn render(&self, scope: Scope<'_>) -> VNode;

    fn initial_state(&self) -> Value {
        Value::Null
    }
}

/// Node-type descriptor accepted by [`create_element`].
pub enum NodeKind {
    Tag(String),
    Component(Box<dyn Component>),
}

impl NodeKind {
    /// Composite descriptor for a default-constructible component.
    pub fn composite<C: Component + Default>() -> Self {
        NodeKind::Component(Box::new(C::default()))
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        NodeKind::Tag(tag.to_string())
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        NodeKind::Tag(tag)
    }
}

impl From<Box<dyn Component>> for NodeKind {
    fn from(component: Box<dyn Component>) -> Self {
        NodeKind::Component(component)
    }
}

/// One entry in a child list: a node, bare text, nothing, or a nested
/// sequence that splices in place. The set is closed, so an invalid child
/// cannot be expressed at all.
pub enum Child {
    Node(VNode),
    Text(String),
    Nothing,
    Many(Vec<Child>),
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<Option<Child>> for Child {
    fn from(child: Option<Child>) -> Self {
        child.unwrap_or(Child::Nothing)
    }
}

impl From<Vec<Child>> for Child {
    fn from(children: Vec<Child>) -> Self {
        Child::Many(children)
    }
}

/// Build a `Vec<Child>` from mixed entries, converting each through
/// [`Child::from`]. Keeps call sites close to a variadic child list.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {
        vec![$($crate::vnode::Child::from($child)),*]
    };
}

pub(crate) struct ElementNode {
    pub(crate) tag: String,
    pub(crate) props: RefCell<Props>,
    pub(crate) children: RefCell<Vec<VNode>>,
    /// Child expansions materialized by the last `expand`/build; this is the
    /// list the reconciler walks.
    pub(crate) rendered_children: RefCell<Option<Vec<VNode>>>,
    pub(crate) range: Cell<Option<RangeId>>,
}

pub(crate) struct TextNode {
    pub(crate) content: String,
    pub(crate) range: Cell<Option<RangeId>>,
}

pub(crate) struct CompositeNode {
    pub(crate) component: Box<dyn Component>,
    pub(crate) props: RefCell<Props>,
    pub(crate) children: RefCell<Vec<VNode>>,
    pub(crate) state: RefCell<Value>,
    /// Most recent `render` expansion; the previous tree a later
    /// `set_state` diffs against.
    pub(crate) expansion: RefCell<Option<VNode>>,
    pub(crate) range: Cell<Option<RangeId>>,
}

pub(crate) enum Inner {
    Element(ElementNode),
    Text(TextNode),
    Composite(CompositeNode),
}

/// Handle to a virtual node; clones share the node.
#[derive(Clone)]
pub struct VNode {
    inner: Rc<Inner>,
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner::Element(ElementNode {
                tag: tag.into(),
                props: RefCell::new(Props::new()),
                children: RefCell::new(Vec::new()),
                rendered_children: RefCell::new(None),
                range: Cell::new(None),
            })),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner::Text(TextNode {
                content: content.into(),
                range: Cell::new(None),
            })),
        }
    }

    pub fn composite(component: Box<dyn Component>) -> Self {
        let state = component.initial_state();
        Self {
            inner: Rc::new(Inner::Composite(CompositeNode {
                component,
                props: RefCell::new(Props::new()),
                children: RefCell::new(Vec::new()),
                state: RefCell::new(state),
                expansion: RefCell::new(None),
                range: Cell::new(None),
            })),
        }
    }

    /// Set a prop. Meaningful only before the node's first render; the
    /// reconciler compares props by value, so later edits are not observed.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        match &*self.inner {
            Inner::Element(element) => {
                element.props.borrow_mut().insert(name, value.into());
            }
            Inner::Composite(composite) => {
                composite.props.borrow_mut().insert(name, value.into());
            }
            Inner::Text(_) => {
                log::warn!("ignoring attribute {name:?} on a text node");
            }
        }
    }

    pub fn append_child(&self, child: VNode) {
        match &*self.inner {
            Inner::Element(element) => element.children.borrow_mut().push(child),
            Inner::Composite(composite) => composite.children.borrow_mut().push(child),
            Inner::Text(_) => {
                log::warn!("ignoring child appended to a text node");
            }
        }
    }

    pub fn range(&self) -> Option<RangeId> {
        match &*self.inner {
            Inner::Element(element) => element.range.get(),
            Inner::Text(text) => text.range.get(),
            Inner::Composite(composite) => composite.range.get(),
        }
    }

    pub(crate) fn set_range(&self, range: RangeId) {
        match &*self.inner {
            Inner::Element(element) => element.range.set(Some(range)),
            Inner::Text(text) => text.range.set(Some(range)),
            Inner::Composite(composite) => composite.range.set(Some(range)),
        }
    }

    /// Props of an Element or Composite node; `None` for Text.
    pub fn props(&self) -> Option<Ref<'_, Props>> {
        match &*self.inner {
            Inner::Element(element) => Some(element.props.borrow()),
            Inner::Composite(composite) => Some(composite.props.borrow()),
            Inner::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &*self.inner {
            Inner::Text(text) => Some(&text.content),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &*self.inner {
            Inner::Element(element) => Some(&element.tag),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(&*self.inner, Inner::Composite(_))
    }

    /// Materialized child expansions, if this node has been expanded.
    pub fn rendered_children(&self) -> Option<Vec<VNode>> {
        match &*self.inner {
            Inner::Element(element) => element.rendered_children.borrow().clone(),
            _ => None,
        }
    }

    pub fn cached_expansion(&self) -> Option<VNode> {
        match &*self.inner {
            Inner::Composite(composite) => composite.expansion.borrow().clone(),
            _ => None,
        }
    }

    pub(crate) fn cache_expansion(&self, expansion: VNode) {
        if let Inner::Composite(composite) = &*self.inner {
            *composite.expansion.borrow_mut() = Some(expansion);
        }
    }

    /// Current state of a Composite node (cloned); `None` for other variants.
    pub fn state(&self) -> Option<Value> {
        match &*self.inner {
            Inner::Composite(composite) => Some(composite.state.borrow().clone()),
            _ => None,
        }
    }

    /// Same-type test used by the equivalence predicate: tag equality for
    /// elements, component type identity for composites, variant match for
    /// text.
    pub(crate) fn same_type(&self, other: &VNode) -> bool {
        match (&*self.inner, &*other.inner) {
            (Inner::Element(a), Inner::Element(b)) => a.tag == b.tag,
            (Inner::Text(_), Inner::Text(_)) => true,
            (Inner::Composite(a), Inner::Composite(b)) => {
                a.component.as_ref().type_id() == b.component.as_ref().type_id()
            }
            _ => false,
        }
    }

    /// Compute this node's expansion: the element/text-only tree the
    /// reconciler diffs. Elements rebuild their `rendered_children`;
    /// composites expand through `render` without caching (only a build or
    /// `set_state` commits an expansion).
    pub fn expand(&self) -> VNode {
        match &*self.inner {
            Inner::Text(_) => self.clone(),
            Inner::Element(element) => {
                let rendered: Vec<VNode> = element
                    .children
                    .borrow()
                    .iter()
                    .map(VNode::expand)
                    .collect();
                *element.rendered_children.borrow_mut() = Some(rendered);
                self.clone()
            }
            Inner::Composite(composite) => self.render_composite(composite).expand(),
        }
    }

    fn render_composite(&self, composite: &CompositeNode) -> VNode {
        let props = composite.props.borrow();
        let children = composite.children.borrow();
        let state = composite.state.borrow();
        composite.component.render(Scope {
            props: &props,
            children: &children,
            state: &state,
            owner: self,
        })
    }

    /// Full build of this node into `range` (spec'd host content replace).
    ///
    /// The range's identity is preserved, so ancestors holding adjacent
    /// ranges stay valid; only its contents are swapped.
    pub fn render_into(
        &self,
        range: RangeId,
        host: &mut dyn HostDocument,
    ) -> Result<(), RenderError> {
        self.set_range(range);
        match &*self.inner {
            Inner::Text(text) => {
                let node = host.create_text(&text.content);
                replace_contents(host, range, node)?;
            }
            Inner::Element(element) => {
                let el = host.create_element(&element.tag);
                for (name, value) in element.props.borrow().iter() {
                    apply_prop(host, el, name, value)?;
                }
                let rendered = {
                    let mut cache = element.rendered_children.borrow_mut();
                    cache
                        .get_or_insert_with(|| {
                            element.children.borrow().iter().map(VNode::expand).collect()
                        })
                        .clone()
                };
                for child in &rendered {
                    let offset = host.child_count(el)?;
                    let child_range = host.create_range();
                    host.set_start(child_range, el, offset)?;
                    host.set_end(child_range, el, offset)?;
                    child.render_into(child_range, host)?;
                }
                replace_contents(host, range, el)?;
            }
            Inner::Composite(composite) => {
                let expansion = self.render_composite(composite).expand();
                expansion.render_into(range, host)?;
                *composite.expansion.borrow_mut() = Some(expansion);
            }
        }
        Ok(())
    }

    /// Merge `patch` into this composite's state and reconcile its subtree
    /// against the previously rendered expansion. Synchronous: the host has
    /// been patched by the time this returns.
    pub fn set_state(&self, patch: Value, host: &mut dyn HostDocument) -> Result<(), RenderError> {
        let Inner::Composite(composite) = &*self.inner else {
            return Err(RenderError::NotComposite);
        };
        let previous = composite
            .expansion
            .borrow()
            .clone()
            .ok_or(RenderError::MissingAnchor)?;
        merge_state(&mut composite.state.borrow_mut(), &patch)?;
        let next = self.render_composite(composite).expand();
        crate::reconcile::Reconciler::default().reconcile(&previous, &next, host)?;
        *composite.expansion.borrow_mut() = Some(next);
        Ok(())
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            Inner::Element(element) => f
                .debug_struct("Element")
                .field("tag", &element.tag)
                .field("props", &*element.props.borrow())
                .field("children", &element.children.borrow().len())
                .field("range", &element.range.get())
                .finish(),
            Inner::Text(text) => f
                .debug_struct("Text")
                .field("content", &text.content)
                .field("range", &text.range.get())
                .finish(),
            Inner::Composite(composite) => f
                .debug_struct("Composite")
                .field("props", &*composite.props.borrow())
                .field("range", &composite.range.get())
                .finish(),
        }
    }
}

/// Build one virtual node from a type descriptor, an attribute list, and an
/// arbitrarily nested child sequence.
pub fn create_element(
    kind: impl Into<NodeKind>,
    attrs: &[(&str, PropValue)],
    children: impl IntoIterator<Item = Child>,
) -> VNode {
    let node = match kind.into() {
        NodeKind::Tag(tag) => VNode::element(tag),
        NodeKind::Component(component) => VNode::composite(component),
    };
    for (name, value) in attrs {
        node.set_attribute(*name, value.clone());
    }
    append_children(&node, children);
    node
}

fn append_children(node: &VNode, children: impl IntoIterator<Item = Child>) {
    for child in children {
        match child {
            Child::Nothing => {}
            Child::Text(text) => node.append_child(VNode::text(text)),
            Child::Node(value) => node.append_child(value),
            Child::Many(nested) => append_children(node, nested),
        }
    }
}

/// The host-side replace idiom: insert at the range start, delete whatever
/// the range previously contained, then re-wrap the boundaries around the
/// inserted node.
fn replace_contents(
    host: &mut dyn HostDocument,
    range: RangeId,
    node: crate::host::NodeRef,
) -> Result<(), HostError> {
    host.insert_node(range, node)?;
    host.set_start_after(range, node)?;
    host.delete_contents(range)?;
    host.set_start_before(range, node)?;
    host.set_end_after(range, node)?;
    Ok(())
}

fn apply_prop(
    host: &mut dyn HostDocument,
    el: crate::host::NodeRef,
    name: &str,
    value: &PropValue,
) -> Result<(), HostError> {
    if let Some(event) = event_name(name) {
        match value {
            PropValue::Listener(handler) => {
                host.add_event_listener(el, &event, handler.clone())?;
            }
            PropValue::Text(_) => {
                log::warn!("prop {name:?} names an event but holds text; skipped");
            }
        }
    } else {
        match value {
            PropValue::Text(text) => {
                let attr = if name == "className" { "class" } else { name };
                host.set_attribute(el, attr, text)?;
            }
            PropValue::Listener(_) => {
                log::warn!("listener prop {name:?} lacks the on prefix; skipped");
            }
        }
    }
    Ok(())
}

/// `onClick` -> `click`, `onMouseDown` -> `mouseDown`: strip the prefix and
/// lowercase the first character of what remains.
fn event_name(name: &str) -> Option<String> {
    let suffix = name.strip_prefix("on")?;
    let mut chars = suffix.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_lowercase_the_first_character_only() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onMouseDown").as_deref(), Some("mouseDown"));
        assert_eq!(event_name("onclick").as_deref(), Some("click"));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("class"), None);
    }

    #[test]
    fn child_lists_flatten_and_coerce() {
        let node = create_element(
            "div",
            &[],
            children![
                "plain",
                Child::Nothing,
                vec![Child::from("nested"), Child::from(VNode::element("span"))],
            ],
        );
        let expansion = node.expand();
        let rendered = expansion.rendered_children().unwrap();
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0].text_content(), Some("plain"));
        assert_eq!(rendered[1].text_content(), Some("nested"));
        assert_eq!(rendered[2].tag(), Some("span"));
    }

    #[test]
    fn attributes_apply_in_order_with_unique_keys() {
        let node = create_element(
            "div",
            &[("id", "a".into()), ("class", "b".into()), ("id", "c".into())],
            children![],
        );
        let props = node.props().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("id"), Some(&PropValue::Text("c".to_string())));
    }

    #[test]
    fn composite_descriptor_builds_a_composite() {
        #[derive(Default)]
        struct Empty;
        impl Component for Empty {
            fn render(&self, _scope: Scope<'_>) -> VNode {
                VNode::text("empty")
            }
        }

        let node = create_element(NodeKind::composite::<Empty>(), &[], children![]);
        assert!(node.is_composite());
        let expansion = node.expand();
        assert_eq!(expansion.text_content(), Some("empty"));
    }
}
