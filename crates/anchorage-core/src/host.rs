//! Host-document contract and an arena-backed in-memory implementation.
//!
//! The reconciler never touches a concrete document; everything it needs is
//! expressed through [`HostDocument`]: creating elements and text nodes,
//! setting attributes, registering listeners, and the anchor-range primitives
//! that let a patch land in an arbitrary interior position of the tree.
//! [`MemoryHost`] implements the contract over plain `Vec` arenas so the core
//! can be exercised without a real document.

use std::cmp;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

/// Opaque handle to a host node (element or text).
pub type NodeRef = usize;
/// Opaque handle to an anchor range.
pub type RangeId = usize;

/// A position inside a container: the gap before the child at `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub container: NodeRef,
    pub offset: usize,
}

/// Payload handed to event listeners when the host dispatches an event.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
}

/// Listeners receive the dispatching host so they can call back into the
/// library (`set_state` from a click handler is the expected use).
pub type EventHandler = Rc<dyn Fn(&mut dyn HostDocument, &Event)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    MissingNode { node: NodeRef },
    MissingRange { range: RangeId },
    /// The range has no container yet; boundaries were never set.
    Unanchored { range: RangeId },
    /// The node has no parent, so relative boundary operations cannot resolve.
    Detached { node: NodeRef },
    NotAnElement { node: NodeRef },
    InvalidOffset { container: NodeRef, offset: usize },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::MissingNode { node } => write!(f, "host node {node} missing"),
            HostError::MissingRange { range } => write!(f, "range {range} missing"),
            HostError::Unanchored { range } => write!(f, "range {range} has no boundaries"),
            HostError::Detached { node } => write!(f, "host node {node} has no parent"),
            HostError::NotAnElement { node } => write!(f, "host node {node} is not an element"),
            HostError::InvalidOffset { container, offset } => {
                write!(f, "offset {offset} out of bounds in container {container}")
            }
        }
    }
}

impl std::error::Error for HostError {}

/// The capabilities a host document must expose to the reconciler.
///
/// Ranges are live: the host is responsible for keeping every range's
/// boundaries consistent when nodes are inserted into or removed from a
/// container. That liveness is what keeps sibling ranges contiguous across
/// patches without the reconciler re-deriving offsets.
pub trait HostDocument {
    fn create_range(&mut self) -> RangeId;
    fn set_start(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError>;
    fn set_end(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError>;
    fn set_start_before(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError>;
    fn set_start_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError>;
    fn set_end_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError>;
    fn end_boundary(&self, range: RangeId) -> Result<Boundary, HostError>;
    /// Insert `node` at the range's start position.
    fn insert_node(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError>;
    /// Remove everything between the range's boundaries, collapsing it.
    fn delete_contents(&mut self, range: RangeId) -> Result<(), HostError>;
    fn create_element(&mut self, tag: &str) -> NodeRef;
    fn create_text(&mut self, content: &str) -> NodeRef;
    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), HostError>;
    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>, HostError>;
    /// Register a listener under an already-lowercased event name.
    fn add_event_listener(
        &mut self,
        node: NodeRef,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;
    fn child_count(&self, node: NodeRef) -> Result<usize, HostError>;
}

struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeRef>,
}

enum HostNode {
    Element(ElementData),
    Text { content: String },
}

struct Entry {
    node: HostNode,
    parent: Option<NodeRef>,
}

#[derive(Clone, Copy, Default)]
struct RangeData {
    container: Option<NodeRef>,
    start: usize,
    end: usize,
}

/// In-memory host document backed by `Vec` arenas.
///
/// Node slots are never reused, so a freed `NodeRef` stays invalid instead of
/// silently aliasing a newer node.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<Entry>>,
    ranges: Vec<RangeData>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, node: NodeRef) -> Result<&Entry, HostError> {
        self.nodes
            .get(node)
            .and_then(Option::as_ref)
            .ok_or(HostError::MissingNode { node })
    }

    fn entry_mut(&mut self, node: NodeRef) -> Result<&mut Entry, HostError> {
        self.nodes
            .get_mut(node)
            .and_then(Option::as_mut)
            .ok_or(HostError::MissingNode { node })
    }

    fn element(&self, node: NodeRef) -> Result<&ElementData, HostError> {
        match &self.entry(node)?.node {
            HostNode::Element(data) => Ok(data),
            HostNode::Text { .. } => Err(HostError::NotAnElement { node }),
        }
    }

    fn element_mut(&mut self, node: NodeRef) -> Result<&mut ElementData, HostError> {
        match &mut self.entry_mut(node)?.node {
            HostNode::Element(data) => Ok(data),
            HostNode::Text { .. } => Err(HostError::NotAnElement { node }),
        }
    }

    fn range(&self, range: RangeId) -> Result<&RangeData, HostError> {
        self.ranges.get(range).ok_or(HostError::MissingRange { range })
    }

    fn range_mut(&mut self, range: RangeId) -> Result<&mut RangeData, HostError> {
        self.ranges
            .get_mut(range)
            .ok_or(HostError::MissingRange { range })
    }

    /// Resolve a node to its parent container and index within it.
    fn locate(&self, node: NodeRef) -> Result<(NodeRef, usize), HostError> {
        let parent = self
            .entry(node)?
            .parent
            .ok_or(HostError::Detached { node })?;
        let index = self
            .element(parent)?
            .children
            .iter()
            .position(|child| *child == node)
            .ok_or(HostError::Detached { node })?;
        Ok((parent, index))
    }

    /// Boundary updates after one node was inserted at `pos`: boundaries
    /// strictly after the insertion point move right, boundaries at it stay.
    fn shift_after_insert(&mut self, container: NodeRef, pos: usize) {
        for range in &mut self.ranges {
            if range.container != Some(container) {
                continue;
            }
            if range.start > pos {
                range.start += 1;
            }
            if range.end > pos {
                range.end += 1;
            }
        }
    }

    /// Boundary updates after `count` nodes were removed starting at `pos`:
    /// boundaries inside the removed region collapse to `pos`, later ones
    /// move left by `count`.
    fn shift_after_delete(&mut self, container: NodeRef, pos: usize, count: usize) {
        for range in &mut self.ranges {
            if range.container != Some(container) {
                continue;
            }
            if range.start > pos {
                range.start = cmp::max(pos, range.start.saturating_sub(count));
            }
            if range.end > pos {
                range.end = cmp::max(pos, range.end.saturating_sub(count));
            }
        }
    }

    fn free(&mut self, node: NodeRef) {
        let Some(entry) = self.nodes.get_mut(node).and_then(Option::take) else {
            return;
        };
        if let HostNode::Element(data) = entry.node {
            for child in data.children {
                self.free(child);
            }
        }
    }

    /// Fire every listener registered on `node` under `event`.
    ///
    /// Handlers receive `self` as the host, so a handler may mutate the tree
    /// (the usual case: a state update that reconciles in place). Returns the
    /// number of listeners invoked.
    pub fn dispatch(&mut self, node: NodeRef, event: &str) -> Result<usize, HostError> {
        let handlers: Vec<EventHandler> = self
            .element(node)?
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        let payload = Event {
            name: event.to_string(),
        };
        let count = handlers.len();
        for handler in handlers {
            handler(self, &payload);
        }
        Ok(count)
    }

    /// Number of live (non-freed) nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, node: NodeRef) -> Result<Vec<NodeRef>, HostError> {
        Ok(self.element(node)?.children.clone())
    }

    pub fn tag(&self, node: NodeRef) -> Result<&str, HostError> {
        Ok(&self.element(node)?.tag)
    }

    pub fn text(&self, node: NodeRef) -> Result<Option<&str>, HostError> {
        match &self.entry(node)?.node {
            HostNode::Text { content } => Ok(Some(content)),
            HostNode::Element(_) => Ok(None),
        }
    }

    pub fn listener_count(&self, node: NodeRef, event: &str) -> Result<usize, HostError> {
        Ok(self
            .element(node)?
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count())
    }

    pub fn boundaries(&self, range: RangeId) -> Result<(Boundary, Boundary), HostError> {
        let data = self.range(range)?;
        let container = data.container.ok_or(HostError::Unanchored { range })?;
        Ok((
            Boundary {
                container,
                offset: data.start,
            },
            Boundary {
                container,
                offset: data.end,
            },
        ))
    }

    pub fn dump_tree(&self, root: NodeRef) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, node: NodeRef, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.nodes.get(node).and_then(Option::as_ref) {
            Some(entry) => match &entry.node {
                HostNode::Element(data) => {
                    let _ = write!(output, "{indent}<{}", data.tag);
                    for (name, value) in &data.attributes {
                        let _ = write!(output, " {name}=\"{value}\"");
                    }
                    output.push_str(">\n");
                    for child in &data.children {
                        self.dump_node(output, *child, depth + 1);
                    }
                }
                HostNode::Text { content } => {
                    let _ = writeln!(output, "{indent}\"{content}\"");
                }
            },
            None => {
                let _ = writeln!(output, "{indent}(missing node {node})");
            }
        }
    }
}

impl HostDocument for MemoryHost {
    fn create_range(&mut self) -> RangeId {
        let id = self.ranges.len();
        self.ranges.push(RangeData::default());
        id
    }

    fn set_start(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError> {
        let data = self.range_mut(range)?;
        if data.container != Some(container) || data.end < offset {
            data.end = offset;
        }
        data.container = Some(container);
        data.start = offset;
        Ok(())
    }

    fn set_end(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError> {
        let data = self.range_mut(range)?;
        if data.container != Some(container) || data.start > offset {
            data.start = offset;
        }
        data.container = Some(container);
        data.end = offset;
        Ok(())
    }

    fn set_start_before(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        let (parent, index) = self.locate(node)?;
        self.set_start(range, parent, index)
    }

    fn set_start_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        let (parent, index) = self.locate(node)?;
        self.set_start(range, parent, index + 1)
    }

    fn set_end_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        let (parent, index) = self.locate(node)?;
        self.set_end(range, parent, index + 1)
    }

    fn end_boundary(&self, range: RangeId) -> Result<Boundary, HostError> {
        let data = self.range(range)?;
        let container = data.container.ok_or(HostError::Unanchored { range })?;
        Ok(Boundary {
            container,
            offset: data.end,
        })
    }

    fn insert_node(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        let data = self.range(range)?;
        let container = data.container.ok_or(HostError::Unanchored { range })?;
        let pos = data.start;
        self.entry(node)?;
        {
            let element = self.element_mut(container)?;
            if pos > element.children.len() {
                return Err(HostError::InvalidOffset {
                    container,
                    offset: pos,
                });
            }
            element.children.insert(pos, node);
        }
        self.entry_mut(node)?.parent = Some(container);
        self.shift_after_insert(container, pos);
        Ok(())
    }

    fn delete_contents(&mut self, range: RangeId) -> Result<(), HostError> {
        let data = *self.range(range)?;
        let container = data.container.ok_or(HostError::Unanchored { range })?;
        if data.end <= data.start {
            return Ok(());
        }
        let removed: Vec<NodeRef> = {
            let element = self.element_mut(container)?;
            let end = cmp::min(data.end, element.children.len());
            if data.start >= end {
                return Ok(());
            }
            element.children.drain(data.start..end).collect()
        };
        for node in &removed {
            self.free(*node);
        }
        self.shift_after_delete(container, data.start, removed.len());
        Ok(())
    }

    fn create_element(&mut self, tag: &str) -> NodeRef {
        let id = self.nodes.len();
        self.nodes.push(Some(Entry {
            node: HostNode::Element(ElementData {
                tag: tag.to_string(),
                attributes: IndexMap::new(),
                listeners: Vec::new(),
                children: Vec::new(),
            }),
            parent: None,
        }));
        id
    }

    fn create_text(&mut self, content: &str) -> NodeRef {
        let id = self.nodes.len();
        self.nodes.push(Some(Entry {
            node: HostNode::Text {
                content: content.to_string(),
            },
            parent: None,
        }));
        id
    }

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), HostError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>, HostError> {
        Ok(self.element(node)?.attributes.get(name).cloned())
    }

    fn add_event_listener(
        &mut self,
        node: NodeRef,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        self.element_mut(node)?
            .listeners
            .push((event.to_string(), handler));
        Ok(())
    }

    fn child_count(&self, node: NodeRef) -> Result<usize, HostError> {
        match &self.entry(node)?.node {
            HostNode::Element(data) => Ok(data.children.len()),
            HostNode::Text { .. } => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_parent() -> (MemoryHost, NodeRef) {
        let mut host = MemoryHost::new();
        let parent = host.create_element("div");
        (host, parent)
    }

    #[test]
    fn insert_shifts_later_boundaries() {
        let (mut host, parent) = host_with_parent();
        let a = host.create_text("a");
        let b = host.create_text("b");

        let first = host.create_range();
        host.set_start(first, parent, 0).unwrap();
        host.set_end(first, parent, 0).unwrap();
        host.insert_node(first, a).unwrap();
        host.set_end_after(first, a).unwrap();

        let second = host.create_range();
        host.set_start(second, parent, 1).unwrap();
        host.set_end(second, parent, 1).unwrap();
        host.insert_node(second, b).unwrap();
        host.set_end_after(second, b).unwrap();

        // A boundary exactly at the insertion point stays put; inserting at
        // offset 0 again must push both existing ranges right.
        let c = host.create_text("c");
        let front = host.create_range();
        host.set_start(front, parent, 0).unwrap();
        host.set_end(front, parent, 0).unwrap();
        host.insert_node(front, c).unwrap();

        let (start, end) = host.boundaries(first).unwrap();
        assert_eq!((start.offset, end.offset), (0, 2));
        let (start, end) = host.boundaries(second).unwrap();
        assert_eq!((start.offset, end.offset), (2, 3));
    }

    #[test]
    fn delete_collapses_inner_boundaries_and_shifts_later_ones() {
        let (mut host, parent) = host_with_parent();
        for text in ["a", "b", "c", "d"] {
            let node = host.create_text(text);
            let range = host.create_range();
            let offset = host.child_count(parent).unwrap();
            host.set_start(range, parent, offset).unwrap();
            host.set_end(range, parent, offset).unwrap();
            host.insert_node(range, node).unwrap();
        }

        let middle = host.create_range();
        host.set_start(middle, parent, 1).unwrap();
        host.set_end(middle, parent, 3).unwrap();

        let tail = host.create_range();
        host.set_start(tail, parent, 3).unwrap();
        host.set_end(tail, parent, 4).unwrap();

        host.delete_contents(middle).unwrap();

        assert_eq!(host.child_count(parent).unwrap(), 2);
        let (start, end) = host.boundaries(middle).unwrap();
        assert_eq!((start.offset, end.offset), (1, 1));
        let (start, end) = host.boundaries(tail).unwrap();
        assert_eq!((start.offset, end.offset), (1, 2));
    }

    #[test]
    fn delete_frees_subtrees() {
        let (mut host, parent) = host_with_parent();
        let inner = host.create_element("span");
        let text = host.create_text("x");

        let inner_range = host.create_range();
        host.set_start(inner_range, inner, 0).unwrap();
        host.set_end(inner_range, inner, 0).unwrap();
        host.insert_node(inner_range, text).unwrap();

        let range = host.create_range();
        host.set_start(range, parent, 0).unwrap();
        host.set_end(range, parent, 0).unwrap();
        host.insert_node(range, inner).unwrap();
        host.set_end_after(range, inner).unwrap();

        assert_eq!(host.len(), 3);
        host.delete_contents(range).unwrap();
        assert_eq!(host.len(), 1);
        assert!(matches!(
            host.child_count(inner),
            Err(HostError::MissingNode { .. })
        ));
    }

    #[test]
    fn set_start_past_end_collapses_the_range() {
        let (mut host, parent) = host_with_parent();
        let a = host.create_text("a");
        let range = host.create_range();
        host.set_start(range, parent, 0).unwrap();
        host.set_end(range, parent, 0).unwrap();
        host.insert_node(range, a).unwrap();

        host.set_start_after(range, a).unwrap();
        let (start, end) = host.boundaries(range).unwrap();
        assert_eq!((start.offset, end.offset), (1, 1));
    }

    #[test]
    fn dispatch_invokes_matching_listeners_only() {
        let (mut host, parent) = host_with_parent();
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = hits.clone();
        host.add_event_listener(
            parent,
            "click",
            Rc::new(move |_, event| {
                assert_eq!(event.name, "click");
                counter.set(counter.get() + 1);
            }),
        )
        .unwrap();

        assert_eq!(host.dispatch(parent, "click").unwrap(), 1);
        assert_eq!(host.dispatch(parent, "keydown").unwrap(), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unanchored_range_refuses_insertion() {
        let mut host = MemoryHost::new();
        let node = host.create_text("x");
        let range = host.create_range();
        assert!(matches!(
            host.insert_node(range, node),
            Err(HostError::Unanchored { .. })
        ));
    }
}
