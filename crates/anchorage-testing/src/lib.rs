//! Testing utilities for the anchorage reconciler.
//!
//! [`RecordingHost`] wraps any [`HostDocument`] and keeps a log of every
//! mutating call, which is how the minimality properties of the reconciler
//! (idempotence, append-only growth) are asserted: reconcile, then inspect
//! what the host was actually asked to do.

use anchorage_core::{
    Boundary, EventHandler, HostDocument, HostError, MemoryHost, NodeRef, RangeId,
};

/// One mutating host call. Queries are deliberately not recorded; reading
/// the host is always free.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateRange,
    SetBoundary { range: RangeId },
    CreateElement { tag: String },
    CreateText { content: String },
    InsertNode { range: RangeId },
    DeleteContents { range: RangeId },
    SetAttribute { name: String, value: String },
    AddListener { event: String },
}

impl HostOp {
    pub fn is_node_creation(&self) -> bool {
        matches!(self, HostOp::CreateElement { .. } | HostOp::CreateText { .. })
    }
}

/// Host wrapper that forwards every call and records the mutating ones.
pub struct RecordingHost<H = MemoryHost> {
    inner: H,
    ops: Vec<HostOp>,
}

impl<H: HostDocument> RecordingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn count(&self, predicate: impl Fn(&HostOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: HostDocument> HostDocument for RecordingHost<H> {
    fn create_range(&mut self) -> RangeId {
        self.ops.push(HostOp::CreateRange);
        self.inner.create_range()
    }

    fn set_start(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::SetBoundary { range });
        self.inner.set_start(range, container, offset)
    }

    fn set_end(
        &mut self,
        range: RangeId,
        container: NodeRef,
        offset: usize,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::SetBoundary { range });
        self.inner.set_end(range, container, offset)
    }

    fn set_start_before(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        self.ops.push(HostOp::SetBoundary { range });
        self.inner.set_start_before(range, node)
    }

    fn set_start_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        self.ops.push(HostOp::SetBoundary { range });
        self.inner.set_start_after(range, node)
    }

    fn set_end_after(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        self.ops.push(HostOp::SetBoundary { range });
        self.inner.set_end_after(range, node)
    }

    fn end_boundary(&self, range: RangeId) -> Result<Boundary, HostError> {
        self.inner.end_boundary(range)
    }

    fn insert_node(&mut self, range: RangeId, node: NodeRef) -> Result<(), HostError> {
        self.ops.push(HostOp::InsertNode { range });
        self.inner.insert_node(range, node)
    }

    fn delete_contents(&mut self, range: RangeId) -> Result<(), HostError> {
        self.ops.push(HostOp::DeleteContents { range });
        self.inner.delete_contents(range)
    }

    fn create_element(&mut self, tag: &str) -> NodeRef {
        self.ops.push(HostOp::CreateElement {
            tag: tag.to_string(),
        });
        self.inner.create_element(tag)
    }

    fn create_text(&mut self, content: &str) -> NodeRef {
        self.ops.push(HostOp::CreateText {
            content: content.to_string(),
        });
        self.inner.create_text(content)
    }

    fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<(), HostError> {
        self.ops.push(HostOp::SetAttribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.inner.set_attribute(node, name, value)
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>, HostError> {
        self.inner.attribute(node, name)
    }

    fn add_event_listener(
        &mut self,
        node: NodeRef,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        self.ops.push(HostOp::AddListener {
            event: event.to_string(),
        });
        self.inner.add_event_listener(node, event, handler)
    }

    fn child_count(&self, node: NodeRef) -> Result<usize, HostError> {
        self.inner.child_count(node)
    }
}

/// A recording host over a fresh in-memory document, plus a root container
/// created before recording starts.
pub fn recording_fixture() -> (RecordingHost<MemoryHost>, NodeRef) {
    let mut host = MemoryHost::new();
    let root = host.create_element("root");
    (RecordingHost::new(host), root)
}
