//! Range-anchored reconciliation core for declarative UI trees.
//!
//! A tree of [`VNode`]s is built with [`create_element`], rendered into a
//! host document with [`render`], and kept in sync through
//! [`VNode::set_state`], which diffs the previous and next expansions instead
//! of rebuilding the host tree wholesale. The host itself stays behind the
//! [`HostDocument`] trait; [`MemoryHost`] is the bundled in-memory
//! implementation.

use std::fmt;

pub mod host;
pub mod reconcile;
pub mod state;
pub mod vnode;

pub use host::{
    Boundary, Event, EventHandler, HostDocument, HostError, MemoryHost, NodeRef, RangeId,
};
pub use reconcile::{build_into, is_equivalent, reconcile, PropPolicy, Reconciler, TrailingPolicy};
pub use state::{merge_state, StateError};
pub use vnode::{create_element, Child, Component, NodeKind, PropValue, Props, Scope, VNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A node without an assigned anchor range reached the reconciler; the
    /// caller patched before the first render.
    MissingAnchor,
    /// `set_state` was called on an Element or Text node.
    NotComposite,
    State(StateError),
    Host(HostError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingAnchor => {
                write!(f, "node has no anchor range; it was never rendered")
            }
            RenderError::NotComposite => write!(f, "set_state target is not a composite node"),
            RenderError::State(err) => write!(f, "state merge failed: {err}"),
            RenderError::Host(err) => write!(f, "host operation failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::State(err) => Some(err),
            RenderError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StateError> for RenderError {
    fn from(err: StateError) -> Self {
        RenderError::State(err)
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::Host(err)
    }
}

/// First render: claim the whole of `container` as the root anchor range,
/// drop whatever it held, and build `node` into it. Later `set_state` calls
/// patch inside that claim.
pub fn render(
    node: &VNode,
    host: &mut dyn HostDocument,
    container: NodeRef,
) -> Result<(), RenderError> {
    let range = host.create_range();
    let claim = host.child_count(container)?;
    host.set_start(range, container, 0)?;
    host.set_end(range, container, claim)?;
    host.delete_contents(range)?;
    build_into(node, range, host)
}
