//! Diff/patch over virtual-node expansions.
//!
//! `reconcile` walks an old expansion (ranges already assigned) and a new one
//! (no ranges yet). Equivalent nodes hand their anchor range to the new tree
//! untouched; anything else is a localized full rebuild into the old node's
//! range. Children are matched strictly by position: there is no key or move
//! detection, so a reorder degrades to rebuilding everything after the first
//! divergent index.

use crate::host::HostDocument;
use crate::vnode::VNode;
use crate::RenderError;

/// How the equivalence test treats props removed between old and new.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PropPolicy {
    /// The legacy rule: every prop of the new node must match the old one,
    /// and the old node must not carry strictly more props in total. Extra
    /// old props alone do not force a replace; in particular a new node with
    /// no props at all skips the prop check entirely.
    #[default]
    CountOnly,
    /// Any removed prop forces a replace: key sets must match exactly.
    Strict,
}

/// What happens to old children past the end of a shorter new list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrailingPolicy {
    /// Leave surplus host content in place. This is the documented legacy
    /// gap, kept as the default so existing behavior stays observable.
    #[default]
    Preserve,
    /// Delete the contents of each surplus trailing child's range.
    Release,
}

/// Decide patch-in-place vs. full replace for a single node pair.
///
/// Pure and shallow: children are reconciled independently afterward, so a
/// `true` here says nothing about descendants.
pub fn is_equivalent(old: &VNode, new: &VNode, policy: PropPolicy) -> bool {
    if !old.same_type(new) {
        return false;
    }
    if let (Some(old_props), Some(new_props)) = (old.props(), new.props()) {
        match policy {
            PropPolicy::CountOnly => {
                if !new_props.is_empty() {
                    if old_props.len() > new_props.len() {
                        return false;
                    }
                    for (name, value) in new_props.iter() {
                        if old_props.get(name) != Some(value) {
                            return false;
                        }
                    }
                }
            }
            PropPolicy::Strict => {
                if old_props.len() != new_props.len() {
                    return false;
                }
                for (name, value) in new_props.iter() {
                    if old_props.get(name) != Some(value) {
                        return false;
                    }
                }
            }
        }
    }
    if let (Some(old_text), Some(new_text)) = (old.text_content(), new.text_content()) {
        if old_text != new_text {
            return false;
        }
    }
    true
}

/// Reconciliation configuration; `Default` is the documented legacy behavior
/// on both axes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reconciler {
    pub prop_policy: PropPolicy,
    pub trailing: TrailingPolicy,
}

impl Reconciler {
    pub fn new(prop_policy: PropPolicy, trailing: TrailingPolicy) -> Self {
        Self {
            prop_policy,
            trailing,
        }
    }

    /// Patch the host so it shows `new` where `old` was rendered.
    ///
    /// `old` must carry an anchor range (it was rendered before); `new` is
    /// given ranges as the walk proceeds.
    pub fn reconcile(
        &self,
        old: &VNode,
        new: &VNode,
        host: &mut dyn HostDocument,
    ) -> Result<(), RenderError> {
        let range = old.range().ok_or(RenderError::MissingAnchor)?;
        if !is_equivalent(old, new, self.prop_policy) {
            log::trace!("replace: rebuilding into range {range}");
            return build_into(new, range, host);
        }
        new.set_range(range);

        // Composites carry no host content of their own; diff the trees
        // their components rendered.
        if old.is_composite() {
            let old_expansion = old
                .cached_expansion()
                .ok_or(RenderError::MissingAnchor)?;
            let new_expansion = new.expand();
            self.reconcile(&old_expansion, &new_expansion, host)?;
            new.cache_expansion(new_expansion);
            return Ok(());
        }

        let (Some(old_children), Some(new_children)) =
            (old.rendered_children(), new.rendered_children())
        else {
            return Ok(());
        };

        // Tail of the already-placed content; appended children anchor a
        // fresh zero-width range at its live end. Resolved lazily: a shorter
        // or equal new list never needs it.
        let mut tail = None;
        for (index, new_child) in new_children.iter().enumerate() {
            match old_children.get(index) {
                Some(old_child) => {
                    self.reconcile(old_child, new_child, host)?;
                }
                None => {
                    let anchor = match tail {
                        Some(range) => range,
                        None => old_children
                            .last()
                            .and_then(VNode::range)
                            .ok_or(RenderError::MissingAnchor)?,
                    };
                    let end = host.end_boundary(anchor)?;
                    let fresh = host.create_range();
                    host.set_start(fresh, end.container, end.offset)?;
                    host.set_end(fresh, end.container, end.offset)?;
                    log::trace!("append: building child {index} into range {fresh}");
                    build_into(new_child, fresh, host)?;
                    tail = Some(fresh);
                }
            }
        }

        if self.trailing == TrailingPolicy::Release && old_children.len() > new_children.len() {
            for old_child in &old_children[new_children.len()..] {
                let range = old_child.range().ok_or(RenderError::MissingAnchor)?;
                log::trace!("release: deleting surplus child range {range}");
                host.delete_contents(range)?;
            }
        }
        Ok(())
    }
}

/// Reconcile with the default (legacy) configuration.
pub fn reconcile(old: &VNode, new: &VNode, host: &mut dyn HostDocument) -> Result<(), RenderError> {
    Reconciler::default().reconcile(old, new, host)
}

/// Full build of `node` into `range`. On failure the range is left
/// defined-empty rather than partially populated.
pub fn build_into(
    node: &VNode,
    range: crate::host::RangeId,
    host: &mut dyn HostDocument,
) -> Result<(), RenderError> {
    match node.render_into(range, host) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = host.delete_contents(range);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::{create_element, Component, Scope};
    use crate::{children, VNode};

    fn div(attrs: &[(&str, crate::vnode::PropValue)]) -> VNode {
        create_element("div", attrs, children![])
    }

    #[test]
    fn different_tags_are_never_equivalent() {
        let old = div(&[]);
        let new = create_element("span", &[], children![]);
        assert!(!is_equivalent(&old, &new, PropPolicy::CountOnly));
    }

    #[test]
    fn element_and_text_are_never_equivalent() {
        let old = div(&[]);
        let new = VNode::text("div");
        assert!(!is_equivalent(&old, &new, PropPolicy::CountOnly));
    }

    #[test]
    fn identical_props_are_equivalent_regardless_of_children() {
        let old = create_element("div", &[("id", "a".into())], children!["x"]);
        let new = create_element(
            "div",
            &[("id", "a".into())],
            children!["completely", "different"],
        );
        assert!(is_equivalent(&old, &new, PropPolicy::CountOnly));
    }

    #[test]
    fn any_changed_prop_value_breaks_equivalence() {
        let old = div(&[("id", "a".into())]);
        let new = div(&[("id", "b".into())]);
        assert!(!is_equivalent(&old, &new, PropPolicy::CountOnly));
    }

    #[test]
    fn count_only_skips_the_prop_check_when_new_has_none() {
        // The documented asymmetry: dropping every prop still counts as the
        // same node under the legacy rule.
        let old = div(&[("id", "a".into())]);
        let new = div(&[]);
        assert!(is_equivalent(&old, &new, PropPolicy::CountOnly));
        assert!(!is_equivalent(&old, &new, PropPolicy::Strict));
    }

    #[test]
    fn count_only_rejects_old_nodes_with_more_props() {
        let old = div(&[("id", "a".into()), ("class", "b".into())]);
        let new = div(&[("id", "a".into())]);
        assert!(!is_equivalent(&old, &new, PropPolicy::CountOnly));
    }

    #[test]
    fn strict_requires_exactly_matching_key_sets() {
        let old = div(&[("id", "a".into())]);
        let new = div(&[("id", "a".into())]);
        assert!(is_equivalent(&old, &new, PropPolicy::Strict));

        let extra = div(&[("id", "a".into()), ("class", "b".into())]);
        assert!(!is_equivalent(&extra, &new, PropPolicy::Strict));
        assert!(!is_equivalent(&new, &extra, PropPolicy::Strict));
    }

    #[test]
    fn text_nodes_compare_content_even_without_props() {
        let old = VNode::text("a");
        let changed = VNode::text("b");
        let same = VNode::text("a");
        assert!(!is_equivalent(&old, &changed, PropPolicy::CountOnly));
        assert!(is_equivalent(&old, &same, PropPolicy::CountOnly));
    }

    #[test]
    fn composites_compare_by_component_type() {
        #[derive(Default)]
        struct A;
        impl Component for A {
            fn render(&self, _scope: Scope<'_>) -> VNode {
                VNode::text("a")
            }
        }
        #[derive(Default)]
        struct B;
        impl Component for B {
            fn render(&self, _scope: Scope<'_>) -> VNode {
                VNode::text("b")
            }
        }

        let a = VNode::composite(Box::new(A));
        let a2 = VNode::composite(Box::new(A));
        let b = VNode::composite(Box::new(B));
        assert!(is_equivalent(&a, &a2, PropPolicy::CountOnly));
        assert!(!is_equivalent(&a, &b, PropPolicy::CountOnly));
    }

    #[test]
    fn appending_past_an_empty_child_list_has_no_tail_anchor() {
        let mut host = crate::host::MemoryHost::new();
        let body = host.create_element("body");
        let old = div(&[]);
        crate::render(&old, &mut host, body).unwrap();

        // No old child exists to anchor the append after.
        let new = create_element("div", &[], children!["x"]).expand();
        assert!(matches!(
            reconcile(&old, &new, &mut host),
            Err(RenderError::MissingAnchor)
        ));
    }

    #[test]
    fn reconcile_without_a_range_is_a_sequencing_error() {
        let mut host = crate::host::MemoryHost::new();
        let old = div(&[]).expand();
        let new = div(&[]).expand();
        assert!(matches!(
            reconcile(&old, &new, &mut host),
            Err(RenderError::MissingAnchor)
        ));
    }
}
