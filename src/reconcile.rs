//! The reconciler: diffs an element tree against the previous reconciled
//! tree.
//!
//! Reconciliation walks the element tree pre-order, strictly left to right.
//! Matched positions reuse the previous node's retained state (component
//! hooks in particular); mismatched positions discard it, and the runtime
//! later runs cleanups for every hook that fell out of the tree.

use std::collections::{HashMap, VecDeque};

use crate::context::Context;
use crate::element::{
	same_component, Attribute, ComponentNode, Element, ElementNode, FragmentNode,
};
use crate::error::RenderError;
use crate::hooks::{run_effect, Hook};
use crate::tree::{
	dispose_hook, Reconciled, ReconciledAttribute, ReconciledComponent, ReconciledElement,
	ReconciledFragment, ReconciledText,
};

/// Reconciles `element` against the previous node at this position.
pub(crate) fn reconcile(
	ctx: &mut Context,
	element: &Element,
	prev: Option<&Reconciled>,
) -> Result<Reconciled, RenderError> {
	match element {
		Element::Text(text) => Ok(Reconciled::Text(ReconciledText {
			text: text.to_string(),
		})),
		Element::Node(node) => reconcile_element(ctx, node, prev),
		Element::Fragment(node) => reconcile_fragment(ctx, node, prev),
		Element::Component(node) => reconcile_component(ctx, node, prev),
		Element::Provider(node) => {
			let value = node.value.clone();
			ctx.with_provider(&node.key, value, |ctx| reconcile(ctx, &node.child, prev))
		}
	}
}

fn reconcile_element(
	ctx: &mut Context,
	node: &ElementNode,
	prev: Option<&Reconciled>,
) -> Result<Reconciled, RenderError> {
	let mut key = node.key.clone();
	let mut attributes = Vec::with_capacity(node.attributes.len());
	for attribute in &node.attributes {
		match attribute {
			Attribute::Static { name, value } => {
				attributes.push(ReconciledAttribute::Static {
					name: name.clone(),
					value: value.clone(),
				});
			}
			Attribute::EventHandler { kind, handler } => {
				ctx.record_handler(handler.clone());
				attributes.push(ReconciledAttribute::EventHandler {
					kind: *kind,
					id: handler.id.clone(),
				});
			}
			Attribute::ClientHook { id, name } => {
				attributes.push(ReconciledAttribute::ClientHook {
					name: name.clone(),
					id: id.clone(),
				});
			}
			Attribute::Key { value } => {
				// Promoted onto the node, never kept as an attribute.
				if key.is_none() {
					key = Some(value.clone());
				}
			}
		}
	}

	let matched = match prev {
		Some(Reconciled::Element(prev))
			if prev.tag == node.tag && prev.key.as_deref() == key.as_deref() =>
		{
			Some(prev)
		}
		_ => None,
	};
	let prev_children = matched.map(|prev| prev.children.as_slice()).unwrap_or(&[]);
	let children = reconcile_children(ctx, &node.children, prev_children)?;

	Ok(Reconciled::Element(ReconciledElement {
		tag: node.tag.clone(),
		key,
		attributes,
		children,
	}))
}

fn reconcile_fragment(
	ctx: &mut Context,
	node: &FragmentNode,
	prev: Option<&Reconciled>,
) -> Result<Reconciled, RenderError> {
	let matched = match prev {
		Some(Reconciled::Fragment(prev)) if prev.key == node.key => Some(prev),
		_ => None,
	};
	let prev_children = matched.map(|prev| prev.children.as_slice()).unwrap_or(&[]);
	let children = reconcile_children(ctx, &node.children, prev_children)?;
	Ok(Reconciled::Fragment(ReconciledFragment {
		key: node.key.clone(),
		children,
	}))
}

fn reconcile_component(
	ctx: &mut Context,
	node: &ComponentNode,
	prev: Option<&Reconciled>,
) -> Result<Reconciled, RenderError> {
	let matched = match prev {
		Some(Reconciled::Component(prev))
			if same_component(prev.component, node.component) && prev.key == node.key =>
		{
			Some(prev)
		}
		_ => None,
	};
	let prev_hooks = matched.map(|prev| prev.hooks.clone()).unwrap_or_default();

	let enclosing = ctx.begin_component(prev_hooks);
	let body = (node.component)(ctx, &node.props);
	let children = match body {
		Ok(children) => children,
		Err(error) => {
			ctx.abort_component(enclosing);
			return Err(error);
		}
	};
	let hooks = ctx.end_component(enclosing)?;

	// A component's output reconciles as a single child; multiple roots are
	// wrapped in a fragment.
	let child_element = single_child(children);
	let prev_child = matched.map(|prev| &*prev.child);
	let child = reconcile(ctx, &child_element, prev_child)?;

	Ok(Reconciled::Component(ReconciledComponent {
		component: node.component,
		key: node.key.clone(),
		props: node.props.clone(),
		hooks,
		child: Box::new(child),
	}))
}

fn single_child(mut children: Vec<Element>) -> Element {
	if children.len() == 1 {
		children.remove(0)
	} else {
		Element::Fragment(FragmentNode {
			key: None,
			children,
		})
	}
}

/// The variant identity children pair under.
///
/// Providers pair as the node their child reconciles to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PairKind {
	Element(String),
	Component(usize),
	Fragment,
	Text,
}

fn element_kind(element: &Element) -> PairKind {
	match element {
		Element::Node(node) => PairKind::Element(node.tag.to_string()),
		Element::Component(node) => PairKind::Component(node.component as usize),
		Element::Fragment(_) => PairKind::Fragment,
		Element::Provider(node) => element_kind(&node.child),
		Element::Text(_) => PairKind::Text,
	}
}

fn reconciled_kind(node: &Reconciled) -> PairKind {
	match node {
		Reconciled::Element(node) => PairKind::Element(node.tag.to_string()),
		Reconciled::Component(node) => PairKind::Component(node.component as usize),
		Reconciled::Fragment(_) => PairKind::Fragment,
		Reconciled::Text(_) => PairKind::Text,
	}
}

/// Pairs new children with previous children: keyed children match by
/// `(variant, key)`, unkeyed children match positionally among the unkeyed
/// previous children of the same variant. Unmatched previous children are
/// discarded.
fn pair_children<'p>(
	children: &[Element],
	prev: &'p [Reconciled],
) -> Vec<Option<&'p Reconciled>> {
	let mut keyed: HashMap<(PairKind, String), usize> = HashMap::new();
	let mut unkeyed: HashMap<PairKind, VecDeque<usize>> = HashMap::new();
	for (index, node) in prev.iter().enumerate() {
		let kind = reconciled_kind(node);
		match node.key() {
			Some(key) => {
				keyed.entry((kind, key.to_string())).or_insert(index);
			}
			None => unkeyed.entry(kind).or_default().push_back(index),
		}
	}

	children
		.iter()
		.map(|child| {
			let kind = element_kind(child);
			let index = match child.key() {
				Some(key) => keyed.remove(&(kind, key.to_string())),
				None => unkeyed.get_mut(&kind).and_then(VecDeque::pop_front),
			};
			index.map(|index| &prev[index])
		})
		.collect()
}

fn reconcile_children(
	ctx: &mut Context,
	children: &[Element],
	prev: &[Reconciled],
) -> Result<Vec<Reconciled>, RenderError> {
	let paired = pair_children(children, prev);
	children
		.iter()
		.zip(paired)
		.map(|(child, prev)| reconcile(ctx, child, prev))
		.collect()
}

/// Runs cleanups for every hook that was present in `prev` but is absent
/// from `next`. Runs before the new tree's effects so replaced resources
/// never overlap.
pub(crate) fn run_disposed_cleanups(prev: &Reconciled, next: &Reconciled) {
	let next_ids = next.hook_ids();
	for (id, hook) in prev.hooks_by_id() {
		if !next_ids.contains(&id) {
			dispose_hook(&hook);
		}
	}
}

/// The post-reconciliation effect pass: walks the new tree and applies each
/// effect hook's trigger rule, storing the new result on the hook.
pub(crate) fn run_effects(tree: &mut Reconciled) -> Result<(), RenderError> {
	match tree {
		Reconciled::Element(node) => {
			for child in &mut node.children {
				run_effects(child)?;
			}
		}
		Reconciled::Fragment(node) => {
			for child in &mut node.children {
				run_effects(child)?;
			}
		}
		Reconciled::Component(node) => {
			for hook in node.hooks.values_mut() {
				if let Hook::Effect(effect) = hook {
					run_effect(effect)?;
				}
			}
			run_effects(&mut node.child)?;
		}
		Reconciled::Text(_) => {}
	}
	Ok(())
}
