//! The patch algebra: structural diffs between two reconciled trees.
//!
//! [`create`] produces a patch that, applied to the first tree, yields the
//! second ([`apply`] implements the client-side reapplication for tests and
//! in-process consumers). Patches serialise to JSON for the wire via
//! [`Patch::to_json`] or `serde::Serialize`.
//!
//! Child patches index into the new tree's child list; `Remove` entries
//! occupy the trailing old indices beyond it. Keyed children that change
//! position emit a `Move` alongside their content patch; unkeyed children
//! diff strictly positionally.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::element::same_component;
use crate::error::PatchError;
use crate::render::{attribute_fields, render_node};
use crate::tree::{Reconciled, ReconciledAttribute};

/// A structural diff node.
#[derive(Debug, Clone)]
pub enum Patch {
	/// The subtree is unchanged.
	NoOp,
	/// The node persists; its attributes and/or children changed.
	Update {
		/// Attribute delta, if any attribute changed.
		attributes: Option<Vec<AttributePatch>>,
		/// Per-index child patches, if any child changed.
		children: Option<Vec<ChildPatch>>,
	},
	/// The subtree is replaced wholesale.
	Replace(Box<Reconciled>),
	/// A new child appears at this index.
	Insert(Box<Reconciled>),
	/// The old child at this index is dropped.
	Remove,
	/// A keyed child moved between indices.
	Move {
		/// Old index.
		from: usize,
		/// New index.
		to: usize,
	},
}

/// An attribute delta entry, matched by wire name.
#[derive(Debug, Clone)]
pub enum AttributePatch {
	/// Adds or replaces an attribute.
	Set(ReconciledAttribute),
	/// Removes the attribute with this wire name.
	Remove {
		/// The wire name to remove.
		name: String,
	},
}

/// A patch addressed to one child index.
#[derive(Debug, Clone)]
pub struct ChildPatch {
	/// The child index (new-tree space; old-tree space for `Remove`).
	pub index: usize,
	/// The patch at that index.
	pub patch: Patch,
}

impl Patch {
	/// Whether this patch changes nothing.
	pub fn is_noop(&self) -> bool {
		matches!(self, Patch::NoOp)
	}

	/// Serialises the patch to its JSON wire form.
	pub fn to_json(&self) -> Value {
		match self {
			Patch::NoOp => json!({"op": "noop"}),
			Patch::Update {
				attributes,
				children,
			} => {
				let mut out = Map::new();
				out.insert("op".to_string(), json!("update"));
				if let Some(attributes) = attributes {
					let entries: Vec<Value> = attributes
						.iter()
						.map(|attribute| match attribute {
							AttributePatch::Set(attribute) => {
								let mut fields = Map::new();
								for (name, value) in attribute_fields(attribute) {
									fields.insert(name, Value::String(value));
								}
								json!({"op": "set", "fields": fields})
							}
							AttributePatch::Remove { name } => {
								json!({"op": "remove", "name": name})
							}
						})
						.collect();
					out.insert("attrs".to_string(), Value::Array(entries));
				}
				if let Some(children) = children {
					let entries: Vec<Value> = children
						.iter()
						.map(|child| json!([child.index, child.patch.to_json()]))
						.collect();
					out.insert("children".to_string(), Value::Array(entries));
				}
				Value::Object(out)
			}
			Patch::Replace(node) => json!({"op": "replace", "node": render_node(node)}),
			Patch::Insert(node) => json!({"op": "insert", "node": render_node(node)}),
			Patch::Remove => json!({"op": "remove"}),
			Patch::Move { from, to } => json!({"op": "move", "from": from, "to": to}),
		}
	}
}

impl Serialize for Patch {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

/// Computes the patch turning `prev` into `next`.
pub fn create(prev: &Reconciled, next: &Reconciled) -> Patch {
	match (prev, next) {
		(Reconciled::Text(prev), Reconciled::Text(next)) => {
			if prev.text == next.text {
				Patch::NoOp
			} else {
				Patch::Replace(Box::new(Reconciled::Text(next.clone())))
			}
		}
		(Reconciled::Element(prev_el), Reconciled::Element(next_el))
			if prev_el.tag == next_el.tag && prev_el.key == next_el.key =>
		{
			let attributes = diff_attributes(&prev_el.attributes, &next_el.attributes);
			let children = diff_children(&prev_el.children, &next_el.children);
			if attributes.is_none() && children.is_none() {
				Patch::NoOp
			} else {
				Patch::Update {
					attributes,
					children,
				}
			}
		}
		(Reconciled::Fragment(prev_fr), Reconciled::Fragment(next_fr))
			if prev_fr.key == next_fr.key =>
		{
			match diff_children(&prev_fr.children, &next_fr.children) {
				None => Patch::NoOp,
				children => Patch::Update {
					attributes: None,
					children,
				},
			}
		}
		(Reconciled::Component(prev_c), Reconciled::Component(next_c))
			if same_component(prev_c.component, next_c.component) && prev_c.key == next_c.key =>
		{
			let inner = create(&prev_c.child, &next_c.child);
			if inner.is_noop() {
				Patch::NoOp
			} else {
				Patch::Update {
					attributes: None,
					children: Some(vec![ChildPatch {
						index: 0,
						patch: inner,
					}]),
				}
			}
		}
		_ => Patch::Replace(Box::new(next.clone())),
	}
}

fn diff_attributes(
	prev: &[ReconciledAttribute],
	next: &[ReconciledAttribute],
) -> Option<Vec<AttributePatch>> {
	let prev_by_name: HashMap<String, &ReconciledAttribute> = prev
		.iter()
		.map(|attribute| (attribute.wire_name(), attribute))
		.collect();
	let mut out = Vec::new();
	for attribute in next {
		match prev_by_name.get(&attribute.wire_name()) {
			Some(previous) if *previous == attribute => {}
			_ => out.push(AttributePatch::Set(attribute.clone())),
		}
	}
	let next_names: Vec<String> = next.iter().map(ReconciledAttribute::wire_name).collect();
	for name in prev_by_name.into_keys() {
		if !next_names.contains(&name) {
			out.push(AttributePatch::Remove { name });
		}
	}
	if out.is_empty() {
		None
	} else {
		Some(out)
	}
}

fn diff_children(prev: &[Reconciled], next: &[Reconciled]) -> Option<Vec<ChildPatch>> {
	// Keyed previous children, matchable from any position.
	let mut keyed: HashMap<(KindKey, String), usize> = HashMap::new();
	for (index, node) in prev.iter().enumerate() {
		if let Some(key) = node.key() {
			keyed.entry((kind_key(node), key.to_string())).or_insert(index);
		}
	}

	let mut ops = Vec::new();
	for (index, node) in next.iter().enumerate() {
		let source = match node.key() {
			Some(key) => keyed.remove(&(kind_key(node), key.to_string())),
			None => {
				if index < prev.len() {
					Some(index)
				} else {
					None
				}
			}
		};
		match source {
			Some(from) => {
				if from != index {
					ops.push(ChildPatch {
						index,
						patch: Patch::Move { from, to: index },
					});
				}
				let patch = create(&prev[from], node);
				if !patch.is_noop() {
					ops.push(ChildPatch { index, patch });
				}
			}
			None => {
				let patch = if index < prev.len() {
					Patch::Replace(Box::new(node.clone()))
				} else {
					Patch::Insert(Box::new(node.clone()))
				};
				ops.push(ChildPatch { index, patch });
			}
		}
	}
	for index in next.len()..prev.len() {
		ops.push(ChildPatch {
			index,
			patch: Patch::Remove,
		});
	}
	if ops.is_empty() {
		None
	} else {
		Some(ops)
	}
}

type KindKey = (u8, String);

/// The variant identity keyed children match under when diffing.
fn kind_key(node: &Reconciled) -> KindKey {
	match node {
		Reconciled::Element(el) => (0, el.tag.to_string()),
		Reconciled::Component(c) => (1, (c.component as usize).to_string()),
		Reconciled::Fragment(_) => (2, String::new()),
		Reconciled::Text(_) => (3, String::new()),
	}
}

/// Applies a patch produced by [`create`] to the tree it was created from.
pub fn apply(prev: &Reconciled, patch: &Patch) -> Result<Reconciled, PatchError> {
	match patch {
		Patch::NoOp => Ok(prev.clone()),
		Patch::Replace(node) | Patch::Insert(node) => Ok((**node).clone()),
		Patch::Remove => Err(PatchError::CannotApply("remove outside a child list")),
		Patch::Move { .. } => Err(PatchError::CannotApply("move outside a child list")),
		Patch::Update {
			attributes,
			children,
		} => match prev {
			Reconciled::Text(_) => Err(PatchError::CannotApply("update on a text node")),
			Reconciled::Element(el) => {
				let mut out = el.clone();
				if let Some(attributes) = attributes {
					out.attributes = apply_attributes(&el.attributes, attributes);
				}
				if let Some(children) = children {
					out.children = apply_children(&el.children, children)?;
				}
				Ok(Reconciled::Element(out))
			}
			Reconciled::Fragment(fr) => {
				let mut out = fr.clone();
				if let Some(children) = children {
					out.children = apply_children(&fr.children, children)?;
				}
				Ok(Reconciled::Fragment(out))
			}
			Reconciled::Component(c) => {
				let mut out = c.clone();
				if let Some(children) = children {
					let applied = apply_children(&[(*c.child).clone()], children)?;
					let child = applied
						.into_iter()
						.next()
						.ok_or(PatchError::MissingBase { index: 0 })?;
					out.child = Box::new(child);
				}
				Ok(Reconciled::Component(out))
			}
		},
	}
}

fn apply_attributes(
	prev: &[ReconciledAttribute],
	patches: &[AttributePatch],
) -> Vec<ReconciledAttribute> {
	let mut out = prev.to_vec();
	for patch in patches {
		match patch {
			AttributePatch::Set(attribute) => {
				let name = attribute.wire_name();
				match out.iter_mut().find(|existing| existing.wire_name() == name) {
					Some(existing) => *existing = attribute.clone(),
					None => out.push(attribute.clone()),
				}
			}
			AttributePatch::Remove { name } => {
				out.retain(|existing| &existing.wire_name() != name);
			}
		}
	}
	out
}

fn apply_children(
	prev: &[Reconciled],
	ops: &[ChildPatch],
) -> Result<Vec<Reconciled>, PatchError> {
	// `Remove` entries occupy the trailing old indices, so their count fixes
	// the new length; otherwise the list kept or grew, and every index beyond
	// the old length carries an op (an insert or a keyed move).
	let removes = ops
		.iter()
		.filter(|op| matches!(op.patch, Patch::Remove))
		.count();
	let new_len = if removes > 0 {
		prev.len().saturating_sub(removes)
	} else {
		ops.iter()
			.filter(|op| !matches!(op.patch, Patch::Remove))
			.map(|op| op.index + 1)
			.max()
			.unwrap_or(0)
			.max(prev.len())
	};

	let mut moves: HashMap<usize, usize> = HashMap::new();
	let mut by_index: HashMap<usize, &Patch> = HashMap::new();
	for op in ops {
		match &op.patch {
			Patch::Move { from, to } => {
				moves.insert(*to, *from);
			}
			Patch::Remove => {}
			patch => {
				by_index.insert(op.index, patch);
			}
		}
	}

	let mut out = Vec::with_capacity(new_len);
	for index in 0..new_len {
		let base = match moves.get(&index) {
			Some(&from) => prev.get(from),
			None => prev.get(index),
		};
		match by_index.get(&index) {
			None => out.push(base.ok_or(PatchError::MissingBase { index })?.clone()),
			Some(patch) => match patch {
				Patch::Insert(node) | Patch::Replace(node) => out.push((**node).clone()),
				patch => {
					let base = base.ok_or(PatchError::MissingBase { index })?;
					out.push(apply(base, patch)?);
				}
			},
		}
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cuid::CuidSource;
	use crate::tree::{ReconciledElement, ReconciledText};

	fn text(value: &str) -> Reconciled {
		Reconciled::Text(ReconciledText {
			text: value.to_string(),
		})
	}

	fn div(key: Option<&str>, children: Vec<Reconciled>) -> Reconciled {
		Reconciled::Element(ReconciledElement {
			tag: "div".into(),
			key: key.map(str::to_string),
			attributes: vec![],
			children,
		})
	}

	#[test]
	fn test_self_diff_is_noop() {
		let id = CuidSource::seeded(9).next();
		let tree = Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![ReconciledAttribute::EventHandler {
				kind: crate::element::EventType::Click,
				id,
			}],
			children: vec![text("One")],
		});
		assert!(create(&tree, &tree).is_noop());
	}

	#[test]
	fn test_attribute_value_change_produces_set() {
		let prev = Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![ReconciledAttribute::Static {
				name: "href".into(),
				value: "#one".to_string(),
			}],
			children: vec![],
		});
		let next = Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![ReconciledAttribute::Static {
				name: "href".into(),
				value: "#two".to_string(),
			}],
			children: vec![],
		});
		match create(&prev, &next) {
			Patch::Update {
				attributes: Some(attributes),
				children: None,
			} => {
				assert_eq!(attributes.len(), 1);
				assert!(matches!(&attributes[0], AttributePatch::Set(_)));
			}
			other => panic!("expected attribute update, got {other:?}"),
		}
	}

	#[test]
	fn test_removed_attribute_produces_remove() {
		let prev = Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![ReconciledAttribute::Static {
				name: "href".into(),
				value: "#".to_string(),
			}],
			children: vec![],
		});
		let next = Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![],
			children: vec![],
		});
		match create(&prev, &next) {
			Patch::Update {
				attributes: Some(attributes),
				..
			} => {
				assert!(matches!(
					&attributes[0],
					AttributePatch::Remove { name } if name == "href"
				));
			}
			other => panic!("expected attribute removal, got {other:?}"),
		}
	}

	#[test]
	fn test_keyed_reorder_produces_moves() {
		let prev = div(
			None,
			vec![
				div(Some("a"), vec![text("A")]),
				div(Some("b"), vec![text("B")]),
			],
		);
		let next = div(
			None,
			vec![
				div(Some("b"), vec![text("B")]),
				div(Some("a"), vec![text("A")]),
			],
		);
		let patch = create(&prev, &next);
		let moves = match &patch {
			Patch::Update {
				children: Some(ops),
				..
			} => ops
				.iter()
				.filter(|op| matches!(op.patch, Patch::Move { .. }))
				.count(),
			other => panic!("expected children update, got {other:?}"),
		};
		assert_eq!(moves, 2);
		let applied = apply(&prev, &patch).unwrap();
		assert!(applied.structurally_equal(&next));
	}

	#[test]
	fn test_child_count_changes_round_trip() {
		let prev = div(None, vec![text("a"), text("b"), text("c")]);
		let shorter = div(None, vec![text("a")]);
		let longer = div(None, vec![text("a"), text("b"), text("c"), text("d")]);

		let shrink = create(&prev, &shorter);
		assert!(apply(&prev, &shrink).unwrap().structurally_equal(&shorter));

		let grow = create(&prev, &longer);
		assert!(apply(&prev, &grow).unwrap().structurally_equal(&longer));
	}

	#[test]
	fn test_text_change_round_trips() {
		let prev = div(None, vec![text("One")]);
		let next = div(None, vec![text("Two")]);
		let patch = create(&prev, &next);
		match &patch {
			Patch::Update {
				children: Some(ops),
				attributes: None,
			} => {
				assert_eq!(ops.len(), 1);
				assert_eq!(ops[0].index, 0);
				assert!(matches!(ops[0].patch, Patch::Replace(_)));
			}
			other => panic!("expected child text replace, got {other:?}"),
		}
		assert!(apply(&prev, &patch).unwrap().structurally_equal(&next));
	}

	#[test]
	fn test_patch_json_ops() {
		assert_eq!(Patch::NoOp.to_json()["op"], "noop");
		assert_eq!(
			Patch::Move { from: 1, to: 0 }.to_json(),
			serde_json::json!({"op": "move", "from": 1, "to": 0})
		);
		let replace = Patch::Replace(Box::new(text("x")));
		assert_eq!(replace.to_json()["op"], "replace");
		assert_eq!(replace.to_json()["node"], serde_json::json!("x"));
	}
}
