//! The reconciled tree: realised nodes carrying hook state.
//!
//! Reconciled nodes live as long as their position persists across renders.
//! Unlike elements, they carry the retained hook slots of component
//! instances and the resolved handler/client-hook ids of attributes.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::cuid::Cuid;
use crate::element::{same_component, ComponentFn, EventType};
use crate::hooks::{ClientHook, Hook, StateHook};
use crate::props::Props;

/// A realised tree node.
#[derive(Debug, Clone)]
pub enum Reconciled {
	/// An HTML element.
	Element(ReconciledElement),
	/// A component instance with its retained hooks.
	Component(ReconciledComponent),
	/// A grouping of children.
	Fragment(ReconciledFragment),
	/// A text node.
	Text(ReconciledText),
}

/// A realised HTML element.
#[derive(Debug, Clone)]
pub struct ReconciledElement {
	/// Tag name.
	pub tag: Cow<'static, str>,
	/// Reconciliation key (promoted from a `Key` attribute if present).
	pub key: Option<String>,
	/// Realised attributes.
	pub attributes: Vec<ReconciledAttribute>,
	/// Realised children.
	pub children: Vec<Reconciled>,
}

/// A realised component instance.
#[derive(Clone)]
pub struct ReconciledComponent {
	/// The component function.
	pub component: ComponentFn,
	/// Reconciliation key.
	pub key: Option<String>,
	/// The props the instance last rendered with.
	pub props: Props,
	/// Retained hook slots, keyed by call-order index.
	pub hooks: BTreeMap<usize, Hook>,
	/// The instance's rendered subtree.
	pub child: Box<Reconciled>,
}

impl fmt::Debug for ReconciledComponent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReconciledComponent")
			.field("component", &(self.component as usize as *const ()))
			.field("key", &self.key)
			.field("hooks", &self.hooks.len())
			.field("child", &self.child)
			.finish()
	}
}

/// A realised fragment.
#[derive(Debug, Clone)]
pub struct ReconciledFragment {
	/// Reconciliation key.
	pub key: Option<String>,
	/// Realised children.
	pub children: Vec<Reconciled>,
}

/// A realised text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledText {
	/// The text content.
	pub text: String,
}

/// A realised attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciledAttribute {
	/// A plain name/value attribute.
	Static {
		/// Attribute name.
		name: Cow<'static, str>,
		/// Attribute value.
		value: String,
	},
	/// An event listener, resolved to its handler id.
	EventHandler {
		/// The event kind.
		kind: EventType,
		/// The handler id the client posts events against.
		id: Cuid,
	},
	/// A client-hook binding, resolved to its hook id.
	ClientHook {
		/// The browser-side hook name.
		name: String,
		/// The hook id.
		id: Cuid,
	},
}

impl ReconciledAttribute {
	/// The name this attribute is matched under when diffing.
	///
	/// Static attributes match by their own name, event handlers by their
	/// wire attribute name, client hooks by the shared client-hook
	/// attribute name.
	pub fn wire_name(&self) -> String {
		match self {
			ReconciledAttribute::Static { name, .. } => name.to_string(),
			ReconciledAttribute::EventHandler { kind, .. } => {
				format!("{}-{}", crate::render::EVENT_ATTR_PREFIX, kind.as_str())
			}
			ReconciledAttribute::ClientHook { .. } => {
				crate::render::CLIENT_HOOK_ATTR_PREFIX.to_string()
			}
		}
	}
}

impl Reconciled {
	/// The key this node reconciled under, if any.
	pub fn key(&self) -> Option<&str> {
		match self {
			Reconciled::Element(node) => node.key.as_deref(),
			Reconciled::Component(node) => node.key.as_deref(),
			Reconciled::Fragment(node) => node.key.as_deref(),
			Reconciled::Text(_) => None,
		}
	}

	/// Visits every hook in the tree, pre-order, in call-order within each
	/// component.
	pub(crate) fn for_each_hook(&self, f: &mut impl FnMut(&Hook)) {
		match self {
			Reconciled::Element(node) => {
				for child in &node.children {
					child.for_each_hook(f);
				}
			}
			Reconciled::Component(node) => {
				for hook in node.hooks.values() {
					f(hook);
				}
				node.child.for_each_hook(f);
			}
			Reconciled::Fragment(node) => {
				for child in &node.children {
					child.for_each_hook(f);
				}
			}
			Reconciled::Text(_) => {}
		}
	}

	/// All hooks in the tree, keyed by id.
	pub(crate) fn hooks_by_id(&self) -> HashMap<Cuid, Hook> {
		let mut hooks = HashMap::new();
		self.for_each_hook(&mut |hook| {
			hooks.insert(hook.id().clone(), hook.clone());
		});
		hooks
	}

	/// The ids of all hooks in the tree.
	pub(crate) fn hook_ids(&self) -> HashSet<Cuid> {
		let mut ids = HashSet::new();
		self.for_each_hook(&mut |hook| {
			ids.insert(hook.id().clone());
		});
		ids
	}

	/// Finds the client hook with the given id, if present.
	pub(crate) fn find_client_hook(&self, id: &Cuid) -> Option<ClientHook> {
		let mut found = None;
		self.for_each_hook(&mut |hook| {
			if found.is_none() {
				if let Hook::Client(client) = hook {
					if &client.id == id {
						found = Some(client.clone());
					}
				}
			}
		});
		found
	}

	/// Applies `apply` to the state hook with the given id.
	///
	/// A matching id on a non-state hook is a no-op.
	pub(crate) fn update_state_hook(
		&mut self,
		id: &Cuid,
		apply: Box<dyn FnOnce(&mut StateHook) + Send>,
	) -> bool {
		let mut apply = Some(apply);
		self.update_state_hook_inner(id, &mut apply)
	}

	fn update_state_hook_inner(
		&mut self,
		id: &Cuid,
		apply: &mut Option<Box<dyn FnOnce(&mut StateHook) + Send>>,
	) -> bool {
		if apply.is_none() {
			return true;
		}
		match self {
			Reconciled::Element(node) => node
				.children
				.iter_mut()
				.any(|child| child.update_state_hook_inner(id, apply)),
			Reconciled::Fragment(node) => node
				.children
				.iter_mut()
				.any(|child| child.update_state_hook_inner(id, apply)),
			Reconciled::Component(node) => {
				for hook in node.hooks.values_mut() {
					if hook.id() == id {
						match hook {
							Hook::State(state) => {
								if let Some(apply) = apply.take() {
									apply(state);
								}
								return true;
							}
							other => {
								tracing::warn!(
									hook = %id,
									variant = other.tag(),
									"state update targeted a non-state hook; ignoring"
								);
								return false;
							}
						}
					}
				}
				node.child.update_state_hook_inner(id, apply)
			}
			Reconciled::Text(_) => false,
		}
	}

	/// Structural equality over the rendered shape.
	///
	/// Compares tags, keys, text, attributes (order-insensitively, ids
	/// included), and component identity; hook state and props are not
	/// compared. This is the equality patches are round-tripped against.
	pub fn structurally_equal(&self, other: &Reconciled) -> bool {
		match (self, other) {
			(Reconciled::Text(a), Reconciled::Text(b)) => a == b,
			(Reconciled::Element(a), Reconciled::Element(b)) => {
				a.tag == b.tag
					&& a.key == b.key
					&& attributes_equal(&a.attributes, &b.attributes)
					&& children_equal(&a.children, &b.children)
			}
			(Reconciled::Fragment(a), Reconciled::Fragment(b)) => {
				a.key == b.key && children_equal(&a.children, &b.children)
			}
			(Reconciled::Component(a), Reconciled::Component(b)) => {
				same_component(a.component, b.component)
					&& a.key == b.key
					&& a.child.structurally_equal(&b.child)
			}
			_ => false,
		}
	}
}

fn children_equal(a: &[Reconciled], b: &[Reconciled]) -> bool {
	a.len() == b.len()
		&& a.iter()
			.zip(b.iter())
			.all(|(a, b)| a.structurally_equal(b))
}

fn attributes_equal(a: &[ReconciledAttribute], b: &[ReconciledAttribute]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	let mut a: Vec<_> = a.iter().collect();
	let mut b: Vec<_> = b.iter().collect();
	a.sort_by_key(|attribute| attribute.wire_name());
	b.sort_by_key(|attribute| attribute.wire_name());
	a.iter().zip(b.iter()).all(|(a, b)| a == b)
}

/// Runs the registered cleanup of a hook leaving the tree.
pub(crate) fn dispose_hook(hook: &Hook) {
	match hook {
		Hook::Effect(effect) => {
			if let Some(cleanup) = effect.result.as_ref().and_then(|result| result.cleanup.clone()) {
				cleanup();
			}
		}
		Hook::Reducer(reducer) => reducer.handle.shutdown(),
		_ => {}
	}
}

/// Runs cleanups for every hook in the tree. Used at runtime shutdown.
pub(crate) fn run_all_cleanups(tree: &Reconciled) {
	tree.for_each_hook(&mut dispose_hook);
}
