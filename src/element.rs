//! The element algebra: immutable virtual-tree nodes built by components.
//!
//! Elements describe intended UI. They are created by component functions,
//! live only for the duration of one reconciliation pass, and are diffed
//! against the previous reconciled tree to produce the next one.
//!
//! ## Example
//!
//! ```ignore
//! let view = el(
//! 	"a",
//! 	vec![
//! 		attr("class", classes(&[Some("base"), active.then_some("bold")])),
//! 		attr("href", "#"),
//! 		on(EventType::Click, handler),
//! 	],
//! 	vec![text("Home")],
//! );
//! ```

pub mod event;

pub use event::EventType;

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::IdentifiableHandler;
use crate::props::Props;

/// A functional component: renders props into child elements.
///
/// Component identity is the function pointer itself; the reconciler reuses
/// hook state only when the same function renders at the same position.
pub type ComponentFn = fn(&mut Context, &Props) -> Result<Vec<Element>, RenderError>;

pub(crate) fn same_component(a: ComponentFn, b: ComponentFn) -> bool {
	a as usize == b as usize
}

/// An immutable virtual-tree node.
#[derive(Debug, Clone)]
pub enum Element {
	/// An HTML element with a tag, attributes, and children.
	Node(ElementNode),
	/// A functional component invocation.
	Component(ComponentNode),
	/// A keyed grouping of children with no wrapper element.
	Fragment(FragmentNode),
	/// A context binding visible to the subtree below it.
	Provider(ProviderNode),
	/// A text node.
	Text(Cow<'static, str>),
}

/// An HTML element.
#[derive(Debug, Clone)]
pub struct ElementNode {
	/// The tag name (e.g. "div", "a").
	pub tag: Cow<'static, str>,
	/// Reconciliation key, if set directly.
	pub key: Option<String>,
	/// Attributes, including event handlers and client hooks.
	pub attributes: Vec<Attribute>,
	/// Child elements.
	pub children: Vec<Element>,
}

/// A component invocation node.
#[derive(Clone)]
pub struct ComponentNode {
	/// The component function.
	pub component: ComponentFn,
	/// Reconciliation key.
	pub key: Option<String>,
	/// Opaque props passed to the component.
	pub props: Props,
}

impl fmt::Debug for ComponentNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentNode")
			.field("component", &(self.component as usize as *const ()))
			.field("key", &self.key)
			.finish()
	}
}

/// A grouping of children with no wrapper element.
#[derive(Debug, Clone)]
pub struct FragmentNode {
	/// Reconciliation key.
	pub key: Option<String>,
	/// Child elements.
	pub children: Vec<Element>,
}

/// A scoped context value visible to consumers in the child subtree.
#[derive(Clone)]
pub struct ProviderNode {
	/// The context key consumers look up.
	pub key: Cow<'static, str>,
	/// The provided value.
	pub value: Arc<dyn Any + Send + Sync>,
	/// The subtree the binding is visible to.
	pub child: Box<Element>,
}

impl fmt::Debug for ProviderNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderNode")
			.field("key", &self.key)
			.field("value", &"<opaque>")
			.field("child", &self.child)
			.finish()
	}
}

/// An element attribute.
#[derive(Clone)]
pub enum Attribute {
	/// A plain name/value attribute.
	Static {
		/// Attribute name.
		name: Cow<'static, str>,
		/// Attribute value.
		value: String,
	},
	/// An event listener backed by a handler hook.
	EventHandler {
		/// The event kind to listen for.
		kind: EventType,
		/// The identified handler to invoke.
		handler: IdentifiableHandler,
	},
	/// A client-side hook binding.
	ClientHook {
		/// The client hook's id.
		id: Cuid,
		/// The client-side hook name.
		name: String,
	},
	/// A reconciliation key, promoted onto the enclosing node.
	Key {
		/// The key value.
		value: String,
	},
}

impl fmt::Debug for Attribute {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Attribute::Static { name, value } => f
				.debug_struct("Static")
				.field("name", name)
				.field("value", value)
				.finish(),
			Attribute::EventHandler { kind, handler } => f
				.debug_struct("EventHandler")
				.field("kind", kind)
				.field("id", &handler.id)
				.finish(),
			Attribute::ClientHook { id, name } => f
				.debug_struct("ClientHook")
				.field("id", id)
				.field("name", name)
				.finish(),
			Attribute::Key { value } => f.debug_struct("Key").field("value", value).finish(),
		}
	}
}

impl Element {
	/// The key this node reconciles under, if any.
	///
	/// For HTML elements a `Key` attribute takes effect when the node-level
	/// key is unset; it is promoted onto the node during reconciliation.
	pub fn key(&self) -> Option<&str> {
		match self {
			Element::Node(node) => node.key.as_deref().or_else(|| {
				node.attributes.iter().find_map(|attribute| match attribute {
					Attribute::Key { value } => Some(value.as_str()),
					_ => None,
				})
			}),
			Element::Component(node) => node.key.as_deref(),
			Element::Fragment(node) => node.key.as_deref(),
			Element::Provider(node) => node.child.key(),
			Element::Text(_) => None,
		}
	}
}

/// Builds an HTML element.
pub fn el(
	tag: impl Into<Cow<'static, str>>,
	attributes: Vec<Attribute>,
	children: Vec<Element>,
) -> Element {
	Element::Node(ElementNode {
		tag: tag.into(),
		key: None,
		attributes,
		children,
	})
}

/// Builds a text node.
pub fn text(value: impl Into<Cow<'static, str>>) -> Element {
	Element::Text(value.into())
}

/// Builds an unkeyed fragment.
pub fn fragment(children: Vec<Element>) -> Element {
	Element::Fragment(FragmentNode {
		key: None,
		children,
	})
}

/// Builds a keyed fragment.
pub fn keyed_fragment(key: impl Into<String>, children: Vec<Element>) -> Element {
	Element::Fragment(FragmentNode {
		key: Some(key.into()),
		children,
	})
}

/// Builds a component node.
pub fn component(component: ComponentFn, props: Props) -> Element {
	Element::Component(ComponentNode {
		component,
		key: None,
		props,
	})
}

/// Builds a keyed component node.
pub fn component_keyed(key: impl Into<String>, component: ComponentFn, props: Props) -> Element {
	Element::Component(ComponentNode {
		component,
		key: Some(key.into()),
		props,
	})
}

/// Builds a provider node scoping `value` under `key` for `child`.
pub fn provider<T: Any + Send + Sync>(
	key: impl Into<Cow<'static, str>>,
	value: T,
	child: Element,
) -> Element {
	Element::Provider(ProviderNode {
		key: key.into(),
		value: Arc::new(value),
		child: Box::new(child),
	})
}

/// Builds a plain attribute.
pub fn attr(name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Attribute {
	Attribute::Static {
		name: name.into(),
		value: value.into(),
	}
}

/// Builds an event-handler attribute.
pub fn on(kind: EventType, handler: IdentifiableHandler) -> Attribute {
	Attribute::EventHandler { kind, handler }
}

/// Builds a key attribute.
pub fn key(value: impl Into<String>) -> Attribute {
	Attribute::Key {
		value: value.into(),
	}
}

/// Composes a space-joined class string, dropping absent entries.
///
/// ## Example
///
/// ```ignore
/// assert_eq!(classes(&[Some("base"), None, Some("bold")]), "base bold");
/// ```
pub fn classes(parts: &[Option<&str>]) -> String {
	parts
		.iter()
		.filter_map(|part| *part)
		.collect::<Vec<_>>()
		.join(" ")
}
