//! Renderer adapters and the wire attribute vocabulary.
//!
//! A renderer consumes a reconciled tree and produces a transport-ready
//! value. The JSON renderer defines the wire shape shared with the browser
//! client; the identity renderer exists for tests and in-process consumers.

use serde_json::{Map, Value};

use crate::tree::{Reconciled, ReconciledAttribute};

/// Prefix of event attributes in the wire output: a handler for kind `k`
/// renders as `"<prefix>-<k>": "<handler id>"`.
pub const EVENT_ATTR_PREFIX: &str = "pn-event";

/// Attribute carrying a client hook's name.
pub const CLIENT_HOOK_ATTR_PREFIX: &str = "pn-hook";

/// Attribute carrying a client hook's id.
pub const CLIENT_HOOK_ID_ATTR: &str = "pn-hook-id";

/// Attribute carrying a node's reconciliation key.
pub const KEY_ATTR: &str = "pn-key";

/// Serialises a reconciled tree for a transport.
pub trait Renderer {
	/// The rendered output type.
	type Output;

	/// Renders the tree.
	fn render(&self, tree: &Reconciled) -> Self::Output;
}

/// Returns the reconciled tree unchanged. Test use.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRenderer;

impl Renderer for IdentityRenderer {
	type Output = Reconciled;

	fn render(&self, tree: &Reconciled) -> Reconciled {
		tree.clone()
	}
}

/// Renders the tree to the JSON shape the browser client consumes.
///
/// Elements become `{"type": tag, "attrs": {...}, "0": child0, ...}`,
/// components `{"type": "component", "0": child}`, fragments
/// `{"type": "fragment", "0": ...}`, and text nodes plain JSON strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
	type Output = Value;

	fn render(&self, tree: &Reconciled) -> Value {
		render_node(tree)
	}
}

pub(crate) fn render_node(tree: &Reconciled) -> Value {
	match tree {
		Reconciled::Text(text) => Value::String(text.text.clone()),
		Reconciled::Element(node) => {
			let mut out = Map::new();
			out.insert("type".to_string(), Value::String(node.tag.to_string()));
			let mut attrs = Map::new();
			if let Some(key) = &node.key {
				attrs.insert(KEY_ATTR.to_string(), Value::String(key.clone()));
			}
			for attribute in &node.attributes {
				for (name, value) in attribute_fields(attribute) {
					attrs.insert(name, Value::String(value));
				}
			}
			out.insert("attrs".to_string(), Value::Object(attrs));
			insert_children(&mut out, &node.children);
			Value::Object(out)
		}
		Reconciled::Component(node) => {
			let mut out = Map::new();
			out.insert("type".to_string(), Value::String("component".to_string()));
			out.insert("0".to_string(), render_node(&node.child));
			Value::Object(out)
		}
		Reconciled::Fragment(node) => {
			let mut out = Map::new();
			out.insert("type".to_string(), Value::String("fragment".to_string()));
			insert_children(&mut out, &node.children);
			Value::Object(out)
		}
	}
}

fn insert_children(out: &mut Map<String, Value>, children: &[Reconciled]) {
	for (index, child) in children.iter().enumerate() {
		out.insert(index.to_string(), render_node(child));
	}
}

/// The wire fields an attribute renders to.
pub(crate) fn attribute_fields(attribute: &ReconciledAttribute) -> Vec<(String, String)> {
	match attribute {
		ReconciledAttribute::Static { name, value } => {
			vec![(name.to_string(), value.clone())]
		}
		ReconciledAttribute::EventHandler { kind, id } => {
			vec![(
				format!("{}-{}", EVENT_ATTR_PREFIX, kind.as_str()),
				id.to_string(),
			)]
		}
		ReconciledAttribute::ClientHook { name, id } => vec![
			(CLIENT_HOOK_ATTR_PREFIX.to_string(), name.clone()),
			(CLIENT_HOOK_ID_ATTR.to_string(), id.to_string()),
		],
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cuid::CuidSource;
	use crate::element::EventType;
	use crate::tree::{ReconciledElement, ReconciledFragment, ReconciledText};
	use serde_json::json;

	fn anchor(id: crate::cuid::Cuid) -> Reconciled {
		Reconciled::Element(ReconciledElement {
			tag: "a".into(),
			key: None,
			attributes: vec![
				ReconciledAttribute::Static {
					name: "href".into(),
					value: "#".to_string(),
				},
				ReconciledAttribute::EventHandler {
					kind: EventType::Click,
					id,
				},
			],
			children: vec![Reconciled::Text(ReconciledText {
				text: "Home".to_string(),
			})],
		})
	}

	#[test]
	fn test_element_json_shape() {
		let id = CuidSource::seeded(1).next();
		let rendered = JsonRenderer.render(&anchor(id.clone()));
		assert_eq!(rendered["type"], json!("a"));
		assert_eq!(rendered["attrs"]["href"], json!("#"));
		assert_eq!(rendered["attrs"]["pn-event-click"], json!(id.as_str()));
		assert_eq!(rendered["0"], json!("Home"));
	}

	#[test]
	fn test_key_renders_as_key_attribute() {
		let tree = Reconciled::Element(ReconciledElement {
			tag: "li".into(),
			key: Some("row-1".to_string()),
			attributes: vec![],
			children: vec![],
		});
		let rendered = JsonRenderer.render(&tree);
		assert_eq!(rendered["attrs"][KEY_ATTR], json!("row-1"));
	}

	#[test]
	fn test_fragment_and_text_shapes() {
		let tree = Reconciled::Fragment(ReconciledFragment {
			key: None,
			children: vec![
				Reconciled::Text(ReconciledText {
					text: "a".to_string(),
				}),
				Reconciled::Text(ReconciledText {
					text: "b".to_string(),
				}),
			],
		});
		assert_eq!(
			JsonRenderer.render(&tree),
			json!({"type": "fragment", "0": "a", "1": "b"})
		);
	}

	#[test]
	fn test_client_hook_renders_two_fields() {
		let id = CuidSource::seeded(2).next();
		let tree = Reconciled::Element(ReconciledElement {
			tag: "div".into(),
			key: None,
			attributes: vec![ReconciledAttribute::ClientHook {
				name: "Chart".to_string(),
				id: id.clone(),
			}],
			children: vec![],
		});
		let rendered = JsonRenderer.render(&tree);
		assert_eq!(rendered["attrs"][CLIENT_HOOK_ATTR_PREFIX], json!("Chart"));
		assert_eq!(rendered["attrs"][CLIENT_HOOK_ID_ATTR], json!(id.as_str()));
	}

	#[test]
	fn test_identity_renderer_preserves_structure() {
		let id = CuidSource::seeded(3).next();
		let tree = anchor(id);
		assert!(IdentityRenderer.render(&tree).structurally_equal(&tree));
	}
}
