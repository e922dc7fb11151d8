//! The client hook: a binding to a browser-side hook implementation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::element::Attribute;
use crate::error::RenderError;
use crate::hooks::Hook;
use crate::runtime::{ClientDispatcher, RuntimeMessage};

/// Invoked when the browser-side hook posts an event to the server.
///
/// Receives the event name, the decoded payload, and a dispatcher that
/// replies to the originating client.
pub type ClientEventFn = Arc<dyn Fn(&str, Option<&Value>, &dyn ClientDispatcher) + Send + Sync>;

/// Retained slot for [`use_client`].
#[derive(Clone)]
pub struct ClientHook {
	/// Stable hook id, rendered into the client-hook attribute.
	pub id: Cuid,
	/// The browser-side hook name.
	pub name: String,
	/// Server-side listener for events the client posts, if any.
	pub on_event: Option<ClientEventFn>,
}

impl fmt::Debug for ClientHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientHook")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("on_event", &self.on_event.is_some())
			.finish()
	}
}

/// Handle returned by [`use_client`].
///
/// Yields the attribute that binds an element to the browser-side hook, and
/// dispatches server-initiated events to it.
#[derive(Clone)]
pub struct ClientHandle {
	id: Cuid,
	name: String,
	runtime: tokio::sync::mpsc::UnboundedSender<RuntimeMessage>,
}

impl ClientHandle {
	/// The attribute binding an element to this hook.
	pub fn attribute(&self) -> Attribute {
		Attribute::ClientHook {
			id: self.id.clone(),
			name: self.name.clone(),
		}
	}

	/// The hook's stable id.
	pub fn id(&self) -> &Cuid {
		&self.id
	}

	/// Enqueues a client-directed event on the runtime, which forwards it to
	/// the configured dispatcher.
	pub fn dispatch(&self, event: impl Into<String>, payload: Option<Value>) {
		let posted = self.runtime.send(RuntimeMessage::ClientDispatch {
			id: self.id.clone(),
			event: event.into(),
			payload,
		});
		if posted.is_err() {
			tracing::warn!(hook = %self.id, "client dispatch after runtime shut down");
		}
	}
}

impl fmt::Debug for ClientHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientHandle")
			.field("id", &self.id)
			.field("name", &self.name)
			.finish()
	}
}

/// Binds an element to a browser-side hook implementation.
///
/// The name and listener are refreshed every render; the id stays stable so
/// the client keeps its hook instance alive across patches.
pub fn use_client(
	ctx: &mut Context,
	name: impl Into<String>,
	on_event: Option<ClientEventFn>,
) -> Result<ClientHandle, RenderError> {
	let name = name.into();
	let (hook, index, _initialized) = ctx.fetch_or_init_hook("client", |cuid| {
		Hook::Client(ClientHook {
			id: cuid.next(),
			name: name.clone(),
			on_event: on_event.clone(),
		})
	})?;
	let mut client = match hook {
		Hook::Client(client) => client,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected client hook, found {}",
				other.tag()
			)));
		}
	};
	client.name = name;
	client.on_event = on_event;
	ctx.update_hook(index, Hook::Client(client.clone()));
	Ok(ClientHandle {
		id: client.id,
		name: client.name,
		runtime: ctx.runtime_sender().clone(),
	})
}
