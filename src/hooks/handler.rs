//! The event-handler hook.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::Hook;

/// An event handler function. Receives the decoded event payload, if the
/// client sent one.
pub type HandlerFn = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// A handler paired with the stable id the client posts events against.
#[derive(Clone)]
pub struct IdentifiableHandler {
	/// Stable handler id, rendered into the event attribute.
	pub id: Cuid,
	/// The function invoked when an event for `id` arrives.
	pub handler: HandlerFn,
}

impl fmt::Debug for IdentifiableHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IdentifiableHandler")
			.field("id", &self.id)
			.field("handler", &"<function>")
			.finish()
	}
}

/// Retained slot for [`use_handler`].
#[derive(Clone)]
pub struct HandlerHook {
	/// Stable hook id, shared with the rendered event attribute.
	pub id: Cuid,
	/// The handler function, replaced each render.
	pub func: HandlerFn,
}

impl fmt::Debug for HandlerHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerHook")
			.field("id", &self.id)
			.field("func", &"<function>")
			.finish()
	}
}

/// An identified event handler.
///
/// The id stays stable across renders while the function is replaced every
/// render, so closures capture fresh state without invalidating the wire
/// attribute. Attach the result to an element with
/// [`on`](crate::element::on); the reconciler records every attached handler
/// for event dispatch.
pub fn use_handler(
	ctx: &mut Context,
	func: impl Fn(Option<Value>) + Send + Sync + 'static,
) -> Result<IdentifiableHandler, RenderError> {
	let func: HandlerFn = Arc::new(func);
	let (hook, index, _initialized) = ctx.fetch_or_init_hook("handler", |cuid| {
		Hook::Handler(HandlerHook {
			id: cuid.next(),
			func: func.clone(),
		})
	})?;
	let mut handler = match hook {
		Hook::Handler(handler) => handler,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected handler hook, found {}",
				other.tag()
			)));
		}
	};
	handler.func = func;
	ctx.update_hook(index, Hook::Handler(handler.clone()));
	Ok(IdentifiableHandler {
		id: handler.id,
		handler: handler.func,
	})
}
