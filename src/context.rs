//! The per-render cursor threading hook slots, handlers, and providers.
//!
//! A [`Context`] lives inside the runtime actor. Each reconciliation pass
//! resets it, then threads it through the element tree: component renders
//! open a hook cursor over the hooks retained from the previous render,
//! provider nodes scope values over their subtree, and every event handler
//! reaching the reconciled tree is recorded for dispatch lookup.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::cuid::CuidSource;
use crate::element::Element;
use crate::error::RenderError;
use crate::hooks::{Hook, IdentifiableHandler};
use crate::runtime::RuntimeMessage;

/// The hook cursor of the component currently rendering.
///
/// Hooks are matched by call-order index: `prev` holds the slots retained
/// from the previous render, `next` accumulates the slots of this render.
pub(crate) struct HookCursor {
	prev: BTreeMap<usize, Hook>,
	next: BTreeMap<usize, Hook>,
	index: usize,
}

/// Per-render mutable state owned by the runtime actor.
pub struct Context {
	view: Element,
	cuid: CuidSource,
	call_timeout: Duration,
	providers: HashMap<String, Arc<dyn Any + Send + Sync>>,
	handlers: Vec<IdentifiableHandler>,
	runtime: UnboundedSender<RuntimeMessage>,
	cursor: Option<HookCursor>,
}

impl Context {
	pub(crate) fn new(
		view: Element,
		cuid: CuidSource,
		runtime: UnboundedSender<RuntimeMessage>,
		call_timeout: Duration,
	) -> Self {
		Self {
			view,
			cuid,
			call_timeout,
			providers: HashMap::new(),
			handlers: Vec::new(),
			runtime,
			cursor: None,
		}
	}

	/// The root element this runtime renders.
	pub(crate) fn view(&self) -> &Element {
		&self.view
	}

	/// Clears per-pass state before a reconciliation starts.
	pub(crate) fn prepare_for_reconciliation(&mut self) {
		self.handlers.clear();
		self.providers.clear();
		self.cursor = None;
	}

	/// Schedules a re-render on the runtime.
	///
	/// Safe to call from handlers and effects: the message queues behind the
	/// currently-processing render and runs after it completes.
	pub fn render_update(&self) {
		if self.runtime.send(RuntimeMessage::RenderUpdate).is_err() {
			tracing::warn!("render update requested after runtime shut down");
		}
	}

	/// The reply timeout for bounded calls made during a render.
	pub(crate) fn call_timeout(&self) -> Duration {
		self.call_timeout
	}

	pub(crate) fn runtime_sender(&self) -> &UnboundedSender<RuntimeMessage> {
		&self.runtime
	}

	/// Records a handler rendered into the current tree.
	///
	/// A handler attached to several elements is recorded once.
	pub(crate) fn record_handler(&mut self, handler: IdentifiableHandler) {
		if !self.handlers.iter().any(|known| known.id == handler.id) {
			self.handlers.push(handler);
		}
	}

	/// Looks up a rendered handler by id.
	pub(crate) fn handler(&self, id: &crate::cuid::Cuid) -> Option<&IdentifiableHandler> {
		self.handlers.iter().find(|handler| &handler.id == id)
	}

	/// Runs `f` with `value` bound under `key` in the provider scope.
	///
	/// The provider map is copied on push so an early exit inside `f` cannot
	/// leave a stale binding behind.
	pub(crate) fn with_provider<R>(
		&mut self,
		key: &str,
		value: Arc<dyn Any + Send + Sync>,
		f: impl FnOnce(&mut Self) -> R,
	) -> R {
		let saved = self.providers.clone();
		self.providers.insert(key.to_string(), value);
		let out = f(self);
		self.providers = saved;
		out
	}

	/// The nearest provider value for `key`, if any.
	pub(crate) fn provider_value(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
		self.providers.get(key).cloned()
	}

	/// Opens a hook cursor for a component render, returning the cursor of
	/// the enclosing component (restored by [`Context::end_component`]).
	pub(crate) fn begin_component(
		&mut self,
		prev_hooks: BTreeMap<usize, Hook>,
	) -> Option<HookCursor> {
		self.cursor.replace(HookCursor {
			prev: prev_hooks,
			next: BTreeMap::new(),
			index: 0,
		})
	}

	/// Closes the current component's cursor and returns its hooks.
	///
	/// Detects count drift: a component must call at least as many hooks as
	/// the previous render recorded.
	pub(crate) fn end_component(
		&mut self,
		enclosing: Option<HookCursor>,
	) -> Result<BTreeMap<usize, Hook>, RenderError> {
		let finished = self.cursor.take();
		self.cursor = enclosing;
		let finished = finished.ok_or(RenderError::HookOutsideComponent)?;
		if finished.index < finished.prev.len() {
			return Err(RenderError::HookCountDrift {
				previous: finished.prev.len(),
				current: finished.index,
			});
		}
		Ok(finished.next)
	}

	/// Restores the enclosing cursor after a failed component render.
	pub(crate) fn abort_component(&mut self, enclosing: Option<HookCursor>) {
		self.cursor = enclosing;
	}

	/// Returns the hook at the current cursor index, initialising it with
	/// `init` if the slot is empty, and advances the cursor.
	///
	/// The returned flag is true when the slot was initialised this call.
	/// A variant mismatch against the retained slot is hook-order drift.
	pub(crate) fn fetch_or_init_hook(
		&mut self,
		tag: &'static str,
		init: impl FnOnce(&CuidSource) -> Hook,
	) -> Result<(Hook, usize, bool), RenderError> {
		let cuid = self.cuid.clone();
		let cursor = self
			.cursor
			.as_mut()
			.ok_or(RenderError::HookOutsideComponent)?;
		let index = cursor.index;
		cursor.index += 1;
		let (hook, initialized) = match cursor.prev.get(&index) {
			Some(previous) if previous.tag() == tag => (previous.clone(), false),
			Some(previous) => {
				return Err(RenderError::HookDrift {
					index,
					previous: previous.tag(),
					current: tag,
				});
			}
			// Past the end of a non-empty retained list: the component grew
			// a hook it did not have last render.
			None if !cursor.prev.is_empty() => {
				return Err(RenderError::HookCountDrift {
					previous: cursor.prev.len(),
					current: index + 1,
				});
			}
			None => (init(&cuid), true),
		};
		cursor.next.insert(index, hook.clone());
		Ok((hook, index, initialized))
	}

	/// Replaces the hook at a known index with the slot written this render.
	///
	/// Used by hooks that refresh closures each render without allocating
	/// new ids.
	pub(crate) fn update_hook(&mut self, index: usize, hook: Hook) {
		if let Some(cursor) = self.cursor.as_mut() {
			cursor.next.insert(index, hook);
		}
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("handlers", &self.handlers.len())
			.field("providers", &self.providers.len())
			.finish()
	}
}
