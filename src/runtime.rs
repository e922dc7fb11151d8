//! The runtime actor: serialised owner of a component tree.
//!
//! Each runtime is a single task draining a FIFO mailbox. Every tree
//! mutation, handler lookup, hook update, and patch emission happens inside
//! the actor; no other task ever observes the reconciled tree mid-render.
//! Hook setters and effects enqueue further messages on the same mailbox, so
//! a render triggered from inside a render runs after the current one
//! completes.
//!
//! ## Example
//!
//! ```ignore
//! let (tx, mut updates) = tokio::sync::mpsc::unbounded_channel();
//! let handle = start(component(app, Props::empty()), Arc::new(ChannelUpdater::new(tx)));
//! let first = updates.recv().await; // FullUpdate with the initial tree
//! handle.process_event(handler_id, None);
//! let second = updates.recv().await; // PatchUpdate with the diff
//! handle.stop();
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::context::Context;
use crate::cuid::{Cuid, CuidSource};
use crate::element::Element;
use crate::error::{EventError, RenderError, RuntimeError, UpdaterError};
use crate::hooks::StateHook;
use crate::patch::{self, Patch};
use crate::reconcile::{reconcile, run_disposed_cleanups, run_effects};
use crate::render::render_node;
use crate::tree::{run_all_cleanups, Reconciled};

/// Default reply timeout for bounded calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(1000);

/// A rendered update pushed to the transport.
#[derive(Debug, Clone)]
pub enum RenderedUpdate {
	/// The full reconciled tree; sent for the first render.
	Full(Reconciled),
	/// The diff against the previously sent tree.
	Patch(Patch),
}

impl RenderedUpdate {
	/// Serialises the update for the wire, using the JSON renderer's shape.
	pub fn to_json(&self) -> Value {
		match self {
			RenderedUpdate::Full(tree) => {
				serde_json::json!({"type": "full", "tree": render_node(tree)})
			}
			RenderedUpdate::Patch(patch) => {
				serde_json::json!({"type": "patch", "patch": patch.to_json()})
			}
		}
	}
}

impl serde::Serialize for RenderedUpdate {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

/// The transport sink rendered updates are pushed to.
///
/// Implementations are expected to serialise via [`RenderedUpdate::to_json`]
/// (or an equivalent [`Renderer`](crate::render::Renderer)) and push over
/// their transport. Send failures are logged by the runtime and never poison
/// the tree.
#[async_trait]
pub trait Updater: Send + Sync {
	/// Delivers one rendered update.
	async fn send(&self, update: RenderedUpdate) -> Result<(), UpdaterError>;
}

/// Delivers client-hook events back to the browser client.
///
/// Dispatch is expected to enqueue and return promptly; it is called from
/// inside the actor.
pub trait ClientDispatcher: Send + Sync {
	/// Delivers one event to the client-side hook instance.
	fn dispatch(&self, hook_id: &Cuid, event: &str, payload: Option<&Value>)
		-> Result<(), UpdaterError>;
}

/// An [`Updater`] that forwards updates into an unbounded channel.
///
/// The building block for transport glue and tests: a WebSocket writer task
/// owns the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelUpdater {
	tx: UnboundedSender<RenderedUpdate>,
}

impl ChannelUpdater {
	/// Wraps a channel sender.
	pub fn new(tx: UnboundedSender<RenderedUpdate>) -> Self {
		Self { tx }
	}
}

#[async_trait]
impl Updater for ChannelUpdater {
	async fn send(&self, update: RenderedUpdate) -> Result<(), UpdaterError> {
		self.tx.send(update).map_err(|_| UpdaterError::Closed)
	}
}

/// An [`Updater`] that discards updates. Test use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUpdater;

#[async_trait]
impl Updater for NoopUpdater {
	async fn send(&self, _update: RenderedUpdate) -> Result<(), UpdaterError> {
		Ok(())
	}
}

pub(crate) type StateUpdateFn = Box<dyn FnOnce(&mut StateHook) + Send>;

/// Messages understood by the runtime actor.
pub(crate) enum RuntimeMessage {
	Shutdown,
	GetReconciled(oneshot::Sender<Option<Reconciled>>),
	ProcessEvent {
		id: Cuid,
		payload: Option<Value>,
	},
	ProcessEventImmediate {
		reply: oneshot::Sender<Result<(), EventError>>,
		id: Cuid,
		payload: Option<Value>,
	},
	ProcessClientHook {
		id: Cuid,
		event: String,
		payload: Option<Value>,
		reply: Arc<dyn ClientDispatcher>,
	},
	ProcessClientHookImmediate {
		reply: oneshot::Sender<Result<(), EventError>>,
		id: Cuid,
		event: String,
		payload: Option<Value>,
		dispatcher: Arc<dyn ClientDispatcher>,
	},
	UpdateHookState {
		id: Cuid,
		apply: StateUpdateFn,
	},
	ReconcileImmediate(oneshot::Sender<Result<Reconciled, RenderError>>),
	RenderUpdate,
	ClientDispatch {
		id: Cuid,
		event: String,
		payload: Option<Value>,
	},
}

/// Configuration for a runtime.
///
/// ## Example
///
/// ```ignore
/// let options = RuntimeOptions::new()
///     .call_timeout(Duration::from_millis(250))
///     .cuid_source(CuidSource::seeded(7));
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
	/// Reply timeout for bounded calls (immediate events, reducer reads).
	pub call_timeout: Duration,
	/// Id source; defaults to the shared process-global source.
	pub cuid_source: Option<CuidSource>,
	/// Whether `start` schedules the initial render.
	pub render_on_start: bool,
}

impl Default for RuntimeOptions {
	fn default() -> Self {
		Self {
			call_timeout: DEFAULT_CALL_TIMEOUT,
			cuid_source: None,
			render_on_start: true,
		}
	}
}

impl RuntimeOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the reply timeout for bounded calls.
	pub fn call_timeout(mut self, timeout: Duration) -> Self {
		self.call_timeout = timeout;
		self
	}

	/// Uses a specific id source.
	pub fn cuid_source(mut self, source: CuidSource) -> Self {
		self.cuid_source = Some(source);
		self
	}

	/// Disables the initial render scheduled by `start`.
	pub fn no_render_on_start(mut self) -> Self {
		self.render_on_start = false;
		self
	}
}

/// Spawns a runtime rendering `view` into `updater`.
///
/// The first render emits a [`RenderedUpdate::Full`]; every re-render emits
/// a [`RenderedUpdate::Patch`] against the previously emitted tree.
pub fn start(view: Element, updater: Arc<dyn Updater>) -> RuntimeHandle {
	start_with(view, updater, None, RuntimeOptions::default())
}

/// Spawns a runtime with a client-hook dispatcher and explicit options.
pub fn start_with(
	view: Element,
	updater: Arc<dyn Updater>,
	dispatcher: Option<Arc<dyn ClientDispatcher>>,
	options: RuntimeOptions,
) -> RuntimeHandle {
	let (tx, rx) = mpsc::unbounded_channel();
	let cuid = options.cuid_source.unwrap_or_else(CuidSource::global);
	let context = Context::new(view, cuid, tx.clone(), options.call_timeout);
	let runtime = Runtime {
		context,
		updater,
		dispatcher,
		reconciled: None,
	};
	if options.render_on_start && tx.send(RuntimeMessage::RenderUpdate).is_err() {
		tracing::error!("failed to schedule initial render");
	}
	tokio::spawn(runtime.run(rx));
	RuntimeHandle {
		tx,
		call_timeout: options.call_timeout,
	}
}

/// Handle onto a running runtime.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
	tx: UnboundedSender<RuntimeMessage>,
	call_timeout: Duration,
}

impl RuntimeHandle {
	/// Shuts the runtime down. Cleanups run before the actor exits.
	pub fn stop(&self) {
		let _ = self.tx.send(RuntimeMessage::Shutdown);
	}

	/// Schedules a render.
	pub fn render_update(&self) {
		let _ = self.tx.send(RuntimeMessage::RenderUpdate);
	}

	/// Dispatches a DOM event to the handler with the given id,
	/// fire-and-forget. An unknown id is logged by the actor.
	pub fn process_event(&self, id: Cuid, payload: Option<Value>) {
		let _ = self.tx.send(RuntimeMessage::ProcessEvent { id, payload });
	}

	/// Dispatches a DOM event and waits for the dispatch outcome.
	pub async fn process_event_immediate(
		&self,
		id: Cuid,
		payload: Option<Value>,
	) -> Result<(), RuntimeError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RuntimeMessage::ProcessEventImmediate { reply, id, payload })
			.map_err(|_| RuntimeError::Closed)?;
		self.try_call(rx).await?.map_err(RuntimeError::from)
	}

	/// Routes a client-hook event to the hook with the given id,
	/// fire-and-forget. The hook's listener replies through `reply`; an
	/// unknown id is logged by the actor.
	pub fn process_client_hook(
		&self,
		id: Cuid,
		event: impl Into<String>,
		payload: Option<Value>,
		reply: Arc<dyn ClientDispatcher>,
	) {
		let _ = self.tx.send(RuntimeMessage::ProcessClientHook {
			id,
			event: event.into(),
			payload,
			reply,
		});
	}

	/// Routes a client-hook event and waits for the dispatch outcome.
	pub async fn process_client_hook_immediate(
		&self,
		id: Cuid,
		event: impl Into<String>,
		payload: Option<Value>,
		reply: Arc<dyn ClientDispatcher>,
	) -> Result<(), RuntimeError> {
		let (tx, rx) = oneshot::channel();
		self.tx
			.send(RuntimeMessage::ProcessClientHookImmediate {
				reply: tx,
				id,
				event: event.into(),
				payload,
				dispatcher: reply,
			})
			.map_err(|_| RuntimeError::Closed)?;
		self.try_call(rx).await?.map_err(RuntimeError::from)
	}

	/// Performs a reconciliation and returns the new tree. Test use.
	pub async fn reconcile_immediate(&self) -> Result<Reconciled, RuntimeError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RuntimeMessage::ReconcileImmediate(reply))
			.map_err(|_| RuntimeError::Closed)?;
		self.try_call(rx).await?.map_err(RuntimeError::from)
	}

	/// Returns the current reconciled tree, if a render has completed. Test
	/// use.
	pub async fn get_reconciled(&self) -> Result<Option<Reconciled>, RuntimeError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(RuntimeMessage::GetReconciled(reply))
			.map_err(|_| RuntimeError::Closed)?;
		self.try_call(rx).await
	}

	async fn try_call<T>(&self, rx: oneshot::Receiver<T>) -> Result<T, RuntimeError> {
		match tokio::time::timeout(self.call_timeout, rx).await {
			Err(_) => Err(RuntimeError::Timeout),
			Ok(Err(_)) => Err(RuntimeError::Closed),
			Ok(Ok(value)) => Ok(value),
		}
	}
}

/// Actor state: the context, the transport, and the current tree.
struct Runtime {
	context: Context,
	updater: Arc<dyn Updater>,
	dispatcher: Option<Arc<dyn ClientDispatcher>>,
	reconciled: Option<Reconciled>,
}

impl Runtime {
	async fn run(mut self, mut rx: UnboundedReceiver<RuntimeMessage>) {
		while let Some(message) = rx.recv().await {
			match message {
				RuntimeMessage::Shutdown => break,
				RuntimeMessage::GetReconciled(reply) => {
					let _ = reply.send(self.reconciled.clone());
				}
				RuntimeMessage::ProcessEvent { id, payload } => {
					if let Err(error) = self.process_event(&id, payload) {
						tracing::warn!(%error, "event dispatch missed");
					}
				}
				RuntimeMessage::ProcessEventImmediate { reply, id, payload } => {
					let _ = reply.send(self.process_event(&id, payload));
				}
				RuntimeMessage::ProcessClientHook {
					id,
					event,
					payload,
					reply,
				} => {
					if let Err(error) =
						self.process_client_hook(&id, &event, payload.as_ref(), reply.as_ref())
					{
						tracing::warn!(%error, "client hook dispatch missed");
					}
				}
				RuntimeMessage::ProcessClientHookImmediate {
					reply,
					id,
					event,
					payload,
					dispatcher,
				} => {
					let _ = reply.send(self.process_client_hook(
						&id,
						&event,
						payload.as_ref(),
						dispatcher.as_ref(),
					));
				}
				RuntimeMessage::UpdateHookState { id, apply } => {
					match self.reconciled.as_mut() {
						Some(tree) => {
							tree.update_state_hook(&id, apply);
						}
						None => {
							tracing::warn!(hook = %id, "state update before first render; dropped")
						}
					}
				}
				RuntimeMessage::ReconcileImmediate(reply) => match self.reconcile_once() {
					Ok(tree) => {
						let _ = reply.send(Ok(tree));
					}
					Err(error) => {
						tracing::error!(%error, "fatal render error; shutting runtime down");
						let _ = reply.send(Err(error));
						break;
					}
				},
				RuntimeMessage::RenderUpdate => {
					if let Err(error) = self.render_update().await {
						tracing::error!(%error, "fatal render error; shutting runtime down");
						break;
					}
				}
				RuntimeMessage::ClientDispatch { id, event, payload } => {
					match &self.dispatcher {
						Some(dispatcher) => {
							if let Err(error) =
								dispatcher.dispatch(&id, &event, payload.as_ref())
							{
								tracing::warn!(%error, hook = %id, "client dispatch failed");
							}
						}
						None => {
							tracing::warn!(hook = %id, "client dispatch without a dispatcher")
						}
					}
				}
			}
		}
		if let Some(tree) = &self.reconciled {
			run_all_cleanups(tree);
		}
	}

	/// Reconciles against the previous tree, runs disposed-hook cleanups and
	/// the effect pass, and installs the new tree.
	///
	/// On error the previous tree is retained unchanged.
	fn reconcile_once(&mut self) -> Result<Reconciled, RenderError> {
		self.context.prepare_for_reconciliation();
		let view = self.context.view().clone();
		let mut next = reconcile(&mut self.context, &view, self.reconciled.as_ref())?;
		if let Some(prev) = &self.reconciled {
			run_disposed_cleanups(prev, &next);
		}
		run_effects(&mut next)?;
		self.reconciled = Some(next.clone());
		Ok(next)
	}

	async fn render_update(&mut self) -> Result<(), RenderError> {
		let prev = self.reconciled.clone();
		let next = self.reconcile_once()?;
		let update = match prev {
			Some(prev) => RenderedUpdate::Patch(patch::create(&prev, &next)),
			None => RenderedUpdate::Full(next),
		};
		if let Err(error) = self.updater.send(update).await {
			tracing::warn!(%error, "updater send failed");
		}
		Ok(())
	}

	fn process_event(&self, id: &Cuid, payload: Option<Value>) -> Result<(), EventError> {
		match self.context.handler(id) {
			Some(handler) => {
				(handler.handler)(payload);
				Ok(())
			}
			None => Err(EventError::UnknownHandler(id.to_string())),
		}
	}

	fn process_client_hook(
		&self,
		id: &Cuid,
		event: &str,
		payload: Option<&Value>,
		reply: &dyn ClientDispatcher,
	) -> Result<(), EventError> {
		let hook = self
			.reconciled
			.as_ref()
			.and_then(|tree| tree.find_client_hook(id));
		match hook {
			Some(hook) => {
				if let Some(on_event) = &hook.on_event {
					on_event(event, payload, reply);
				}
				Ok(())
			}
			None => Err(EventError::UnknownClientHook(id.to_string())),
		}
	}
}
