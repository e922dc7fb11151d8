//! The reducer hook: a model advanced by dispatched messages.
//!
//! The model lives in a lock-guarded cell owned by the hook. `Dispatch`
//! applies the reduction immediately, serialised by the write lock, so the
//! re-render it schedules always observes the reduced model. `Get` is a
//! bounded read; `Shutdown` drops the model when the hook is disposed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::Hook;
use crate::runtime::RuntimeMessage;

type BoxedModel = Arc<dyn Any + Send + Sync>;

/// Handle onto a reducer's model cell.
#[derive(Clone)]
pub struct ReducerHandle {
	model: Arc<RwLock<Option<BoxedModel>>>,
}

impl ReducerHandle {
	pub(crate) fn new(initial: BoxedModel) -> Self {
		Self {
			model: Arc::new(RwLock::new(Some(initial))),
		}
	}

	/// Reads the current model, bounded by `timeout`.
	pub(crate) fn get(&self, timeout: Duration) -> Result<BoxedModel, RenderError> {
		let guard = self
			.model
			.try_read_for(timeout)
			.ok_or(RenderError::ReducerTimeout)?;
		guard
			.clone()
			.ok_or_else(|| RenderError::MalformedHook("reducer read after shutdown".to_string()))
	}

	/// Applies a reduction to the model. Returns false once shut down.
	pub(crate) fn dispatch_raw(
		&self,
		apply: impl FnOnce(&BoxedModel) -> BoxedModel,
	) -> bool {
		let mut slot = self.model.write();
		match slot.take() {
			Some(model) => {
				*slot = Some(apply(&model));
				true
			}
			None => false,
		}
	}

	/// Drops the model. Called when the hook is disposed.
	pub fn shutdown(&self) {
		*self.model.write() = None;
	}
}

impl fmt::Debug for ReducerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReducerHandle")
			.field("alive", &self.model.read().is_some())
			.finish()
	}
}

/// Retained slot for [`use_reducer`].
#[derive(Debug, Clone)]
pub struct ReducerHook {
	/// Stable hook id.
	pub id: Cuid,
	/// Handle onto the model cell.
	pub handle: ReducerHandle,
}

/// Sends messages through a reducer and schedules re-renders.
pub struct ReducerDispatch<M, Msg> {
	handle: ReducerHandle,
	runtime: UnboundedSender<RuntimeMessage>,
	reduce: fn(&M, Msg) -> M,
}

impl<M, Msg> Clone for ReducerDispatch<M, Msg> {
	fn clone(&self) -> Self {
		Self {
			handle: self.handle.clone(),
			runtime: self.runtime.clone(),
			reduce: self.reduce,
		}
	}
}

impl<M, Msg> fmt::Debug for ReducerDispatch<M, Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReducerDispatch").finish()
	}
}

impl<M, Msg> ReducerDispatch<M, Msg>
where
	M: Any + Clone + Send + Sync,
	Msg: Send + 'static,
{
	/// Applies `msg` through the reducer and schedules a re-render.
	pub fn dispatch(&self, msg: Msg) {
		let reduce = self.reduce;
		let applied = self.handle.dispatch_raw(|model| {
			match model.downcast_ref::<M>() {
				Some(current) => Arc::new(reduce(current, msg)),
				None => {
					tracing::error!("reducer model holds an unexpected type; dispatch dropped");
					Arc::clone(model)
				}
			}
		});
		if !applied {
			tracing::warn!("reducer dispatch after shutdown; dropped");
			return;
		}
		if self.runtime.send(RuntimeMessage::RenderUpdate).is_err() {
			tracing::warn!("reducer dispatch after runtime shut down");
		}
	}
}

/// A model advanced by dispatched messages.
///
/// On first render the model cell is created with `initial()`'s value; later
/// renders read the current model. `dispatch` applies `reduce` to the model
/// and schedules a re-render, which observes the reduced model.
pub fn use_reducer<M, Msg>(
	ctx: &mut Context,
	initial: impl FnOnce() -> M,
	reduce: fn(&M, Msg) -> M,
) -> Result<(M, ReducerDispatch<M, Msg>), RenderError>
where
	M: Any + Clone + Send + Sync,
	Msg: Send + 'static,
{
	let (hook, _index, _initialized) = ctx.fetch_or_init_hook("reducer", |cuid| {
		Hook::Reducer(ReducerHook {
			id: cuid.next(),
			handle: ReducerHandle::new(Arc::new(initial())),
		})
	})?;
	let reducer = match hook {
		Hook::Reducer(reducer) => reducer,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected reducer hook, found {}",
				other.tag()
			)));
		}
	};
	let model = reducer
		.handle
		.get(ctx.call_timeout())?
		.downcast_ref::<M>()
		.cloned()
		.ok_or_else(|| {
			RenderError::MalformedHook(format!(
				"reducer hook {} holds an unexpected model type",
				reducer.id
			))
		})?;
	let dispatch = ReducerDispatch {
		handle: reducer.handle,
		runtime: ctx.runtime_sender().clone(),
		reduce,
	};
	Ok((model, dispatch))
}
