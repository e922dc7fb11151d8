//! The state hook.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::Hook;
use crate::runtime::RuntimeMessage;

/// Retained slot for [`use_state`].
#[derive(Clone)]
pub struct StateHook {
	/// Stable hook id.
	pub id: Cuid,
	/// The current value.
	pub value: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for StateHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateHook")
			.field("id", &self.id)
			.field("value", &"<opaque>")
			.finish()
	}
}

/// Updates a state hook's value and schedules a re-render.
///
/// Setters are cheap to clone into handler and effect closures. Their own
/// identity is not stable across renders; the hook id they target is.
pub struct StateSetter<T> {
	id: Cuid,
	runtime: UnboundedSender<RuntimeMessage>,
	_marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id.clone(),
			runtime: self.runtime.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for StateSetter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateSetter").field("id", &self.id).finish()
	}
}

impl<T: Any + Send + Sync> StateSetter<T> {
	/// Replaces the hook's value and schedules a re-render.
	pub fn set(&self, value: T) {
		let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
		let posted = self
			.runtime
			.send(RuntimeMessage::UpdateHookState {
				id: self.id.clone(),
				apply: Box::new(move |hook| hook.value = value),
			})
			.and_then(|_| self.runtime.send(RuntimeMessage::RenderUpdate));
		if posted.is_err() {
			tracing::warn!(hook = %self.id, "state set after runtime shut down");
		}
	}
}

/// Local component state.
///
/// Returns the current value and a setter. The value read is the one the
/// runtime held when this render began; calling the setter posts the new
/// value to the runtime and schedules a re-render, so the update becomes
/// visible on the next pass.
pub fn use_state<T>(ctx: &mut Context, initial: T) -> Result<(T, StateSetter<T>), RenderError>
where
	T: Any + Clone + Send + Sync,
{
	let (hook, _index, _initialized) = ctx.fetch_or_init_hook("state", |cuid| {
		Hook::State(StateHook {
			id: cuid.next(),
			value: Arc::new(initial.clone()),
		})
	})?;
	let state = match hook {
		Hook::State(state) => state,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected state hook, found {}",
				other.tag()
			)));
		}
	};
	let value = state
		.value
		.downcast_ref::<T>()
		.cloned()
		.ok_or_else(|| RenderError::MalformedHook(format!("state hook {} holds an unexpected type", state.id)))?;
	let setter = StateSetter {
		id: state.id,
		runtime: ctx.runtime_sender().clone(),
		_marker: PhantomData,
	};
	Ok((value, setter))
}
