//! Memoisation hooks: `use_memo` and `use_callback`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::callback::Callback;
use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::{compare_deps, recorded_deps, Deps, DepsChange, Hook, Trigger};

/// Retained slot for [`use_memo`].
#[derive(Clone)]
pub struct MemoHook {
	/// Stable hook id.
	pub id: Cuid,
	/// The memoised value.
	pub value: Arc<dyn Any + Send + Sync>,
	/// Dependency snapshot recorded at the last recompute.
	pub deps: Option<Deps>,
}

impl fmt::Debug for MemoHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoHook")
			.field("id", &self.id)
			.field("value", &"<opaque>")
			.finish()
	}
}

/// Retained slot for [`use_callback`].
#[derive(Clone)]
pub struct CallbackHook {
	/// Stable hook id.
	pub id: Cuid,
	/// The stored callback.
	pub value: Arc<dyn Any + Send + Sync>,
	/// Dependency snapshot recorded at the last replacement.
	pub deps: Option<Deps>,
}

impl fmt::Debug for CallbackHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackHook")
			.field("id", &self.id)
			.field("value", &"<function>")
			.finish()
	}
}

/// Whether a memoised slot should be refreshed this render.
///
/// Fresh slots were already produced by their init closure, so only
/// pre-existing slots are ever refreshed.
fn should_refresh(
	initialized: bool,
	trigger: &Trigger,
	stored_deps: &Option<Deps>,
) -> Result<bool, RenderError> {
	if initialized {
		return Ok(false);
	}
	match (trigger, stored_deps) {
		(Trigger::OnMount, _) => Ok(false),
		(Trigger::OnUpdate, _) => Ok(true),
		(Trigger::WithDeps(next), Some(prev)) => {
			Ok(compare_deps(prev, next)? == DepsChange::Changed)
		}
		// The slot was last recorded under OnUpdate; treat as changed.
		(Trigger::WithDeps(_), None) => Ok(true),
	}
}

/// Memoises an expensive calculation.
///
/// The value is recomputed when `trigger` fires: never after mount for
/// [`Trigger::OnMount`], every render for [`Trigger::OnUpdate`], or when the
/// dependency list changes structurally for [`Trigger::WithDeps`].
pub fn use_memo<T>(
	ctx: &mut Context,
	func: impl Fn() -> T,
	trigger: Trigger,
) -> Result<T, RenderError>
where
	T: Any + Clone + Send + Sync,
{
	let (hook, index, initialized) = ctx.fetch_or_init_hook("memo", |cuid| {
		Hook::Memo(MemoHook {
			id: cuid.next(),
			value: Arc::new(func()),
			deps: recorded_deps(&trigger),
		})
	})?;
	let mut memo = match hook {
		Hook::Memo(memo) => memo,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected memo hook, found {}",
				other.tag()
			)));
		}
	};
	if should_refresh(initialized, &trigger, &memo.deps)? {
		memo.value = Arc::new(func());
		memo.deps = recorded_deps(&trigger);
		ctx.update_hook(index, Hook::Memo(memo.clone()));
	}
	memo.value
		.downcast_ref::<T>()
		.cloned()
		.ok_or_else(|| RenderError::MalformedHook(format!("memo hook {} holds an unexpected type", memo.id)))
}

/// Memoises a function, keeping its identity stable while dependencies are
/// unchanged.
///
/// Whenever `trigger` fires, the stored callback is replaced by the newly
/// supplied one; otherwise callers receive the exact instance stored on a
/// previous render ([`Callback::same_fn`] holds).
pub fn use_callback<Args, Ret>(
	ctx: &mut Context,
	func: Callback<Args, Ret>,
	trigger: Trigger,
) -> Result<Callback<Args, Ret>, RenderError>
where
	Args: 'static,
	Ret: 'static,
{
	let (hook, index, initialized) = ctx.fetch_or_init_hook("callback", |cuid| {
		Hook::Callback(CallbackHook {
			id: cuid.next(),
			value: Arc::new(func.clone()),
			deps: recorded_deps(&trigger),
		})
	})?;
	let mut callback = match hook {
		Hook::Callback(callback) => callback,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected callback hook, found {}",
				other.tag()
			)));
		}
	};
	if should_refresh(initialized, &trigger, &callback.deps)? {
		callback.value = Arc::new(func.clone());
		callback.deps = recorded_deps(&trigger);
		ctx.update_hook(index, Hook::Callback(callback.clone()));
	}
	callback
		.value
		.downcast_ref::<Callback<Args, Ret>>()
		.cloned()
		.ok_or_else(|| {
			RenderError::MalformedHook(format!(
				"callback hook {} holds an unexpected signature",
				callback.id
			))
		})
}
