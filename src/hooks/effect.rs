//! The effect hook and the post-reconciliation effect pass rule.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::cuid::Cuid;
use crate::error::RenderError;
use crate::hooks::{compare_deps, recorded_deps, DepsChange, Hook, Trigger};

/// A cleanup registered by an effect, run before the effect re-runs and when
/// the hook is disposed.
pub type EffectCleanup = Arc<dyn Fn() + Send + Sync>;

/// An effect function. Runs after reconciliation; returns an optional
/// cleanup.
pub type EffectFn = Arc<dyn Fn() -> Option<EffectCleanup> + Send + Sync>;

/// What the last effect run left behind.
#[derive(Clone)]
pub struct EffectResult {
	/// Cleanup registered by the last run.
	pub cleanup: Option<EffectCleanup>,
	/// Dependency snapshot recorded by the last run (`None` for
	/// [`Trigger::OnUpdate`]).
	pub deps: Option<crate::hooks::Deps>,
}

impl fmt::Debug for EffectResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EffectResult")
			.field("cleanup", &self.cleanup.is_some())
			.field("deps", &self.deps.as_ref().map(Vec::len))
			.finish()
	}
}

/// Retained slot for [`use_effect`].
#[derive(Clone)]
pub struct EffectHook {
	/// Stable hook id.
	pub id: Cuid,
	/// The effect function, replaced each render.
	pub func: EffectFn,
	/// When the effect pass should run `func`.
	pub trigger: Trigger,
	/// Result of the last run, if the effect has run.
	pub result: Option<EffectResult>,
}

impl fmt::Debug for EffectHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EffectHook")
			.field("id", &self.id)
			.field("trigger", &self.trigger)
			.field("result", &self.result)
			.finish()
	}
}

/// A side effect driven by the post-reconciliation effect pass.
///
/// The function and trigger are refreshed every render; whether the effect
/// actually runs is decided once the whole tree has reconciled, per the
/// trigger rules on [`Trigger`]. Effects must return promptly; long work
/// belongs in a spawned task.
pub fn use_effect(
	ctx: &mut Context,
	func: impl Fn() -> Option<EffectCleanup> + Send + Sync + 'static,
	trigger: Trigger,
) -> Result<(), RenderError> {
	let func: EffectFn = Arc::new(func);
	let (hook, index, _initialized) = ctx.fetch_or_init_hook("effect", |cuid| {
		Hook::Effect(EffectHook {
			id: cuid.next(),
			func: func.clone(),
			trigger: trigger.clone(),
			result: None,
		})
	})?;
	let mut effect = match hook {
		Hook::Effect(effect) => effect,
		other => {
			return Err(RenderError::MalformedHook(format!(
				"expected effect hook, found {}",
				other.tag()
			)));
		}
	};
	effect.func = func;
	effect.trigger = trigger;
	ctx.update_hook(index, Hook::Effect(effect));
	Ok(())
}

/// Applies the trigger rule to one effect hook during the effect pass.
///
/// Runs the prior cleanup before re-running, and records the new
/// [`EffectResult`].
pub(crate) fn run_effect(effect: &mut EffectHook) -> Result<(), RenderError> {
	let should_run = match &effect.trigger {
		Trigger::OnMount => effect.result.is_none(),
		Trigger::OnUpdate => true,
		Trigger::WithDeps(next) => match effect.result.as_ref().and_then(|result| result.deps.as_ref()) {
			None => true,
			Some(prev) => compare_deps(prev, next)? == DepsChange::Changed,
		},
	};
	if !should_run {
		return Ok(());
	}
	if let Some(cleanup) = effect.result.as_ref().and_then(|result| result.cleanup.clone()) {
		cleanup();
	}
	let cleanup = (effect.func)();
	effect.result = Some(EffectResult {
		cleanup,
		deps: recorded_deps(&effect.trigger),
	});
	Ok(())
}
