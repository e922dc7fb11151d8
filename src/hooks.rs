//! The hook library.
//!
//! Hooks are per-component, per-index pieces of retained state with stable
//! ids. A component calls the same hooks in the same order on every render;
//! the render cursor matches each call to its slot by index and validates
//! that the variant at that slot never changes. Violations are programmer
//! errors and abort the render.
//!
//! ## Example
//!
//! ```ignore
//! fn counter(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
//! 	let (count, set_count) = use_state(ctx, 0u32)?;
//! 	let on_click = use_handler(ctx, move |_payload| {
//! 		set_count.set(count + 1);
//! 	})?;
//! 	Ok(vec![el(
//! 		"button",
//! 		vec![on(EventType::Click, on_click)],
//! 		vec![text(count.to_string())],
//! 	)])
//! }
//! ```

mod client;
mod consumer;
mod deps;
mod effect;
mod handler;
mod memo;
mod reducer;
mod state;

pub use client::{use_client, ClientEventFn, ClientHandle, ClientHook};
pub use consumer::use_consumer;
pub use deps::{compare_deps, Dep, Deps, DepsChange};
pub(crate) use effect::run_effect;
pub use effect::{use_effect, EffectCleanup, EffectFn, EffectHook, EffectResult};
pub use handler::{use_handler, HandlerFn, HandlerHook, IdentifiableHandler};
pub use memo::{use_callback, use_memo, CallbackHook, MemoHook};
pub use reducer::{use_reducer, ReducerDispatch, ReducerHandle, ReducerHook};
pub use state::{use_state, StateHook, StateSetter};

use crate::cuid::Cuid;

/// Controls when an effect, memo, or callback re-executes.
#[derive(Debug, Clone)]
pub enum Trigger {
	/// Run once, after the hook first mounts.
	OnMount,
	/// Run after every reconciliation.
	OnUpdate,
	/// Run whenever the dependency list changes structurally.
	///
	/// An empty list behaves like [`Trigger::OnMount`].
	WithDeps(Deps),
}

/// A retained hook slot. One variant per hook kind; every variant carries a
/// stable id assigned on first render.
#[derive(Debug, Clone)]
pub enum Hook {
	/// Local state, mutated through its setter.
	State(StateHook),
	/// A model owned by an isolated reducer task.
	Reducer(ReducerHook),
	/// A side effect scheduled by the post-reconciliation effect pass.
	Effect(EffectHook),
	/// A memoised value.
	Memo(MemoHook),
	/// A memoised function with stable identity.
	Callback(CallbackHook),
	/// An identified event handler.
	Handler(HandlerHook),
	/// A client-side hook binding.
	Client(ClientHook),
}

impl Hook {
	/// The stable id of this hook.
	pub fn id(&self) -> &Cuid {
		match self {
			Hook::State(hook) => &hook.id,
			Hook::Reducer(hook) => &hook.id,
			Hook::Effect(hook) => &hook.id,
			Hook::Memo(hook) => &hook.id,
			Hook::Callback(hook) => &hook.id,
			Hook::Handler(hook) => &hook.id,
			Hook::Client(hook) => &hook.id,
		}
	}

	/// Variant tag, used to detect hook-order drift between renders.
	pub(crate) fn tag(&self) -> &'static str {
		match self {
			Hook::State(_) => "state",
			Hook::Reducer(_) => "reducer",
			Hook::Effect(_) => "effect",
			Hook::Memo(_) => "memo",
			Hook::Callback(_) => "callback",
			Hook::Handler(_) => "handler",
			Hook::Client(_) => "client",
		}
	}
}

/// The dependency snapshot to record after running under `trigger`.
pub(crate) fn recorded_deps(trigger: &Trigger) -> Option<Deps> {
	match trigger {
		Trigger::OnMount => Some(Vec::new()),
		Trigger::OnUpdate => None,
		Trigger::WithDeps(deps) => Some(deps.clone()),
	}
}
