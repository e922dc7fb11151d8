//! Error types for the runtime.
//!
//! Errors are split by failure domain: [`RenderError`] covers programmer
//! errors detected during reconciliation (these are fatal and shut the
//! runtime down cleanly), [`EventError`] covers event-dispatch misses (logged
//! or surfaced, never fatal), [`PatchError`] covers malformed patch
//! application, and [`RuntimeError`] is the caller-facing union returned by
//! the `RuntimeHandle` call wrappers.

use thiserror::Error;

/// Fatal errors raised while rendering a component tree.
///
/// These indicate broken component code: hook order drift between renders,
/// a consumer without an enclosing provider, or hook state that no longer
/// holds the type the component expects. The runtime aborts the render,
/// retains the previous reconciled tree, runs cleanups, and terminates.
#[derive(Debug, Error)]
pub enum RenderError {
	/// A component rendered a different hook variant at the same index.
	#[error("hook order drift at index {index}: previous render had a {previous} hook, this render called a {current} hook")]
	HookDrift {
		/// Index of the hook within the component.
		index: usize,
		/// Variant tag recorded by the previous render.
		previous: &'static str,
		/// Variant tag of the hook called this render.
		current: &'static str,
	},

	/// A component rendered fewer hooks than the previous render.
	#[error("hook count drift: component called {current} hooks, previous render had {previous}")]
	HookCountDrift {
		/// Hook count of the previous render.
		previous: usize,
		/// Hook count of this render.
		current: usize,
	},

	/// A hook was called while no component render was in progress.
	#[error("hook called outside of a component render")]
	HookOutsideComponent,

	/// `use_consumer` found no provider for the requested key.
	#[error("no provider in scope for context key {key:?}")]
	MissingProvider {
		/// The context key the consumer asked for.
		key: String,
	},

	/// A provider value could not be downcast to the consumer's type.
	#[error("provider value for context key {key:?} has an unexpected type")]
	ProviderTypeMismatch {
		/// The context key the consumer asked for.
		key: String,
	},

	/// A dependency list changed length between renders.
	#[error("dependency list changed length between renders: {previous} -> {current}")]
	DepsLengthMismatch {
		/// Length recorded by the previous render.
		previous: usize,
		/// Length supplied this render.
		current: usize,
	},

	/// Reading a reducer model timed out.
	#[error("timed out reading reducer model")]
	ReducerTimeout,

	/// Hook state no longer matches what the component expects.
	#[error("malformed hook state: {0}")]
	MalformedHook(String),
}

/// Event-dispatch misses. These never poison the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
	/// No handler with the given id exists in the current tree.
	#[error("unknown event handler id {0:?}")]
	UnknownHandler(String),

	/// No client hook with the given id exists in the current tree.
	#[error("unknown client hook id {0:?}")]
	UnknownClientHook(String),
}

/// Failures sending a rendered update to the transport.
#[derive(Debug, Error)]
pub enum UpdaterError {
	/// The transport connection is gone.
	#[error("updater connection closed")]
	Closed,

	/// The update could not be serialised or delivered.
	#[error("updater send failed: {0}")]
	Send(String),
}

/// Failures applying a patch to a reconciled tree.
#[derive(Debug, Error)]
pub enum PatchError {
	/// A child patch referenced an index with no base node.
	#[error("child patch index {index} has no base node")]
	MissingBase {
		/// The offending child index.
		index: usize,
	},

	/// The patch variant cannot be applied at this position.
	#[error("patch cannot be applied here: {0}")]
	CannotApply(&'static str),
}

/// Caller-facing errors from the `RuntimeHandle` call wrappers.
#[derive(Debug, Error)]
pub enum RuntimeError {
	/// The runtime did not reply within the call timeout.
	#[error("runtime call timed out")]
	Timeout,

	/// The runtime mailbox is closed (the actor has shut down).
	#[error("runtime has shut down")]
	Closed,

	/// The runtime hit a fatal render error.
	#[error(transparent)]
	Render(#[from] RenderError),

	/// An immediate event dispatch missed.
	#[error(transparent)]
	Event(#[from] EventError),
}
