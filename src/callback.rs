//! Render-stable function handles.
//!
//! Components hand behaviour to their children as [`Callback`]s: cheaply
//! cloneable function handles compared by identity rather than by contents.
//! The `use_callback` hook keeps one per slot and returns the stored
//! instance while its dependencies are unchanged, so a child receiving the
//! same callback twice knows nothing changed. Identity equality also lets a
//! callback sit in a dependency list like any other value.

use std::fmt;
use std::sync::Arc;

/// A cloneable function handle whose identity is stable across renders.
///
/// Two callbacks are equal when they share one underlying function
/// allocation. A freshly wrapped closure is never equal to an old one, even
/// with identical behaviour; reuse comes from `use_callback` handing the
/// stored instance back, not from comparing code.
///
/// ## Example
///
/// ```ignore
/// let on_select = use_callback(
/// 	ctx,
/// 	Callback::new(move |index: usize| set_selected.set(index)),
/// 	Trigger::WithDeps(deps![]),
/// )?;
/// on_select.call(3);
/// ```
pub struct Callback<Args, Ret = ()> {
	func: Arc<dyn Fn(Args) -> Ret + Send + Sync + 'static>,
}

impl<Args, Ret> Callback<Args, Ret> {
	/// Wraps a function or closure.
	pub fn new<F>(func: F) -> Self
	where
		F: Fn(Args) -> Ret + Send + Sync + 'static,
	{
		Self {
			func: Arc::new(func),
		}
	}

	/// Invokes the wrapped function.
	pub fn call(&self, args: Args) -> Ret {
		(self.func)(args)
	}

	/// Whether two handles share one underlying function.
	///
	/// This is the stability `use_callback` guarantees across renders whose
	/// dependencies are unchanged.
	pub fn same_fn(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.func, &other.func)
	}
}

impl<Args, Ret> Clone for Callback<Args, Ret> {
	fn clone(&self) -> Self {
		Self {
			func: Arc::clone(&self.func),
		}
	}
}

/// Identity equality, so callbacks can participate in dependency lists.
impl<Args, Ret> PartialEq for Callback<Args, Ret> {
	fn eq(&self, other: &Self) -> bool {
		self.same_fn(other)
	}
}

impl<Args, Ret> Eq for Callback<Args, Ret> {}

impl<Args, Ret> fmt::Debug for Callback<Args, Ret> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Callback({:p})", Arc::as_ptr(&self.func))
	}
}
