//! Dependency lists and structural change detection.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;

/// A single dependency value, compared structurally across renders.
#[derive(Clone)]
pub struct Dep {
	value: Arc<dyn Any + Send + Sync>,
	eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl Dep {
	/// Captures a dependency value.
	pub fn of<T>(value: T) -> Self
	where
		T: Any + PartialEq + Send + Sync,
	{
		Self {
			value: Arc::new(value),
			eq: eq_impl::<T>,
		}
	}

	fn matches(&self, other: &Dep) -> bool {
		(self.eq)(&*self.value, &*other.value)
	}
}

impl fmt::Debug for Dep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Dep(<opaque>)")
	}
}

/// A dependency list.
pub type Deps = Vec<Dep>;

/// Builds a dependency list from `PartialEq` values.
///
/// ## Example
///
/// ```ignore
/// use_effect(ctx, load_page, Trigger::WithDeps(deps![page, per_page]))?;
/// ```
#[macro_export]
macro_rules! deps {
	($($value:expr),* $(,)?) => {
		vec![$($crate::hooks::Dep::of($value)),*]
	};
}

/// The outcome of comparing two dependency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsChange {
	/// Every element compared equal.
	Unchanged,
	/// At least one element differs.
	Changed,
}

/// Compares two dependency lists element-wise.
///
/// The lists must have equal length; a length change between renders is a
/// programmer error.
pub fn compare_deps(prev: &Deps, next: &Deps) -> Result<DepsChange, RenderError> {
	if prev.len() != next.len() {
		return Err(RenderError::DepsLengthMismatch {
			previous: prev.len(),
			current: next.len(),
		});
	}
	let unchanged = prev
		.iter()
		.zip(next.iter())
		.all(|(prev, next)| prev.matches(next));
	Ok(if unchanged {
		DepsChange::Unchanged
	} else {
		DepsChange::Changed
	})
}

fn eq_impl<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
	match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}
