//! Type-erased component props.
//!
//! Component functions are plain function pointers, so the tree stores their
//! props behind an opaque handle. [`Props`] is the single chokepoint where a
//! typed value enters and leaves the tree: [`Props::new`] captures the value
//! together with a monomorphised equality function, and [`Props::get`]
//! recovers it by downcast inside the component body.
//!
//! ## Example
//!
//! ```ignore
//! #[derive(PartialEq)]
//! struct Greeting {
//! 	name: String,
//! }
//!
//! let props = Props::new(Greeting { name: "World".into() });
//! let greeting = props.get::<Greeting>().unwrap();
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque, structurally comparable property bag.
#[derive(Clone)]
pub struct Props {
	value: Arc<dyn Any + Send + Sync>,
	eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl Props {
	/// Wraps a typed value.
	pub fn new<T>(value: T) -> Self
	where
		T: Any + PartialEq + Send + Sync,
	{
		Self {
			value: Arc::new(value),
			eq: eq_impl::<T>,
		}
	}

	/// Props for components that take none.
	pub fn empty() -> Self {
		Self::new(())
	}

	/// Recovers the typed value, if `T` is what was stored.
	pub fn get<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}
}

impl PartialEq for Props {
	fn eq(&self, other: &Self) -> bool {
		(self.eq)(&*self.value, &*other.value)
	}
}

impl fmt::Debug for Props {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Props").field("value", &"<opaque>").finish()
	}
}

fn eq_impl<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
	match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
		(Some(a), Some(b)) => a == b,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_props_round_trip() {
		let props = Props::new("hello".to_string());
		assert_eq!(props.get::<String>(), Some(&"hello".to_string()));
		assert_eq!(props.get::<u32>(), None);
	}

	#[test]
	fn test_structural_equality() {
		assert_eq!(Props::new(41 + 1), Props::new(42));
		assert_ne!(Props::new(1), Props::new(2));
	}

	#[test]
	fn test_differently_typed_props_never_compare_equal() {
		assert_ne!(Props::new(1u32), Props::new(1u64));
	}

	#[test]
	fn test_empty_props_are_equal() {
		assert_eq!(Props::empty(), Props::empty());
	}
}
