//! The consumer hook: reads the nearest enclosing provider value.

use std::any::Any;

use crate::context::Context;
use crate::error::RenderError;

/// Reads the nearest enclosing provider value for `key`.
///
/// Consumers retain no hook slot; they read the provider scope the
/// reconciler maintains while descending the tree. A missing provider, or a
/// provider holding a different type than the consumer expects, is a fatal
/// usage error.
pub fn use_consumer<T>(ctx: &Context, key: &str) -> Result<T, RenderError>
where
	T: Any + Clone + Send + Sync,
{
	let value = ctx
		.provider_value(key)
		.ok_or_else(|| RenderError::MissingProvider {
			key: key.to_string(),
		})?;
	value
		.downcast_ref::<T>()
		.cloned()
		.ok_or_else(|| RenderError::ProviderTypeMismatch {
			key: key.to_string(),
		})
}
