//! Convenience re-exports for component authors.
//!
//! ```ignore
//! use pinion::prelude::*;
//! ```

pub use crate::callback::Callback;
pub use crate::context::Context;
pub use crate::cuid::{Cuid, CuidSource};
pub use crate::deps;
pub use crate::element::{
	attr, classes, component, component_keyed, el, fragment, key, keyed_fragment, on, provider,
	text, Attribute, Element, EventType,
};
pub use crate::error::{RenderError, RuntimeError};
pub use crate::hooks::{
	use_callback, use_client, use_consumer, use_effect, use_handler, use_memo, use_reducer,
	use_state, Dep, EffectCleanup, Trigger,
};
pub use crate::props::Props;
pub use crate::runtime::{
	start, start_with, ChannelUpdater, ClientDispatcher, RenderedUpdate, RuntimeHandle,
	RuntimeOptions, Updater,
};
