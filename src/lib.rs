//! Server-side reactive UI runtime.
//!
//! A process-resident runtime owns a component tree, drives reconciliation
//! against the previous tree, runs a hook-based side-effect model, and
//! pushes either a full rendered tree or a minimal patch to a transport
//! updater. A browser client reapplies the patches to the DOM and posts
//! events back.
//!
//! ## Overview
//!
//! - [`element`] — the immutable virtual-tree nodes components build.
//! - [`hooks`] — state, reducer, effect, memo, callback, handler, client,
//!   and consumer hooks with stable ids across renders.
//! - [`runtime`] — the serialised actor that owns the tree, dispatches
//!   events, and schedules renders.
//! - [`patch`] — structural diffs between reconciled trees, serialisable
//!   for the wire.
//! - [`render`] — the JSON wire shape shared with the browser client.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pinion::prelude::*;
//!
//! fn app(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
//! 	let (count, set_count) = use_state(ctx, 0u32)?;
//! 	let on_click = use_handler(ctx, move |_| set_count.set(count + 1))?;
//! 	Ok(vec![el(
//! 		"button",
//! 		vec![on(EventType::Click, on_click)],
//! 		vec![text(format!("clicked {count} times"))],
//! 	)])
//! }
//!
//! # async fn run(updater: Arc<dyn Updater>) {
//! let handle = start(component(app, Props::empty()), updater);
//! # }
//! ```

pub mod callback;
pub mod context;
pub mod cuid;
pub mod element;
pub mod error;
pub mod hooks;
pub mod patch;
pub mod prelude;
pub mod props;
pub mod render;
pub mod runtime;
pub mod tree;

mod reconcile;

pub use callback::Callback;
pub use context::Context;
pub use cuid::{Cuid, CuidSource};
pub use element::{Element, EventType};
pub use error::{EventError, PatchError, RenderError, RuntimeError, UpdaterError};
pub use hooks::{Hook, Trigger};
pub use patch::Patch;
pub use props::Props;
pub use render::{IdentityRenderer, JsonRenderer, Renderer};
pub use runtime::{start, start_with, RenderedUpdate, RuntimeHandle, RuntimeOptions, Updater};
pub use tree::Reconciled;
