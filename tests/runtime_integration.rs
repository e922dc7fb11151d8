//! Runtime actor integration tests
//!
//! Success Criteria:
//! 1. The first render emits a full tree, re-renders emit patches
//! 2. Events route to handlers by id; state updates land on the next render
//! 3. Effect triggers fire per their rules; cleanups run on unmount
//! 4. Reducer dispatches are visible to the render they schedule
//! 5. Client hooks route events both ways
//! 6. Shutdown runs cleanups exactly once

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use pinion::hooks::ClientEventFn;
use pinion::prelude::*;
use pinion::runtime::NoopUpdater;
use pinion::tree::Reconciled;
use pinion::{deps, EventError, Trigger, UpdaterError};

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

async fn next_update(updates: &mut UnboundedReceiver<RenderedUpdate>) -> RenderedUpdate {
	tokio::time::timeout(RECV_TIMEOUT, updates.recv())
		.await
		.expect("timed out waiting for an update")
		.expect("updater channel closed")
}

/// The text of the first text node found under `tree`, depth-first.
fn first_text(tree: &Reconciled) -> Option<String> {
	match tree {
		Reconciled::Text(text) => Some(text.text.clone()),
		Reconciled::Element(node) => node.children.iter().find_map(first_text),
		Reconciled::Fragment(node) => node.children.iter().find_map(first_text),
		Reconciled::Component(node) => first_text(&node.child),
	}
}

fn first_handler_id(tree: &Reconciled) -> Option<Cuid> {
	use pinion::tree::ReconciledAttribute;
	match tree {
		Reconciled::Text(_) => None,
		Reconciled::Element(node) => node
			.attributes
			.iter()
			.find_map(|attribute| match attribute {
				ReconciledAttribute::EventHandler { id, .. } => Some(id.clone()),
				_ => None,
			})
			.or_else(|| node.children.iter().find_map(first_handler_id)),
		Reconciled::Fragment(node) => node.children.iter().find_map(first_handler_id),
		Reconciled::Component(node) => first_handler_id(&node.child),
	}
}

fn seeded(seed: u64) -> RuntimeOptions {
	RuntimeOptions::new().cuid_source(CuidSource::seeded(seed))
}

// ============================================================================
// State updates and patches
// ============================================================================

fn counter(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let (count, set_count) = use_state(ctx, 0u32)?;
	let on_click = use_handler(ctx, move |_payload| {
		set_count.set(count + 1);
	})?;
	Ok(vec![el(
		"button",
		vec![on(EventType::Click, on_click)],
		vec![text(count.to_string())],
	)])
}

#[tokio::test]
async fn test_state_update_rerenders_with_new_value() {
	let (tx, mut updates) = mpsc::unbounded_channel();
	let handle = start_with(
		component(counter, Props::empty()),
		Arc::new(ChannelUpdater::new(tx)),
		None,
		seeded(10),
	);

	let first = match next_update(&mut updates).await {
		RenderedUpdate::Full(tree) => tree,
		RenderedUpdate::Patch(_) => panic!("first update must be a full tree"),
	};
	assert_eq!(first_text(&first), Some("0".to_string()));
	let handler = first_handler_id(&first).expect("counter renders a click handler");

	handle
		.process_event_immediate(handler.clone(), None)
		.await
		.unwrap();
	assert!(matches!(
		next_update(&mut updates).await,
		RenderedUpdate::Patch(_)
	));

	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("1".to_string()));
	// The handler hook id is unchanged across the re-render.
	assert_eq!(first_handler_id(&tree), Some(handler));
	handle.stop();
}

#[tokio::test]
async fn test_unknown_handler_id_is_an_error_only_for_immediate_dispatch() {
	let (tx, mut updates) = mpsc::unbounded_channel();
	let handle = start_with(
		component(counter, Props::empty()),
		Arc::new(ChannelUpdater::new(tx)),
		None,
		seeded(11),
	);
	next_update(&mut updates).await;

	let bogus = CuidSource::seeded(999).next();
	let error = handle
		.process_event_immediate(bogus.clone(), None)
		.await
		.unwrap_err();
	assert!(matches!(error, RuntimeError::Event(_)));

	// Fire-and-forget dispatch of the same id is a logged no-op.
	handle.process_event(bogus, None);
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("0".to_string()));
	handle.stop();
}

// ============================================================================
// Effect triggers
// ============================================================================

static MOUNT_RUNS: AtomicUsize = AtomicUsize::new(0);
static UPDATE_RUNS: AtomicUsize = AtomicUsize::new(0);
static DEP_RUNS: AtomicUsize = AtomicUsize::new(0);

fn effectful(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let (count, set_count) = use_state(ctx, 0u32)?;
	use_effect(
		ctx,
		|| {
			MOUNT_RUNS.fetch_add(1, Ordering::SeqCst);
			None
		},
		Trigger::OnMount,
	)?;
	use_effect(
		ctx,
		|| {
			UPDATE_RUNS.fetch_add(1, Ordering::SeqCst);
			None
		},
		Trigger::OnUpdate,
	)?;
	use_effect(
		ctx,
		|| {
			DEP_RUNS.fetch_add(1, Ordering::SeqCst);
			None
		},
		Trigger::WithDeps(deps![count / 2]),
	)?;
	let on_click = use_handler(ctx, move |_payload| {
		set_count.set(count + 1);
	})?;
	Ok(vec![el(
		"button",
		vec![on(EventType::Click, on_click)],
		vec![text(count.to_string())],
	)])
}

#[tokio::test]
async fn test_effect_triggers() {
	MOUNT_RUNS.store(0, Ordering::SeqCst);
	UPDATE_RUNS.store(0, Ordering::SeqCst);
	DEP_RUNS.store(0, Ordering::SeqCst);

	let handle = start_with(
		component(effectful, Props::empty()),
		Arc::new(NoopUpdater),
		None,
		seeded(12).no_render_on_start(),
	);

	let tree = handle.reconcile_immediate().await.unwrap();
	assert_eq!(MOUNT_RUNS.load(Ordering::SeqCst), 1);
	assert_eq!(UPDATE_RUNS.load(Ordering::SeqCst), 1);
	assert_eq!(DEP_RUNS.load(Ordering::SeqCst), 1);

	// count 0 -> 1: count / 2 is unchanged, so the deps effect stays quiet.
	let handler = first_handler_id(&tree).unwrap();
	handle
		.process_event_immediate(handler.clone(), None)
		.await
		.unwrap();
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("1".to_string()));
	assert_eq!(MOUNT_RUNS.load(Ordering::SeqCst), 1);
	assert_eq!(UPDATE_RUNS.load(Ordering::SeqCst), 2);
	assert_eq!(DEP_RUNS.load(Ordering::SeqCst), 1);

	// count 1 -> 2: count / 2 changes, the deps effect fires.
	handle.process_event_immediate(handler, None).await.unwrap();
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("2".to_string()));
	assert_eq!(MOUNT_RUNS.load(Ordering::SeqCst), 1);
	assert_eq!(UPDATE_RUNS.load(Ordering::SeqCst), 3);
	assert_eq!(DEP_RUNS.load(Ordering::SeqCst), 2);
	handle.stop();
}

// ============================================================================
// Effect cleanup on unmount
// ============================================================================

static CHILD_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

fn mounts_once(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	use_effect(
		ctx,
		|| {
			Some(Arc::new(|| {
				CHILD_CLEANUPS.fetch_add(1, Ordering::SeqCst);
			}) as EffectCleanup)
		},
		Trigger::OnMount,
	)?;
	Ok(vec![text("child")])
}

fn toggling_parent(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let (show, set_show) = use_state(ctx, true)?;
	let on_click = use_handler(ctx, move |_payload| {
		set_show.set(false);
	})?;
	let body = if show {
		component(mounts_once, Props::empty())
	} else {
		text("empty")
	};
	Ok(vec![el(
		"div",
		vec![on(EventType::Click, on_click)],
		vec![body],
	)])
}

#[tokio::test]
async fn test_effect_cleanup_runs_once_on_unmount() {
	CHILD_CLEANUPS.store(0, Ordering::SeqCst);
	let (tx, mut updates) = mpsc::unbounded_channel();
	let handle = start_with(
		component(toggling_parent, Props::empty()),
		Arc::new(ChannelUpdater::new(tx)),
		None,
		seeded(13),
	);
	let first = match next_update(&mut updates).await {
		RenderedUpdate::Full(tree) => tree,
		RenderedUpdate::Patch(_) => panic!("first update must be a full tree"),
	};
	assert_eq!(CHILD_CLEANUPS.load(Ordering::SeqCst), 0);

	let handler = first_handler_id(&first).unwrap();
	handle.process_event_immediate(handler, None).await.unwrap();
	next_update(&mut updates).await;
	assert_eq!(CHILD_CLEANUPS.load(Ordering::SeqCst), 1);

	// Further renders do not re-run the cleanup.
	handle.render_update();
	next_update(&mut updates).await;
	assert_eq!(CHILD_CLEANUPS.load(Ordering::SeqCst), 1);
	handle.stop();
}

#[tokio::test]
async fn test_shutdown_runs_cleanups() {
	static SHUTDOWN_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

	fn holds_resource(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
		use_effect(
			ctx,
			|| {
				Some(Arc::new(|| {
					SHUTDOWN_CLEANUPS.fetch_add(1, Ordering::SeqCst);
				}) as EffectCleanup)
			},
			Trigger::OnMount,
		)?;
		Ok(vec![text("resource")])
	}

	let handle = start_with(
		component(holds_resource, Props::empty()),
		Arc::new(NoopUpdater),
		None,
		seeded(14).no_render_on_start(),
	);
	handle.reconcile_immediate().await.unwrap();
	assert_eq!(SHUTDOWN_CLEANUPS.load(Ordering::SeqCst), 0);

	handle.stop();
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(SHUTDOWN_CLEANUPS.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Reducer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct TodoModel {
	entries: Vec<String>,
}

enum TodoMsg {
	Add(String),
	Clear,
}

fn todo_reduce(model: &TodoModel, msg: TodoMsg) -> TodoModel {
	match msg {
		TodoMsg::Add(entry) => {
			let mut entries = model.entries.clone();
			entries.push(entry);
			TodoModel { entries }
		}
		TodoMsg::Clear => TodoModel {
			entries: Vec::new(),
		},
	}
}

fn todos(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let (model, dispatch) = use_reducer(
		ctx,
		|| TodoModel {
			entries: Vec::new(),
		},
		todo_reduce,
	)?;
	let on_click = use_handler(ctx, move |payload| {
		match payload.and_then(|value| value.as_str().map(str::to_string)) {
			Some(entry) => dispatch.dispatch(TodoMsg::Add(entry)),
			None => dispatch.dispatch(TodoMsg::Clear),
		}
	})?;
	Ok(vec![el(
		"ul",
		vec![on(EventType::Click, on_click)],
		vec![text(model.entries.join(","))],
	)])
}

#[tokio::test]
async fn test_reducer_dispatch_is_visible_on_next_render() {
	let (tx, mut updates) = mpsc::unbounded_channel();
	let handle = start_with(
		component(todos, Props::empty()),
		Arc::new(ChannelUpdater::new(tx)),
		None,
		seeded(15),
	);
	let first = match next_update(&mut updates).await {
		RenderedUpdate::Full(tree) => tree,
		RenderedUpdate::Patch(_) => panic!("first update must be a full tree"),
	};
	let handler = first_handler_id(&first).unwrap();

	handle
		.process_event_immediate(handler.clone(), Some(json!("milk")))
		.await
		.unwrap();
	next_update(&mut updates).await;
	handle
		.process_event_immediate(handler.clone(), Some(json!("eggs")))
		.await
		.unwrap();
	next_update(&mut updates).await;

	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("milk,eggs".to_string()));

	handle.process_event_immediate(handler, None).await.unwrap();
	next_update(&mut updates).await;
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("".to_string()));
	handle.stop();
}

// ============================================================================
// Memo and callback
// ============================================================================

static MEMO_COMPUTES: AtomicUsize = AtomicUsize::new(0);
static SEEN_CALLBACKS: Mutex<Vec<Callback<u32, u32>>> = Mutex::new(Vec::new());

fn memoized(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let (count, set_count) = use_state(ctx, 0u32)?;
	let label = use_memo(
		ctx,
		|| {
			MEMO_COMPUTES.fetch_add(1, Ordering::SeqCst);
			format!("bucket {}", count / 2)
		},
		Trigger::WithDeps(deps![count / 2]),
	)?;
	let successor = use_callback(ctx, Callback::new(|x: u32| x + 1), Trigger::WithDeps(deps![]))?;
	SEEN_CALLBACKS.lock().push(successor);
	let on_click = use_handler(ctx, move |_payload| {
		set_count.set(count + 1);
	})?;
	Ok(vec![el(
		"div",
		vec![on(EventType::Click, on_click)],
		vec![text(label)],
	)])
}

#[tokio::test]
async fn test_memo_recomputes_only_on_deps_change() {
	MEMO_COMPUTES.store(0, Ordering::SeqCst);
	SEEN_CALLBACKS.lock().clear();

	let handle = start_with(
		component(memoized, Props::empty()),
		Arc::new(NoopUpdater),
		None,
		seeded(17).no_render_on_start(),
	);
	let tree = handle.reconcile_immediate().await.unwrap();
	assert_eq!(first_text(&tree), Some("bucket 0".to_string()));
	assert_eq!(MEMO_COMPUTES.load(Ordering::SeqCst), 1);

	// count 0 -> 1: count / 2 unchanged, the memo is reused.
	let handler = first_handler_id(&tree).unwrap();
	handle
		.process_event_immediate(handler.clone(), None)
		.await
		.unwrap();
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("bucket 0".to_string()));
	assert_eq!(MEMO_COMPUTES.load(Ordering::SeqCst), 1);

	// count 1 -> 2: deps change, the memo recomputes.
	handle.process_event_immediate(handler, None).await.unwrap();
	let tree = handle.get_reconciled().await.unwrap().unwrap();
	assert_eq!(first_text(&tree), Some("bucket 1".to_string()));
	assert_eq!(MEMO_COMPUTES.load(Ordering::SeqCst), 2);

	// Empty deps behave like OnMount: one callback instance across renders.
	let callbacks = SEEN_CALLBACKS.lock();
	assert!(callbacks.len() >= 3);
	assert!(callbacks.iter().all(|cb| cb.same_fn(&callbacks[0])));
	assert_eq!(callbacks[0].call(1), 2);
	handle.stop();
}

// ============================================================================
// Client hooks
// ============================================================================

#[derive(Default)]
struct RecordingDispatcher {
	events: Mutex<Vec<(Cuid, String, Option<Value>)>>,
}

impl ClientDispatcher for RecordingDispatcher {
	fn dispatch(
		&self,
		hook_id: &Cuid,
		event: &str,
		payload: Option<&Value>,
	) -> Result<(), UpdaterError> {
		self.events
			.lock()
			.push((hook_id.clone(), event.to_string(), payload.cloned()));
		Ok(())
	}
}

static CHART_EVENTS: AtomicUsize = AtomicUsize::new(0);

fn charting(ctx: &mut Context, _props: &Props) -> Result<Vec<Element>, RenderError> {
	let on_event: ClientEventFn = Arc::new(|event, _payload, reply| {
		CHART_EVENTS.fetch_add(1, Ordering::SeqCst);
		if event == "ping" {
			let _ = reply.dispatch(&CuidSource::seeded(0).next(), "pong", None);
		}
	});
	let chart = use_client(ctx, "Chart", Some(on_event))?;
	Ok(vec![el("canvas", vec![chart.attribute()], vec![])])
}

#[tokio::test]
async fn test_client_hook_round_trip() {
	use pinion::tree::ReconciledAttribute;

	CHART_EVENTS.store(0, Ordering::SeqCst);
	let handle = start_with(
		component(charting, Props::empty()),
		Arc::new(NoopUpdater),
		None,
		seeded(16).no_render_on_start(),
	);
	let tree = handle.reconcile_immediate().await.unwrap();

	let mut hook_id = None;
	if let Reconciled::Component(root) = &tree {
		if let Reconciled::Element(canvas) = &*root.child {
			for attribute in &canvas.attributes {
				if let ReconciledAttribute::ClientHook { id, name } = attribute {
					assert_eq!(name, "Chart");
					hook_id = Some(id.clone());
				}
			}
		}
	}
	let hook_id = hook_id.expect("canvas carries the client hook attribute");

	let reply = Arc::new(RecordingDispatcher::default());
	handle.process_client_hook(hook_id.clone(), "ping", Some(json!({"x": 1})), reply.clone());

	// Route through the actor, then observe the listener's side effects.
	handle.get_reconciled().await.unwrap();
	assert_eq!(CHART_EVENTS.load(Ordering::SeqCst), 1);
	assert_eq!(reply.events.lock().len(), 1);
	assert_eq!(reply.events.lock()[0].1, "pong");

	// Immediate dispatch reports misses instead of logging them.
	let bogus = CuidSource::seeded(998).next();
	let error = handle
		.process_client_hook_immediate(bogus, "ping", None, reply.clone())
		.await
		.unwrap_err();
	assert!(matches!(
		error,
		RuntimeError::Event(EventError::UnknownClientHook(_))
	));
	assert_eq!(CHART_EVENTS.load(Ordering::SeqCst), 1);

	handle
		.process_client_hook_immediate(hook_id, "ping", None, reply.clone())
		.await
		.unwrap();
	assert_eq!(CHART_EVENTS.load(Ordering::SeqCst), 2);
	assert_eq!(reply.events.lock().len(), 2);
	handle.stop();
}
