//! Process-unique, stringifiable identifiers for hooks and handlers.
//!
//! Every hook, event handler, and client hook carries a [`Cuid`] that stays
//! stable for as long as its owner lives. Ids combine a monotonic per-source
//! counter with a source fingerprint, so ids from distinct sources never
//! collide and ids from one source are strictly ordered.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Serialize, Serializer};

/// An opaque, process-unique identifier.
///
/// Cuids are cheap to clone and hash, and stringify for wire use via
/// [`std::fmt::Display`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cuid(Arc<str>);

impl Cuid {
	/// Returns the id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Cuid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for Cuid {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

struct SourceInner {
	fingerprint: String,
	counter: AtomicU64,
}

/// A generator of [`Cuid`]s.
///
/// Sources are cheaply cloneable handles onto a shared counter. The default
/// process-global source is shared by every runtime; tests that need
/// reproducible ids construct their own with [`CuidSource::seeded`].
#[derive(Clone)]
pub struct CuidSource {
	inner: Arc<SourceInner>,
}

impl CuidSource {
	/// Creates a source with a random fingerprint.
	pub fn new() -> Self {
		let fingerprint = uuid::Uuid::new_v4().simple().to_string();
		Self::with_fingerprint(&fingerprint[..8])
	}

	/// Creates a source with a fingerprint derived from `seed`.
	///
	/// Two sources with the same seed produce the same id sequence.
	pub fn seeded(seed: u64) -> Self {
		Self::with_fingerprint(&base36(seed))
	}

	fn with_fingerprint(fingerprint: &str) -> Self {
		Self {
			inner: Arc::new(SourceInner {
				fingerprint: fingerprint.to_string(),
				counter: AtomicU64::new(0),
			}),
		}
	}

	/// Returns the shared process-global source.
	pub fn global() -> CuidSource {
		static GLOBAL: OnceLock<CuidSource> = OnceLock::new();
		GLOBAL.get_or_init(CuidSource::new).clone()
	}

	/// Produces the next id from this source.
	pub fn next(&self) -> Cuid {
		let n = self.inner.counter.fetch_add(1, Ordering::Relaxed);
		Cuid(format!("c{}{}", base36(n), self.inner.fingerprint).into())
	}
}

impl Default for CuidSource {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for CuidSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CuidSource")
			.field("fingerprint", &self.inner.fingerprint)
			.finish()
	}
}

fn base36(mut n: u64) -> String {
	const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
	if n == 0 {
		return "0".to_string();
	}
	let mut out = Vec::new();
	while n > 0 {
		out.push(DIGITS[(n % 36) as usize]);
		n /= 36;
	}
	out.reverse();
	// DIGITS is ASCII.
	String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_ids_are_unique() {
		let source = CuidSource::new();
		let ids: HashSet<Cuid> = (0..1000).map(|_| source.next()).collect();
		assert_eq!(ids.len(), 1000);
	}

	#[test]
	fn test_seeded_sources_are_deterministic() {
		let a = CuidSource::seeded(42);
		let b = CuidSource::seeded(42);
		for _ in 0..10 {
			assert_eq!(a.next(), b.next());
		}
	}

	#[test]
	fn test_distinct_fingerprints_never_collide() {
		let a = CuidSource::seeded(1);
		let b = CuidSource::seeded(2);
		assert_ne!(a.next(), b.next());
	}

	#[test]
	fn test_display_round_trips_as_str() {
		let id = CuidSource::seeded(7).next();
		assert_eq!(id.to_string(), id.as_str());
	}

	#[test]
	fn test_base36_encoding() {
		assert_eq!(base36(0), "0");
		assert_eq!(base36(35), "z");
		assert_eq!(base36(36), "10");
	}
}
