//! Host-platform primitives the bootstrap classes sit on top of
//! (`System.currentTimeMillis`, `Thread.sleep`, environment lookup): kept in
//! one place so the rest of the runtime never reaches for `std::env`,
//! `std::time`, or `std::thread::sleep` directly (§5.e, §9).

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, per `System.currentTimeMillis`.
pub(crate) fn current_time_millis() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Nanosecond counter with no defined epoch, per `System.nanoTime` — only
/// ever meaningful as a difference between two calls.
pub(crate) fn nano_time() -> i64 {
	static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
	let start = START.get_or_init(std::time::Instant::now);
	start.elapsed().as_nanos() as i64
}

pub(crate) fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok()
}

pub(crate) fn user_home() -> Option<PathBuf> {
	env_var("HOME").or_else(|| env_var("USERPROFILE")).map(PathBuf::from)
}

/// Blocks the calling (guest) thread, per `Thread.sleep`. A zero or
/// negative duration is a no-op, matching the real method's contract.
pub(crate) fn sleep(duration: Duration) {
	if !duration.is_zero() {
		std::thread::sleep(duration);
	}
}

/// Spawns a genuine OS thread for a guest `Thread.start()`. The closure is
/// responsible for registering itself with `ThreadList` on entry (through
/// `Runtime::current_thread`) and unregistering on exit.
pub(crate) fn spawn_thread(name: String, f: impl FnOnce() + Send + 'static) -> std::io::Result<std::thread::JoinHandle<()>> {
	std::thread::Builder::new().name(name).spawn(f)
}
