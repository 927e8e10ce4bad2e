use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{Throwable, VmResult};

struct MonitorState {
	/// Native thread id of the current owner, and how many times it has
	/// re-entered (recursive-mutex semantics, §4.6 "monitorenter/exit").
	owner: Option<std::thread::ThreadId>,
	depth: u32,
}

/// One per-object (or per-class, for `synchronized static`) monitor. Wraps a
/// plain `Mutex`/`Condvar` pair the way a recursive lock is usually built on
/// top of a non-recursive one: the mutex guards `MonitorState`, and
/// `enter`/`exit` do the re-entrancy bookkeeping themselves rather than
/// relying on a recursive OS mutex.
pub(crate) struct Monitor {
	state: Mutex<MonitorState>,
	cv: Condvar,
}

impl Monitor {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(MonitorState { owner: None, depth: 0 }),
			cv: Condvar::new(),
		}
	}

	/// Blocks until this thread owns the monitor, incrementing `depth` on
	/// reentry.
	pub(crate) fn enter(&self) {
		let me = std::thread::current().id();
		let mut state = self.state.lock().unwrap();
		loop {
			match state.owner {
				Some(owner) if owner == me => {
					state.depth += 1;
					return;
				}
				None => {
					state.owner = Some(me);
					state.depth = 1;
					return;
				}
				Some(_) => state = self.cv.wait(state).unwrap(),
			}
		}
	}

	/// Releases one level of ownership; the monitor is actually freed, and
	/// waiters notified, only once `depth` reaches zero. Returns
	/// `IllegalMonitorState` if the calling thread does not hold it (§7).
	pub(crate) fn exit(&self) -> VmResult<()> {
		let me = std::thread::current().id();
		let mut state = self.state.lock().unwrap();
		if state.owner != Some(me) {
			return Err(Throwable::IllegalMonitorState);
		}
		state.depth -= 1;
		if state.depth == 0 {
			state.owner = None;
			self.cv.notify_all();
		}
		Ok(())
	}

	pub(crate) fn is_held_by_current(&self) -> bool {
		self.state.lock().unwrap().owner == Some(std::thread::current().id())
	}

	/// `Object.wait(timeout)`: releases the monitor at its current depth,
	/// blocks (bounded if `timeout` is `Some`), then reacquires it at the
	/// same depth before returning (§4.6, §9 resolves this to a real
	/// `Condvar::wait_timeout`, not a busy poll).
	pub(crate) fn wait(&self, timeout: Option<Duration>) -> VmResult<()> {
		let me = std::thread::current().id();
		let mut state = self.state.lock().unwrap();
		if state.owner != Some(me) {
			return Err(Throwable::IllegalMonitorState);
		}
		let saved_depth = state.depth;
		state.owner = None;
		state.depth = 0;
		self.cv.notify_all();

		state = match timeout {
			Some(duration) => self.cv.wait_timeout(state, duration).unwrap().0,
			None => self.cv.wait(state).unwrap(),
		};

		while state.owner.is_some() && state.owner != Some(me) {
			state = self.cv.wait(state).unwrap();
		}
		state.owner = Some(me);
		state.depth = saved_depth;
		Ok(())
	}

	pub(crate) fn notify_one(&self) -> VmResult<()> {
		let state = self.state.lock().unwrap();
		if state.owner != Some(std::thread::current().id()) {
			return Err(Throwable::IllegalMonitorState);
		}
		drop(state);
		self.cv.notify_one();
		Ok(())
	}

	pub(crate) fn notify_all(&self) -> VmResult<()> {
		let state = self.state.lock().unwrap();
		if state.owner != Some(std::thread::current().id()) {
			return Err(Throwable::IllegalMonitorState);
		}
		drop(state);
		self.cv.notify_all();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reentrant_enter_exit_balances() {
		let monitor = Monitor::new();
		monitor.enter();
		monitor.enter();
		assert!(monitor.is_held_by_current());
		monitor.exit().unwrap();
		assert!(monitor.is_held_by_current());
		monitor.exit().unwrap();
		assert!(!monitor.is_held_by_current());
	}

	#[test]
	fn exit_without_owning_is_illegal_monitor_state() {
		let monitor = Monitor::new();
		assert!(matches!(monitor.exit(), Err(Throwable::IllegalMonitorState)));
	}

	/// A genuine cross-thread wait/notify hand-off: the waiter enters and
	/// calls `wait`, which must release the monitor so the notifier (a real
	/// second OS thread, not a same-thread simulation) can acquire it, flip
	/// the shared flag, and wake the waiter back up.
	#[test]
	fn wait_releases_monitor_for_a_real_notifying_thread() {
		let monitor = std::sync::Arc::new(Monitor::new());
		let ready = std::sync::Arc::new((Mutex::new(false), Condvar::new()));

		let waiter_monitor = monitor.clone();
		let waiter_ready = ready.clone();
		let waiter = std::thread::spawn(move || {
			waiter_monitor.enter();
			{
				let mut started = waiter_ready.0.lock().unwrap();
				*started = true;
				waiter_ready.1.notify_one();
			}
			waiter_monitor.wait(None).unwrap();
			assert!(waiter_monitor.is_held_by_current());
			waiter_monitor.exit().unwrap();
		});

		{
			let (lock, cv) = &*ready;
			let mut started = lock.lock().unwrap();
			while !*started {
				started = cv.wait(started).unwrap();
			}
		}
		// `wait` drops the lock before blocking, but there is no signal for
		// exactly that moment; a short, generous sleep is the same
		// trade-off `Object.wait` itself makes against a busy poll.
		std::thread::sleep(Duration::from_millis(50));

		monitor.enter();
		monitor.notify_all().unwrap();
		monitor.exit().unwrap();

		waiter.join().unwrap();
	}
}
