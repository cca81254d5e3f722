//! Refresh-cycle admission control: the in-progress flag, the pending waiter queue, and the
//! signed-out latch.

// self
use crate::{_prelude::*, auth::AccessToken, error::AuthError};

/// Result broadcast to every caller parked on one refresh cycle.
#[derive(Clone, Debug)]
pub(crate) enum CycleOutcome {
	/// Refresh succeeded; retry with this token.
	Refreshed(AccessToken),
	/// Refresh failed; surface this terminal error.
	Failed(AuthError),
}

/// Deferred result handle fulfilled when the active cycle settles.
pub(crate) type WaiterCell = Arc<AsyncOnceCell<CycleOutcome>>;

/// How a 401 observer enters the current refresh cycle.
pub(crate) enum Admission {
	/// First observer; must run the refresh call and settle the cycle.
	Leader,
	/// A refresh is already in flight; await the cell instead of starting another.
	Waiter(WaiterCell),
}

/// Owned per-relay coordination state for refresh cycles.
///
/// The mutex is never held across an await point: admission and settlement are synchronous,
/// and waiting happens on the per-caller cells. The queue exists only while a cycle is in
/// flight and is drained unconditionally when it settles.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
	refreshing: bool,
	signed_out: bool,
	waiters: Vec<WaiterCell>,
}

impl RefreshGate {
	/// Admits a 401 observer: the first becomes the leader, the rest enqueue in arrival order.
	pub fn admit(&self) -> Admission {
		let mut state = self.state.lock();

		if state.refreshing {
			let cell = WaiterCell::default();

			state.waiters.push(cell.clone());

			Admission::Waiter(cell)
		} else {
			state.refreshing = true;

			Admission::Leader
		}
	}

	/// Settles the active cycle: resets the flag and fulfills every queued cell in arrival
	/// order. Returns the number of waiters released.
	pub fn settle(&self, outcome: CycleOutcome) -> usize {
		let drained = {
			let mut state = self.state.lock();

			state.refreshing = false;

			std::mem::take(&mut state.waiters)
		};
		let released = drained.len();

		for cell in drained {
			let _ = cell.set_blocking(outcome.clone());
		}

		released
	}

	/// Latches the signed-out state. Returns `true` when this call performed the transition,
	/// `false` when the latch was already set.
	pub fn latch_signed_out(&self) -> bool {
		let mut state = self.state.lock();
		let transitioned = !state.signed_out;

		state.signed_out = true;

		transitioned
	}

	/// Lifts the signed-out latch after a successful sign-in.
	pub fn lift_signed_out(&self) {
		self.state.lock().signed_out = false;
	}

	/// Returns `true` while the session is latched signed out.
	pub fn is_signed_out(&self) -> bool {
		self.state.lock().signed_out
	}

	#[cfg(test)]
	pub fn waiter_count(&self) -> usize {
		self.state.lock().waiters.len()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn first_observer_leads_and_the_rest_enqueue() {
		let gate = RefreshGate::default();

		assert!(matches!(gate.admit(), Admission::Leader));
		assert!(matches!(gate.admit(), Admission::Waiter(_)));
		assert!(matches!(gate.admit(), Admission::Waiter(_)));
		assert_eq!(gate.waiter_count(), 2);

		let released = gate.settle(CycleOutcome::Refreshed(AccessToken::new("token-next")));

		assert_eq!(released, 2);
		assert_eq!(gate.waiter_count(), 0);
		// The flag resets with the queue, so the next observer leads a fresh cycle.
		assert!(matches!(gate.admit(), Admission::Leader));
	}

	#[tokio::test]
	async fn settled_cells_carry_the_shared_outcome() {
		let gate = RefreshGate::default();

		assert!(matches!(gate.admit(), Admission::Leader));

		let cell = match gate.admit() {
			Admission::Waiter(cell) => cell,
			Admission::Leader => panic!("Second observer must not lead while a cycle is active."),
		};

		gate.settle(CycleOutcome::Failed(AuthError::RetryExhausted));

		match cell.wait().await {
			CycleOutcome::Failed(error) => assert_eq!(*error, AuthError::RetryExhausted),
			CycleOutcome::Refreshed(_) => panic!("Failed cycle must not hand out a token."),
		}
	}

	#[tokio::test]
	async fn waiters_are_fulfilled_in_arrival_order() {
		let gate = Arc::new(RefreshGate::default());

		assert!(matches!(gate.admit(), Admission::Leader));

		let order = Arc::new(Mutex::new(Vec::new()));
		let mut handles = Vec::new();

		for index in 0..3_usize {
			let cell = match gate.admit() {
				Admission::Waiter(cell) => cell,
				Admission::Leader => panic!("Observers must enqueue while a cycle is active."),
			};
			let order = order.clone();

			handles.push(tokio::spawn(async move {
				cell.wait().await;

				order.lock().push(index);
			}));
		}

		// Let every waiter park on its cell before settling.
		for _ in 0..5 {
			tokio::task::yield_now().await;
		}

		gate.settle(CycleOutcome::Refreshed(AccessToken::new("token-ordered")));

		for handle in handles {
			handle.await.expect("Waiter task should complete after settlement.");
		}

		assert_eq!(*order.lock(), vec![0, 1, 2]);
	}

	#[test]
	fn signed_out_latch_transitions_once() {
		let gate = RefreshGate::default();

		assert!(!gate.is_signed_out());
		assert!(gate.latch_signed_out());
		assert!(!gate.latch_signed_out());
		assert!(gate.is_signed_out());

		gate.lift_signed_out();

		assert!(!gate.is_signed_out());
		assert!(gate.latch_signed_out());
	}
}
