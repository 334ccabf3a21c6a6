//! Hooks deciding where completion callbacks run.

// crates.io
use tokio::runtime::Handle;
// self
use crate::_prelude::*;

/// Deferred callback invocation handed to a [`ResultDelivery`].
pub type Delivery = Box<dyn FnOnce() + Send>;

/// Runs completion callbacks on the context the caller can act on results from.
///
/// Implementations must run every delivery exactly once.
pub trait ResultDelivery
where
	Self: 'static + Send + Sync,
{
	/// Runs `delivery` on the target context.
	fn deliver(&self, delivery: Delivery);
}

/// Runs callbacks directly on the worker that finished the network phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDelivery;
impl ResultDelivery for InlineDelivery {
	fn deliver(&self, delivery: Delivery) {
		delivery();
	}
}

/// Runs callbacks as blocking tasks on a designated Tokio runtime.
#[derive(Clone, Debug)]
pub struct RuntimeDelivery(Handle);
impl RuntimeDelivery {
	/// Delivers onto the runtime behind `handle`.
	pub fn new(handle: Handle) -> Self {
		Self(handle)
	}

	/// Delivers onto the runtime the caller is running in, if any.
	pub fn current() -> Option<Self> {
		Handle::try_current().ok().map(Self)
	}
}
impl ResultDelivery for RuntimeDelivery {
	fn deliver(&self, delivery: Delivery) {
		drop(self.0.spawn_blocking(delivery));
	}
}
impl<D> ResultDelivery for Arc<D>
where
	D: ?Sized + ResultDelivery,
{
	fn deliver(&self, delivery: Delivery) {
		(**self).deliver(delivery);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn inline_delivery_runs_immediately() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();

		InlineDelivery.deliver(Box::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		}));

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn runtime_delivery_runs_on_runtime() {
		let (tx, rx) = tokio::sync::oneshot::channel();
		let delivery = RuntimeDelivery::current().expect("Test runs inside a runtime.");

		delivery.deliver(Box::new(move || {
			let _ = tx.send(Handle::try_current().is_ok());
		}));

		assert!(rx.await.expect("Delivery should run exactly once."));
	}
}
