use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// Polls a future once without registering for wakeups.
///
/// For non-blocking completion checks from a frame callback; a pending
/// future must be polled again later.
pub fn poll_once<F: Future + Unpin>(fut: &mut F) -> Option<F::Output> {
	let mut cx = Context::from_waker(Waker::noop());
	match Pin::new(fut).poll(&mut cx) {
		Poll::Ready(out) => Some(out),
		Poll::Pending => None,
	}
}

#[cfg(test)]
mod tests {
	use std::future::{pending, ready};

	use super::*;

	#[test]
	fn ready_future_yields_its_output() {
		assert_eq!(poll_once(&mut ready(7)), Some(7));
	}

	#[test]
	fn pending_future_yields_nothing() {
		assert_eq!(poll_once(&mut pending::<u8>()), None);
	}
}
