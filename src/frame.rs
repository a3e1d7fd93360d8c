/// Owned handle to work scheduled for the next UI frame.
///
/// At most one payload is pending. Scheduling again replaces the previous payload, so a
/// loop can never be doubled up, and dropping the handle cancels whatever was pending.
#[derive(Debug)]
pub struct FrameTask<T> {
	pending: Option<T>,
}

impl<T> FrameTask<T> {
	pub fn idle() -> FrameTask<T> {
		FrameTask { pending: None }
	}

	/// Returns true if an earlier payload was superseded.
	pub fn schedule(&mut self, payload: T) -> bool {
		self.pending.replace(payload).is_some()
	}

	/// Returns true if something was actually cancelled.
	pub fn cancel(&mut self) -> bool {
		self.pending.take().is_some()
	}

	pub fn is_scheduled(&self) -> bool {
		self.pending.is_some()
	}

	pub fn pending(&self) -> Option<&T> {
		self.pending.as_ref()
	}
}

impl<T> Default for FrameTask<T> {
	fn default() -> Self {
		FrameTask::idle()
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schedule_replaces_pending() {
		let mut task = FrameTask::idle();
		assert!(!task.schedule(1));
		assert!(task.schedule(2));
		assert_eq!(task.pending(), Some(&2));
	}

	#[test]
	fn cancel_reports_whether_anything_was_pending() {
		let mut task = FrameTask::idle();
		assert!(!task.cancel());

		task.schedule(());
		assert!(task.is_scheduled());
		assert!(task.cancel());
		assert!(!task.is_scheduled());
	}
}
