use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use pin_project_lite::pin_project;

use super::{Task, TaskHandle};
use crate::subscription::Subscription;

pin_project! {
  /// Waits for `delay`, then runs the task unless its handle was cancelled
  /// in the meantime.
  pub(crate) struct CancellableTask<D> {
    #[pin]
    delay: D,
    task: Option<Task>,
    handle: TaskHandle,
  }
}

impl<D> CancellableTask<D> {
  pub(crate) fn new(delay: D, task: Task, handle: TaskHandle) -> Self {
    CancellableTask { delay, task: Some(task), handle }
  }
}

impl<D: Future> Future for CancellableTask<D> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let this = self.project();
    if this.handle.is_closed() {
      return Poll::Ready(());
    }
    if this.delay.poll(cx).is_pending() {
      return Poll::Pending;
    }
    if let Some(task) = this.task.take() {
      if !this.handle.is_closed() {
        task();
      }
    }
    this.handle.mark_finished();
    Poll::Ready(())
  }
}
