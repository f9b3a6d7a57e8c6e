//! The ambient current-scope indicator
//!
//! A thread local slot which is only ever populated for the duration of a closure
//! ([Scope::enter]) or of a single poll of a wrapped future ([Scope::scoped]).
//! The previous value is restored afterwards, so a future that suspends and later resumes
//! on another worker thread observes its own scope again on the next poll, and
//! unrelated tasks sharing that worker never see it.

use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use pin_project_lite::pin_project;

use crate::scope::Scope;

thread_local! {
    static CURRENT: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

/// Returns the scope active for the calling execution context, if any
pub fn current_scope() -> Option<Scope> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Restores the previously active scope when dropped - also on unwind
struct Restore(Option<Scope>);
impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

pub(crate) fn enter<R>(scope: &Scope, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(Some(scope.clone())));
    let _restore = Restore(previous);
    f()
}

pin_project! {
    /// Future which runs every poll of the inner future inside a [Scope]
    ///
    /// Created by [Scope::scoped]
    #[must_use = "futures do nothing unless polled"]
    pub struct InScope<F> {
        scope: Scope,
        #[pin]
        future: F,
    }
}
impl<F> InScope<F> {
    pub(crate) fn new(scope: Scope, future: F) -> Self {
        InScope { scope, future }
    }

    /// The scope this future runs in
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}
impl<F: Future> Future for InScope<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let future = this.future;
        enter(this.scope, || future.poll(cx))
    }
}
