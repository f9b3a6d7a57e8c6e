use std::sync::{Mutex, MutexGuard, PoisonError};

use circuit_di::Scope;

/// Single slot holding the scope of one session
///
/// Once bound, the scope is kept for the whole life of the session. It is never replaced,
/// only taken out again when the session ends. A holder that was taken is closed for good.
#[derive(Debug, Default)]
pub struct ScopeHolder {
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    scope: Option<Scope>,
    closed: bool,
}

impl ScopeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound scope, if any
    pub fn get(&self) -> Option<Scope> {
        self.slot().scope.clone()
    }

    /// Binds the scope if the holder is empty and open
    ///
    /// Returns false and keeps the existing scope if one is already bound.
    pub fn bind(&self, scope: Scope) -> bool {
        let mut slot = self.slot();
        if slot.closed || slot.scope.is_some() {
            return false;
        }
        slot.scope = Some(scope);
        true
    }

    /// True once the session was torn down
    pub fn is_closed(&self) -> bool {
        self.slot().closed
    }

    /// Returns the bound scope, or binds the one built by `create`
    ///
    /// The holder stays locked while `create` runs, so concurrent callers only ever see a fully
    /// established scope. Returns `Ok(None)` if the holder is closed.
    pub(crate) fn get_or_try_bind<E>(
        &self,
        create: impl FnOnce() -> Result<Scope, E>,
    ) -> Result<Option<Scope>, E> {
        let mut slot = self.slot();
        if slot.closed {
            return Ok(None);
        }
        if let Some(scope) = &slot.scope {
            return Ok(Some(scope.clone()));
        }

        let scope = create()?;
        slot.scope = Some(scope.clone());
        Ok(Some(scope))
    }

    /// Clears and closes the holder at session teardown
    pub(crate) fn take(&self) -> Option<Scope> {
        let mut slot = self.slot();
        slot.closed = true;
        slot.scope.take()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use circuit_di::{DiBuilder, DiContainer};

    use super::*;

    fn container() -> DiContainer {
        futures::executor::block_on(DiBuilder::new().build()).unwrap()
    }

    #[test]
    fn bind_keeps_the_first_scope() {
        let container = container();
        let first = container.begin_scope().unwrap();
        let second = container.begin_scope().unwrap();
        let holder = ScopeHolder::new();

        assert!(holder.get().is_none());
        assert!(holder.bind(first.clone()));
        assert!(!holder.bind(second));
        assert_eq!(holder.get(), Some(first.clone()));

        assert_eq!(holder.take(), Some(first));
        assert!(holder.get().is_none());
    }

    #[test]
    fn taken_holder_stays_closed() {
        let container = container();
        let holder = ScopeHolder::new();
        holder.bind(container.begin_scope().unwrap());
        holder.take();

        assert!(holder.is_closed());
        assert!(!holder.bind(container.begin_scope().unwrap()));
        let rebound = holder
            .get_or_try_bind(|| container.begin_scope())
            .unwrap();
        assert!(rebound.is_none());
        assert!(holder.get().is_none());
        assert_eq!(container.scopes_created(), 2);
    }

    #[test]
    fn failed_creation_leaves_the_holder_empty() {
        let holder = ScopeHolder::new();

        let result = holder.get_or_try_bind(|| Err::<Scope, _>("no scope"));

        assert_eq!(result.unwrap_err(), "no scope");
        assert!(holder.get().is_none());
        assert!(!holder.is_closed());
    }
}
