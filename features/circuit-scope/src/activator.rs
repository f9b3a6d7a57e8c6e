use std::{marker::PhantomData, sync::Arc};

use circuit_di::{DiContainer, Injectable, Scope};

use crate::{bridge::SessionBridge, errors::ScopeCreationError, holder::ScopeHolder};

/// Establishes or re-activates the scope of a session
///
/// The first activation for a [ScopeHolder] starts a new scope, binds it and captures the
/// session resource in the scope's [SessionBridge]. Every later activation returns the bound
/// scope again. Re-activation is idempotent and always safe, it is done on every re-entry.
/// Once the session ended, activation fails with [ScopeCreationError::SessionEnded].
pub struct ScopeActivator<R> {
    container: DiContainer,
    _resource: PhantomData<fn(R)>,
}
impl<R> Clone for ScopeActivator<R> {
    fn clone(&self) -> Self {
        ScopeActivator {
            container: self.container.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Injectable> ScopeActivator<R> {
    pub fn new(container: DiContainer) -> Self {
        ScopeActivator {
            container,
            _resource: PhantomData,
        }
    }

    pub fn container(&self) -> &DiContainer {
        &self.container
    }

    /// Returns the session scope, starting it on first use
    ///
    /// Run work inside the returned scope with [Scope::enter] / [Scope::scoped]
    /// to make it the ambient current scope.
    pub fn activate(
        &self,
        holder: &ScopeHolder,
        resource: &Arc<R>,
    ) -> Result<Scope, ScopeCreationError> {
        let scope = holder.get_or_try_bind(|| {
            let scope = self.container.begin_scope()?;
            if let Err(e) = Self::capture(&scope, resource) {
                // Leave no half initialized session behind
                let _ = scope.dispose();
                tracing::error!(scope = %scope.id(), "Session scope could not be established: {e}");
                return Err(e);
            }

            tracing::debug!(scope = %scope.id(), "Established session scope");
            Ok(scope)
        })?;

        scope.ok_or_else(|| {
            tracing::warn!("Activation of an ended session refused");
            ScopeCreationError::SessionEnded
        })
    }

    /// Activates the session scope and runs `f` inside of it
    pub fn run<T>(
        &self,
        holder: &ScopeHolder,
        resource: &Arc<R>,
        f: impl FnOnce(&Scope) -> T,
    ) -> Result<T, ScopeCreationError> {
        let scope = self.activate(holder, resource)?;
        Ok(scope.enter(|| f(&scope)))
    }

    fn capture(scope: &Scope, resource: &Arc<R>) -> Result<(), ScopeCreationError> {
        scope
            .require::<SessionBridge<R>>()?
            .capture(resource.clone())?;
        Ok(())
    }
}
