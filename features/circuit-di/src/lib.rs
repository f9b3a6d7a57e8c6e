//! Dependency injection container with singleton, scoped and transient lifestyles
//!
//! The container is used in three steps:
//! 1. Register instances and factories on a [DiBuilder]
//! 2. Build it - this verifies the [DependencyGraph] and constructs all singletons
//! 3. Start a [Scope] per unit of work and resolve scoped / transient types from it
//!
//! A scope can be made the ambient current scope of an execution context with
//! [Scope::enter] or [Scope::scoped], [DiContainer::resolve] and [current_scope] observe it.
//!
//! ```rust
//! use circuit_di::{DiBuilder, DynError, Scope};
//!
//! struct Connection(u32);
//!
//! let container = futures::executor::block_on(
//!     DiBuilder::new()
//!         .add_instance(42_u32)
//!         .add_scoped_fn(vec![], |scope: &Scope| {
//!             Ok::<_, DynError>(Connection(*scope.require::<u32>()?))
//!         })
//!         .build(),
//! )
//! .unwrap();
//!
//! let scope = container.begin_scope().unwrap();
//! let connection = scope.enter(|| container.resolve::<Connection>()).unwrap();
//! assert_eq!(connection.0, 42);
//! ```

pub mod ambient;
pub mod builder;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
pub mod initiator;
pub mod resolver;
pub mod scope;
pub mod types;

pub use ambient::{current_scope, InScope};
pub use builder::DiBuilder;
pub use container::DiContainer;
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{InitError, InjectError, RequireError, ScopeError};
pub use factories::{InstanceFactory, ScopedFactory};
pub use initiator::DiHandle;
pub use resolver::Resolver;
pub use scope::{Scope, ScopeId, WeakScope};
pub use types::{DependencyInfo, DynError, Injectable, Lifestyle, TypeInfo};
