//! Binding engine: attribute parsing, scope resolution, contexts, handlers
//! and the template cache.

pub mod context;
pub mod engine;
pub mod guard;
pub mod handlers;
pub mod parser;
pub mod rebind;
pub mod registry;
pub mod scope_registry;
pub mod scope_resolver;
pub mod template_cache;

pub use context::{BindingContext, HandlerState};
pub use engine::BindingEngine;
pub use guard::{Direction, GuardToken, UpdateGuard};
pub use handlers::{BindingHandler, Change, HandlerTraits, WriteBack};
pub use parser::{BindingProperties, BindingValue, ParsedBinding};
pub use scope_registry::ScopeRegistry;
pub use scope_resolver::{resolve_path, DependencyTree, ResolvedPath};
