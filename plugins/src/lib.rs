//! Sample script units for flowexec. These are external collaborators of
//! the core — small demonstration plugins plus the units the integration
//! tests drive through real worker processes.

pub mod arith;
pub mod factory;
pub mod fault;
pub mod text;
pub mod timing;

pub use factory::sample_registry;
