use std::sync::Arc;

use flowexec_core::api::ScriptRegistry;

use crate::arith::{AddUnit, DivideUnit};
use crate::fault::{ExitUnit, FailUnit};
use crate::text::{ConcatUnit, EchoUnit};
use crate::timing::SleepUnit;

/// The registry served by the packaged worker harness: every sample unit,
/// registered explicitly at startup.
pub fn sample_registry() -> ScriptRegistry {
    let mut registry = ScriptRegistry::new();
    registry.register(Arc::new(AddUnit));
    registry.register(Arc::new(DivideUnit));
    registry.register(Arc::new(ConcatUnit));
    registry.register(Arc::new(EchoUnit));
    registry.register(Arc::new(SleepUnit));
    registry.register(Arc::new(FailUnit));
    registry.register(Arc::new(ExitUnit));
    registry
}
