use std::sync::Arc;

use crate::arena::PieceArena;
use crate::model::Model;

use super::{load_model, ImportError};

mod hierarchy_test;
mod skinned_test;

/// Helper: load bytes against a fresh arena.
fn load(name: &str, data: &[u8]) -> Result<Model, ImportError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let arena = Arc::new(PieceArena::with_capacity(64));
    load_model(name, data, &arena)
}
