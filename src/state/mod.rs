// ============================================================================
// STATE MODULE - estado compartido con Rc<RefCell>
// ============================================================================

pub mod sync_state;

pub use sync_state::*;
