// Response cache with TTL semantics.
// One manager per process routes get/set/delete to an in-process store or an
// external shared store, with one-way degradation to in-process on failure.

pub mod local;
pub mod manager;
pub mod shared;

pub use local::LocalStore;
pub use manager::{BackendKind, CacheManager};
pub use shared::SharedStore;
