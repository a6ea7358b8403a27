//! Transactional record store seam
//!
//! Services read and write records only through a [`Transaction`] obtained
//! from a [`RecordStore`]. A unit of work either commits as a whole or is
//! dropped and leaves nothing behind.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, Records};
pub use traits::{RecordStore, Transaction};
