pub use rowbind_core::*;
