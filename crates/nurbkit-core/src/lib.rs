pub mod error;
pub mod tolerance;
pub mod traits;

pub use error::{KernelError, Result};
pub use tolerance::Tolerance;

/// Version string reported by the kernel.
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");
