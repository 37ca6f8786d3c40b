pub mod adaptive;
pub mod mesh;
pub mod options;
mod weld;

pub use adaptive::{tessellate, tessellate_with};
pub use mesh::Mesh;
pub use options::TessellationOptions;
