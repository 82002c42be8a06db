//! meshload core library - mesh file loading, repair and export
//!
//! Reads Wavefront OBJ and STL (ASCII and binary) files into a pooled
//! [`MeshStore`], triangulates polygon faces by ear clipping and derives
//! smoothed per-vertex normals. The flat buffers of the store are meant to
//! be handed to a renderer as-is.

pub mod error;
pub mod format;
pub mod load;
pub mod normals;
pub mod obj;
pub mod options;
pub mod stl;
pub mod store;
pub mod tessellate;
pub mod write;

mod text;

// Re-export commonly used types
pub use error::{BufferKind, MeshError, MeshResult};
pub use format::{detect_format, MeshFormat};
pub use load::load_mesh;
pub use normals::{NormalMode, DEFAULT_TOLERANCE};
pub use options::{LoadOptions, NormalPolicy};
pub use store::{BoundingBox, MeshStore};
pub use tessellate::triangulate;
pub use write::write_mesh;
