// src/math/mod.rs
pub mod error;
pub mod types;
pub mod utils;
pub mod voronoi;

// Re-exports für einfache Verwendung
pub use error::{VoronoiError, VoronoiResult};
pub use types::*;

// Öffentliche API
pub mod prelude {
    pub use super::{
        error::{VoronoiError, VoronoiResult},
        types::*,
        voronoi::{
            BuildStats, Cell, CellId, Edge, EdgeId, HalfEdge, PointLocation, Site, Vertex,
            VertexId, VoronoiBuilder, VoronoiConfig, VoronoiDiagram, build,
        },
    };
}
