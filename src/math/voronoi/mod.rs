// src/math/voronoi/mod.rs

//! Fortunes Sweep-Line-Verfahren für planare Voronoi-Diagramme.
//!
//! Ablauf: [`builder`] arbeitet Site- und Circle-Events ab und pflegt dabei den
//! [`beach_line`]; [`clipping`] beschneidet das Ergebnis auf die Bounding Box
//! und schließt die Randzellen.

pub mod beach_line;
pub mod builder;
pub mod clipping;
pub mod config;
pub mod diagram;
pub mod events;

pub use beach_line::{ArcHandle, ArcLocation, BeachLine, BeachSection, InsertionKind};
pub use builder::{VoronoiBuilder, build};
pub use config::VoronoiConfig;
pub use diagram::{
    BuildStats, Cell, CellId, Edge, EdgeId, HalfEdge, PointLocation, Site, Vertex, VertexId,
    VoronoiDiagram,
};
pub use events::{CircleEvent, SiteEvent, try_compute_circle_event};
