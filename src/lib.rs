//! Planar Voronoi-Diagramme nach Fortunes Sweep-Line-Verfahren.
//!
//! Einstiegspunkt ist [`math::voronoi::build`] bzw. der konfigurierbare
//! [`math::voronoi::VoronoiBuilder`]. Das Ergebnis ist ein
//! [`math::voronoi::VoronoiDiagram`], dessen Zellen auf eine Bounding Box
//! geclippt und geschlossen sind.

pub mod math;

pub use math::prelude;
