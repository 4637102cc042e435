// src/math/types/mod.rs
pub mod bounds;
pub mod point;

pub use bounds::*;
pub use point::*;

// Re-export häufig verwendete externe Typen
pub use bevy::math::DVec2;

// Einheitlicher Punkttyp für das gesamte Modul (f64, damit die Prädikate stabil bleiben)
pub type Point2D = DVec2;
