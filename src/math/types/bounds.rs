// src/math/types/bounds.rs

use crate::math::{error::*, types::*};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D Bounding Box (Axis-Aligned Bounding Box)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    pub min: Point2D,
    pub max: Point2D,
}

impl Bounds2D {
    /// Erstellt eine neue Bounding Box
    pub fn new(min: Point2D, max: Point2D) -> VoronoiResult<Self> {
        if min.x > max.x || min.y > max.y {
            return Err(VoronoiError::InvalidBounds {
                message: format!("min {:?} > max {:?}", min, max),
            });
        }

        Ok(Self { min, max })
    }

    /// Erstellt eine Bounding Box aus den Kanten `[min_x, max_x] × [min_y, max_y]`
    pub fn from_extents(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> VoronoiResult<Self> {
        Self::new(Point2D::new(min_x, min_y), Point2D::new(max_x, max_y))
    }

    /// Erstellt eine Bounding Box aus zwei beliebigen Punkten
    pub fn from_points(p1: Point2D, p2: Point2D) -> Self {
        Self {
            min: p1.min(p2),
            max: p1.max(p2),
        }
    }

    /// Erstellt eine Bounding Box die alle Punkte umschließt
    pub fn from_points_iter<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2D>,
    {
        let mut points_iter = points.into_iter();
        let first_point = points_iter.next()?;

        let mut bounds = Self {
            min: first_point,
            max: first_point,
        };
        for point in points_iter {
            bounds.expand_to_include_point(point);
        }

        Some(bounds)
    }

    /// Prüft ob die Bounding Box leer ist
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Prüft, ob die Box als Clipping-Bereich für ein Diagramm taugt:
    /// endlich, nicht invertiert und mit positiver Breite und Höhe.
    pub fn validate_for_diagram(&self) -> VoronoiResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(VoronoiError::InvalidBounds {
                message: format!("non-finite coordinates in {}", self),
            });
        }
        if self.is_empty() {
            return Err(VoronoiError::InvalidBounds {
                message: format!("min {:?} exceeds max {:?}", self.min, self.max),
            });
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(VoronoiError::InvalidBounds {
                message: format!(
                    "degenerate box with width {} and height {}",
                    self.width(),
                    self.height()
                ),
            });
        }
        Ok(())
    }

    /// Breite der Bounding Box
    pub fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0)
    }

    /// Höhe der Bounding Box
    pub fn height(&self) -> f64 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn size(&self) -> Point2D {
        Point2D::new(self.width(), self.height())
    }

    pub fn center(&self) -> Point2D {
        (self.min + self.max) * 0.5
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// Prüft ob ein Punkt in der Bounding Box liegt (Rand eingeschlossen)
    pub fn contains_point(&self, point: Point2D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Wie [`contains_point`](Self::contains_point), aber mit Toleranz nach außen
    pub fn contains_point_eps(&self, point: Point2D, epsilon: f64) -> bool {
        point.x >= self.min.x - epsilon
            && point.x <= self.max.x + epsilon
            && point.y >= self.min.y - epsilon
            && point.y <= self.max.y + epsilon
    }

    /// Erweitert die Bounding Box um einen Punkt
    pub fn expand_to_include_point(&mut self, point: Point2D) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Erweitert die Bounding Box um einen Margin
    pub fn expand(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }

        Self {
            min: self.min - Point2D::splat(margin),
            max: self.max + Point2D::splat(margin),
        }
    }

    /// Berechnet den nächsten Punkt auf der Bounding Box zu einem gegebenen Punkt
    pub fn closest_point(&self, point: Point2D) -> Point2D {
        if self.is_empty() {
            return point;
        }
        point.clamp(self.min, self.max)
    }

    /// Die vier Eckpunkte in der Umlaufrichtung, in der Randzellen geschlossen werden:
    /// `(min.x, min.y) -> (min.x, max.y) -> (max.x, max.y) -> (max.x, min.y)`.
    /// Bei y nach oben ist das der Uhrzeigersinn.
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.min,
            Point2D::new(self.min.x, self.max.y),
            self.max,
            Point2D::new(self.max.x, self.min.y),
        ]
    }
}

impl fmt::Display for Bounds2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Bounds2D(empty)")
        } else {
            write!(f, "Bounds2D({:?} to {:?})", self.min, self.max)
        }
    }
}
