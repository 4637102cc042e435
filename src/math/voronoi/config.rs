// src/math/voronoi/config.rs

use crate::math::{
    error::{VoronoiError, VoronoiResult},
    types::Bounds2D,
    utils::constants,
};

/// Konfiguration für den Aufbau eines Voronoi-Diagramms.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiConfig {
    /// Toleranz für Koordinatenvergleiche: Suche im Beach Line, Zusammenfassen
    /// gleichzeitiger Circle Events, Erkennen degenerierter Kanten und Schließen der Randzellen.
    /// Relativ zur größeren Ausdehnung der Bounding Box, siehe [`Self::scaled_epsilon`].
    pub epsilon: f64,
    /// Relative Schwelle für die Orientierungs-Determinante dreier Sites.
    pub collinearity_epsilon: f64,
    /// Unendliche und herausragende Kanten auf die Bounding Box beschneiden.
    pub clip_to_bounds: bool,
    /// Randzellen entlang der Bounding Box schließen (nur wirksam mit `clip_to_bounds`).
    pub close_cells: bool,
}

impl Default for VoronoiConfig {
    fn default() -> Self {
        Self {
            epsilon: constants::EPSILON,
            collinearity_epsilon: constants::COLLINEARITY_EPSILON,
            clip_to_bounds: true,
            close_cells: true,
        }
    }
}

impl VoronoiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_collinearity_epsilon(mut self, epsilon: f64) -> Self {
        self.collinearity_epsilon = epsilon;
        self
    }

    /// Ohne Clipping bleiben Strahlen offen; Zellen können dann nicht geschlossen werden.
    pub fn with_clipping(mut self, clip: bool) -> Self {
        self.clip_to_bounds = clip;
        if !clip {
            self.close_cells = false;
        }
        self
    }

    pub fn with_cell_closing(mut self, close: bool) -> Self {
        self.close_cells = close;
        self
    }

    /// Absolute Toleranz für ein Diagramm in `bounds`.
    pub fn scaled_epsilon(&self, bounds: &Bounds2D) -> f64 {
        self.epsilon * bounds.width().max(bounds.height())
    }

    pub fn validate(&self) -> VoronoiResult<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(VoronoiError::InvalidConfiguration {
                message: format!("epsilon must be a positive finite number, got {}", self.epsilon),
            });
        }
        if !self.collinearity_epsilon.is_finite() || self.collinearity_epsilon < 0.0 {
            return Err(VoronoiError::InvalidConfiguration {
                message: format!(
                    "collinearity_epsilon must be a non-negative finite number, got {}",
                    self.collinearity_epsilon
                ),
            });
        }
        if self.close_cells && !self.clip_to_bounds {
            return Err(VoronoiError::InvalidConfiguration {
                message: "Closing cells requires clipping to the bounding box.".to_string(),
            });
        }
        Ok(())
    }
}
