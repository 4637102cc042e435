// src/math/utils.rs

/// Mathematische Konstanten
pub mod constants {
    /// Standard-Toleranz für Koordinatenvergleiche
    pub const EPSILON: f64 = 1e-9;
    /// Schwelle für die Orientierungs-Determinante dreier Sites (relativ zu ihrer Größenordnung)
    pub const COLLINEARITY_EPSILON: f64 = 2e-12;
}

/// Vergleichsfunktionen mit Toleranz
pub mod comparison {
    use super::constants::EPSILON;

    /// Prüft ob zwei Floats (nahezu) gleich sind
    pub fn nearly_equal(a: f64, b: f64) -> bool {
        nearly_equal_eps(a, b, EPSILON)
    }

    /// Prüft ob zwei Floats mit custom Toleranz gleich sind
    pub fn nearly_equal_eps(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// `a` ist um mehr als `epsilon` größer als `b`
    pub fn greater_than_eps(a: f64, b: f64, epsilon: f64) -> bool {
        a - b > epsilon
    }

    /// `a` ist um mehr als `epsilon` kleiner als `b`
    pub fn less_than_eps(a: f64, b: f64, epsilon: f64) -> bool {
        b - a > epsilon
    }

    /// Prüft ob Float (nahezu) Null ist
    pub fn nearly_zero(a: f64) -> bool {
        a.abs() < EPSILON
    }
}

/// Geometrische Hilfsfunktionen (einfach, ohne komplexe Strukturen)
pub mod simple_geometry {
    use bevy::math::DVec2;

    use super::comparison::nearly_equal_eps;

    pub fn distance_sq(p1: DVec2, p2: DVec2) -> f64 {
        (p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2)
    }

    pub fn distance(p1: DVec2, p2: DVec2) -> f64 {
        distance_sq(p1, p2).sqrt()
    }

    /// Komponentenweiser Vergleich zweier Punkte mit Toleranz
    pub fn points_nearly_equal(a: DVec2, b: DVec2, epsilon: f64) -> bool {
        nearly_equal_eps(a.x, b.x, epsilon) && nearly_equal_eps(a.y, b.y, epsilon)
    }

    /// Kreuzprodukt (z-Komponente) von `b - a` und `c - a`.
    /// Positiv, wenn `a -> b -> c` gegen den Uhrzeigersinn (y nach oben) verläuft.
    pub fn orientation(a: DVec2, b: DVec2, c: DVec2) -> f64 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    /// Umkreismittelpunkt dreier Punkte, `None` wenn sie (nahezu) kollinear sind.
    /// `epsilon` ist relativ zur Größenordnung der Determinante.
    pub fn circumcenter(a: DVec2, b: DVec2, c: DVec2, epsilon: f64) -> Option<DVec2> {
        let bx = b.x - a.x;
        let by = b.y - a.y;
        let cx = c.x - a.x;
        let cy = c.y - a.y;
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() <= epsilon * 2.0 * ((bx * cy).abs() + (by * cx).abs()) {
            return None;
        }
        let hb = bx * bx + by * by;
        let hc = cx * cx + cy * cy;
        let center = DVec2::new((cy * hb - by * hc) / d + a.x, (bx * hc - cx * hb) / d + a.y);
        center.is_finite().then_some(center)
    }
}
