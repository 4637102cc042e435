// src/math/types/point.rs
use super::Point2D;
use std::cmp::Ordering;

/// Reihenfolge der Sweep-Line: zuerst aufsteigendes y, bei Gleichstand aufsteigendes x.
///
/// Nutzt `total_cmp`, damit die Sortierung auch ohne `Ord` für `f64` total und
/// deterministisch ist. `-0.0` wird vorher zu `0.0`, damit Duplikate benachbart bleiben.
pub fn sweep_order(a: Point2D, b: Point2D) -> Ordering {
    let (a, b) = (a + Point2D::ZERO, b + Point2D::ZERO);
    a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x))
}

/// Exakte Koordinatengleichheit (für die Duplikaterkennung nach dem Sortieren).
pub fn same_position(a: Point2D, b: Point2D) -> bool {
    a.x == b.x && a.y == b.y
}
