// src/math/voronoi/events.rs

use super::beach_line::ArcHandle;
use crate::math::types::{Point2D, sweep_order};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Ein Eingabepunkt, der noch auf die Sweep-Line wartet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteEvent {
    pub position: Point2D,
    pub input_index: usize,
}

impl SiteEvent {
    /// Erzeugt die Site Events in Verarbeitungsreihenfolge (y aufsteigend, dann x).
    /// Die Sortierung ist stabil, gleiche Positionen bleiben in Eingabereihenfolge.
    pub fn sorted_from(points: &[Point2D]) -> Vec<SiteEvent> {
        let mut events: Vec<SiteEvent> = points
            .iter()
            .enumerate()
            .map(|(input_index, &position)| SiteEvent {
                position,
                input_index,
            })
            .collect();
        events.sort_by(|a, b| sweep_order(a.position, b.position));
        events
    }
}

/// Vorhergesagtes Verschwinden des Bogens `arc`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleEvent {
    pub arc: ArcHandle,
    /// Mittelpunkt des Umkreises, also der spätere Voronoi-Eckpunkt.
    pub center: Point2D,
    /// Sweep-Position, an der das Event feuert (Mittelpunkt-y plus Radius).
    pub trigger_y: f64,
    /// Eindeutige Nummer; ein Bogen hält nur das Event mit seiner aktuellen Nummer lebendig.
    pub sequence: u64,
}

impl CircleEvent {
    /// Reihenfolge in der Queue: trigger_y, dann x, dann Einplanungsreihenfolge.
    pub fn queue_order(&self, other: &Self) -> Ordering {
        self.trigger_y
            .total_cmp(&other.trigger_y)
            .then_with(|| self.center.x.total_cmp(&other.center.x))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Ein Site Event bei (sx, sy) kommt vor einem Circle Event bei (cx, cy)
/// genau dann, wenn `sy < cy` oder `sy == cy && sx < cx`. Bei exaktem Gleichstand
/// gewinnt das Circle Event.
pub fn site_precedes_circle(site: Point2D, circle: &CircleEvent) -> bool {
    site.y < circle.trigger_y || (site.y == circle.trigger_y && site.x < circle.center.x)
}

/// Prüft, ob die Bögen von `left`, `middle`, `right` zusammenlaufen, und liefert
/// dann das Circle Event für den mittleren Bogen (mit `sequence = 0`; die Nummer
/// vergibt [`CircleQueue::schedule`]).
///
/// Kein Event entsteht, wenn die Sites (nahezu) kollinear sind, die Bruchpunkte
/// auseinanderlaufen oder der Auslösepunkt bereits hinter der Sweep-Line liegt.
/// `collinearity_epsilon` ist relativ zur Größenordnung der Koordinaten.
pub fn try_compute_circle_event(
    arc: ArcHandle,
    left: Point2D,
    middle: Point2D,
    right: Point2D,
    sweep_y: f64,
    epsilon: f64,
    collinearity_epsilon: f64,
) -> Option<CircleEvent> {
    let bx = middle.x;
    let by = middle.y;
    let ax = left.x - bx;
    let ay = left.y - by;
    let cx = right.x - bx;
    let cy = right.y - by;

    let ha = ax * ax + ay * ay;
    let hc = cx * cx + cy * cy;

    // Positiv oder ~0: Bruchpunkte divergieren oder laufen parallel.
    // Die Schwelle skaliert mit den Summanden der Determinante.
    let d = 2.0 * (ax * cy - ay * cx);
    let tolerance = collinearity_epsilon * 2.0 * ((ax * cy).abs() + (ay * cx).abs());
    if d >= -tolerance {
        return None;
    }

    let x = (cy * ha - ay * hc) / d;
    let y = (ax * hc - cx * ha) / d;
    let center = Point2D::new(x + bx, y + by);
    let trigger_y = center.y + (x * x + y * y).sqrt();
    if !center.is_finite() || !trigger_y.is_finite() {
        return None;
    }
    if trigger_y < sweep_y - epsilon {
        return None;
    }

    Some(CircleEvent {
        arc,
        center,
        trigger_y,
        sequence: 0,
    })
}

#[derive(Debug, Clone, Copy)]
struct QueuedCircle(CircleEvent);

impl PartialEq for QueuedCircle {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedCircle {}

impl PartialOrd for QueuedCircle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCircle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.queue_order(&other.0)
    }
}

/// Prioritätswarteschlange der Circle Events mit verzögerter Invalidierung:
/// ungültige Events bleiben liegen und werden beim Erreichen der Spitze verworfen.
#[derive(Debug, Default)]
pub struct CircleQueue {
    heap: BinaryHeap<Reverse<QueuedCircle>>,
    next_sequence: u64,
    discarded: usize,
}

impl CircleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vergibt eine neue Nummer und plant das Event ein.
    pub fn schedule(&mut self, mut event: CircleEvent) -> CircleEvent {
        self.next_sequence += 1;
        event.sequence = self.next_sequence;
        self.heap.push(Reverse(QueuedCircle(event)));
        event
    }

    /// Frühestes noch gültiges Event. Ungültige Events an der Spitze werden dabei entfernt.
    pub fn peek_live<F>(&mut self, is_live: F) -> Option<CircleEvent>
    where
        F: Fn(&CircleEvent) -> bool,
    {
        while let Some(Reverse(QueuedCircle(event))) = self.heap.peek() {
            if is_live(event) {
                return Some(*event);
            }
            self.heap.pop();
            self.discarded += 1;
        }
        None
    }

    pub fn pop(&mut self) -> Option<CircleEvent> {
        self.heap.pop().map(|Reverse(QueuedCircle(event))| event)
    }

    /// Anzahl der verworfenen, ungültig gewordenen Events
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
