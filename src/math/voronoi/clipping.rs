// src/math/voronoi/clipping.rs

use super::config::VoronoiConfig;
use super::diagram::{CellId, EdgeId, VertexId, VoronoiDiagram};
use crate::math::{
    error::{VoronoiError, VoronoiResult},
    types::{Bounds2D, Point2D},
    utils::{
        comparison::{greater_than_eps, less_than_eps, nearly_equal_eps},
        simple_geometry::points_nearly_equal,
    },
};
use bevy::log::{debug, error, trace};

const STEP_CLOSE: &str = "VoronoiBuilder::build - Step: CloseCells";

/// Nachbearbeitung nach dem Sweep: Kanten an die Box anbinden und beschneiden,
/// degenerierte Kanten verwerfen, Randzellen schließen, ungenutzte Elemente entfernen.
pub fn finalize(
    diagram: &mut VoronoiDiagram,
    bounds: &Bounds2D,
    config: &VoronoiConfig,
) -> VoronoiResult<()> {
    if !config.clip_to_bounds {
        sort_half_edges(diagram, false);
        return Ok(());
    }

    let epsilon = config.scaled_epsilon(bounds);
    clip_edges(diagram, bounds, epsilon);
    sort_half_edges(diagram, true);
    if config.close_cells {
        close_cells(diagram, bounds, epsilon)?;
    }
    compact(diagram);

    debug!(
        "VoronoiBuilder::build - Step: Finalize: {} cells, {} edges, {} vertices \
         ({} edges discarded, {} border edges added)",
        diagram.cells.len(),
        diagram.edges.len(),
        diagram.vertices.len(),
        diagram.stats.edges_discarded,
        diagram.stats.border_edges_added
    );
    Ok(())
}

/// Bindet offene Kanten an die Box an und beschneidet alle Kanten auf sie.
/// Kanten außerhalb der Box oder mit Länge ~0 verlieren beide Endpunkte.
pub fn clip_edges(diagram: &mut VoronoiDiagram, bounds: &Bounds2D, epsilon: f64) {
    for id in 0..diagram.edges.len() {
        let keep = connect_edge(diagram, id, bounds)
            && clip_edge(diagram, id, bounds)
            && !is_degenerate(diagram, id, epsilon);
        if !keep {
            trace!("Discarding edge #{} during clipping", id);
            let edge = &mut diagram.edges[id];
            edge.start = None;
            edge.end = None;
            diagram.stats.edges_discarded += 1;
        }
    }
}

fn is_degenerate(diagram: &VoronoiDiagram, id: EdgeId, epsilon: f64) -> bool {
    match diagram.edge_points(id) {
        Some((start, end)) => points_nearly_equal(start, end, epsilon),
        None => true,
    }
}

fn mark_for_closing(diagram: &mut VoronoiDiagram, cell: CellId) {
    let cell = &mut diagram.cells[cell];
    cell.needs_closing = true;
    cell.is_border = true;
}

/// Gibt einer Kante ohne Endpunkt einen Endpunkt auf dem Rand der Box.
///
/// Die Kante liegt auf der Mittelsenkrechten ihrer beiden Sites; je nach Steigung
/// wird sie an oberer/unterer oder linker/rechter Seite angebunden. Ein vorhandener
/// Startpunkt außerhalb der Box wird dabei gleich auf die Box gezogen.
fn connect_edge(diagram: &mut VoronoiDiagram, id: EdgeId, bounds: &Bounds2D) -> bool {
    let edge = diagram.edges[id];
    if edge.end.is_some() {
        return true;
    }
    let Some(right_cell) = edge.right_cell else {
        return false;
    };

    let (xl, xr, yt, yb) = (bounds.min.x, bounds.max.x, bounds.min.y, bounds.max.y);
    let l = diagram.site_position(edge.left_cell);
    let r = diagram.site_position(right_cell);
    let (fx, fy) = ((l.x + r.x) / 2.0, (l.y + r.y) / 2.0);

    // Die Zellen müssen geschlossen werden, egal ob die Kante angebunden oder verworfen wird
    mark_for_closing(diagram, edge.left_cell);
    mark_for_closing(diagram, right_cell);

    let start = edge.start.map(|v| diagram.vertex_position(v));
    let new_start: Option<Point2D>;
    let end: Point2D;

    if r.y == l.y {
        // senkrechte Mittelsenkrechte
        if fx < xl || fx >= xr {
            return false;
        }
        if l.x > r.x {
            new_start = match start {
                None => Some(Point2D::new(fx, yt)),
                Some(p) if p.y < yt => Some(Point2D::new(fx, yt)),
                Some(p) if p.y >= yb => return false,
                Some(_) => None,
            };
            end = Point2D::new(fx, yb);
        } else {
            new_start = match start {
                None => Some(Point2D::new(fx, yb)),
                Some(p) if p.y > yb => Some(Point2D::new(fx, yb)),
                Some(p) if p.y < yt => return false,
                Some(_) => None,
            };
            end = Point2D::new(fx, yt);
        }
    } else {
        let fm = (l.x - r.x) / (r.y - l.y);
        let fb = fy - fm * fx;
        if !(-1.0..=1.0).contains(&fm) {
            // eher senkrecht: an oberer bzw. unterer Seite anbinden
            if l.x > r.x {
                new_start = match start {
                    None => Some(Point2D::new((yt - fb) / fm, yt)),
                    Some(p) if p.y < yt => Some(Point2D::new((yt - fb) / fm, yt)),
                    Some(p) if p.y >= yb => return false,
                    Some(_) => None,
                };
                end = Point2D::new((yb - fb) / fm, yb);
            } else {
                new_start = match start {
                    None => Some(Point2D::new((yb - fb) / fm, yb)),
                    Some(p) if p.y > yb => Some(Point2D::new((yb - fb) / fm, yb)),
                    Some(p) if p.y < yt => return false,
                    Some(_) => None,
                };
                end = Point2D::new((yt - fb) / fm, yt);
            }
        } else if l.y < r.y {
            // eher waagerecht, nach rechts
            new_start = match start {
                None => Some(Point2D::new(xl, fm * xl + fb)),
                Some(p) if p.x < xl => Some(Point2D::new(xl, fm * xl + fb)),
                Some(p) if p.x >= xr => return false,
                Some(_) => None,
            };
            end = Point2D::new(xr, fm * xr + fb);
        } else {
            new_start = match start {
                None => Some(Point2D::new(xr, fm * xr + fb)),
                Some(p) if p.x > xr => Some(Point2D::new(xr, fm * xr + fb)),
                Some(p) if p.x < xl => return false,
                Some(_) => None,
            };
            end = Point2D::new(xl, fm * xl + fb);
        }
    }

    if let Some(point) = new_start {
        let vertex = diagram.add_vertex(point);
        diagram.edges[id].start = Some(vertex);
    }
    let vertex = diagram.add_vertex(end);
    diagram.edges[id].end = Some(vertex);
    true
}

/// Ein Schritt von Liang-Barsky. `false`, wenn die Strecke vollständig außerhalb liegt.
fn clip_parameter(p: f64, q: f64, t0: &mut f64, t1: &mut f64) -> bool {
    if p == 0.0 {
        return q >= 0.0;
    }
    let r = q / p;
    if p < 0.0 {
        if r > *t1 {
            return false;
        }
        if r > *t0 {
            *t0 = r;
        }
    } else {
        if r < *t0 {
            return false;
        }
        if r < *t1 {
            *t1 = r;
        }
    }
    true
}

/// Beschneidet eine Kante mit beiden Endpunkten nach Liang-Barsky.
/// Herausragende Endpunkte werden durch neue Eckpunkte auf dem Rand ersetzt.
fn clip_edge(diagram: &mut VoronoiDiagram, id: EdgeId, bounds: &Bounds2D) -> bool {
    let edge = diagram.edges[id];
    let (Some(start), Some(end)) = (edge.start, edge.end) else {
        return false;
    };
    let a = diagram.vertex_position(start);
    let b = diagram.vertex_position(end);
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    let mut t0 = 0.0;
    let mut t1 = 1.0;
    let inside = clip_parameter(-dx, a.x - bounds.min.x, &mut t0, &mut t1)
        && clip_parameter(dx, bounds.max.x - a.x, &mut t0, &mut t1)
        && clip_parameter(-dy, a.y - bounds.min.y, &mut t0, &mut t1)
        && clip_parameter(dy, bounds.max.y - a.y, &mut t0, &mut t1);
    if !inside {
        return false;
    }

    if t0 > 0.0 {
        let vertex = diagram.add_vertex(Point2D::new(a.x + t0 * dx, a.y + t0 * dy));
        diagram.edges[id].start = Some(vertex);
    }
    if t1 < 1.0 {
        let vertex = diagram.add_vertex(Point2D::new(a.x + t1 * dx, a.y + t1 * dy));
        diagram.edges[id].end = Some(vertex);
    }
    if t0 > 0.0 || t1 < 1.0 {
        mark_for_closing(diagram, edge.left_cell);
        if let Some(right) = edge.right_cell {
            mark_for_closing(diagram, right);
        }
    }
    true
}

/// Sortiert die Halbkanten jeder Zelle absteigend nach Winkel (Uhrzeigersinn bei y nach oben).
/// Mit `prune` fallen Halbkanten unvollständiger Kanten vorher weg.
fn sort_half_edges(diagram: &mut VoronoiDiagram, prune: bool) {
    let edges = &diagram.edges;
    for cell in &mut diagram.cells {
        if prune {
            cell.half_edges
                .retain(|half_edge| edges[half_edge.edge].is_complete());
        }
        cell.half_edges.sort_by(|a, b| b.angle.total_cmp(&a.angle));
    }
}

/// Seite der Bounding Box in Umlaufrichtung beim Schließen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxSide {
    /// x = min.x, Lauf zu max.y
    MinX,
    /// y = max.y, Lauf zu max.x
    MaxY,
    /// x = max.x, Lauf zu min.y
    MaxX,
    /// y = min.y, Lauf zu min.x
    MinY,
}

impl BoxSide {
    /// Auf welcher Seite ein Laufpunkt startet. Ecken gehören zur Seite, die von ihnen wegführt.
    fn starting_at(point: Point2D, bounds: &Bounds2D, eps: f64) -> Option<Self> {
        let (min, max) = (bounds.min, bounds.max);
        if nearly_equal_eps(point.x, min.x, eps) && less_than_eps(point.y, max.y, eps) {
            Some(Self::MinX)
        } else if nearly_equal_eps(point.y, max.y, eps) && less_than_eps(point.x, max.x, eps) {
            Some(Self::MaxY)
        } else if nearly_equal_eps(point.x, max.x, eps) && greater_than_eps(point.y, min.y, eps) {
            Some(Self::MaxX)
        } else if nearly_equal_eps(point.y, min.y, eps) && greater_than_eps(point.x, min.x, eps) {
            Some(Self::MinY)
        } else {
            None
        }
    }

    fn next(self) -> Self {
        match self {
            Self::MinX => Self::MaxY,
            Self::MaxY => Self::MaxX,
            Self::MaxX => Self::MinY,
            Self::MinY => Self::MinX,
        }
    }

    /// Ziel des Laufs auf dieser Seite: `target`, wenn es auf ihr liegt (dann ist der
    /// Lauf beendet), sonst die Ecke am Ende der Seite.
    fn walk_towards(self, target: Point2D, bounds: &Bounds2D, eps: f64) -> (bool, Point2D) {
        let (min, max) = (bounds.min, bounds.max);
        match self {
            Self::MinX => {
                let last = nearly_equal_eps(target.x, min.x, eps);
                (last, Point2D::new(min.x, if last { target.y } else { max.y }))
            }
            Self::MaxY => {
                let last = nearly_equal_eps(target.y, max.y, eps);
                (last, Point2D::new(if last { target.x } else { max.x }, max.y))
            }
            Self::MaxX => {
                let last = nearly_equal_eps(target.x, max.x, eps);
                (last, Point2D::new(max.x, if last { target.y } else { min.y }))
            }
            Self::MinY => {
                let last = nearly_equal_eps(target.y, min.y, eps);
                (last, Point2D::new(if last { target.x } else { min.x }, min.y))
            }
        }
    }
}

fn invariant(message: String) -> VoronoiError {
    error!("{}: {}", STEP_CLOSE, message);
    VoronoiError::InvariantViolation {
        step: STEP_CLOSE.to_string(),
        message,
    }
}

/// Schließt Randzellen: Zwischen aufeinanderfolgenden Halbkanten, deren Enden nicht
/// zusammenfallen, werden Randkanten entlang der Box eingefügt.
pub fn close_cells(
    diagram: &mut VoronoiDiagram,
    bounds: &Bounds2D,
    epsilon: f64,
) -> VoronoiResult<()> {
    let cell_count = diagram.cells.len();
    for cell in 0..cell_count {
        if diagram.cells[cell].half_edges.is_empty() {
            if cell_count == 1 {
                close_lone_cell(diagram, cell, bounds);
                continue;
            }
            return Err(invariant(format!(
                "cell #{} at {:?} has no edges left after clipping",
                cell, diagram.cells[cell].site.position
            )));
        }
        if !diagram.cells[cell].needs_closing {
            continue;
        }
        close_cell(diagram, cell, bounds, epsilon)?;
        diagram.cells[cell].needs_closing = false;
    }
    Ok(())
}

fn close_cell(
    diagram: &mut VoronoiDiagram,
    cell: CellId,
    bounds: &Bounds2D,
    epsilon: f64,
) -> VoronoiResult<()> {
    let mut count = diagram.cells[cell].half_edges.len();
    let mut i = 0;
    while i < count {
        let current = diagram.cells[cell].half_edges[i];
        let following = diagram.cells[cell].half_edges[(i + 1) % count];
        let (Some(mut from), Some(to)) = (
            current.end_vertex(&diagram.edges),
            following.start_vertex(&diagram.edges),
        ) else {
            return Err(invariant(format!(
                "cell #{} has a half-edge without endpoints",
                cell
            )));
        };
        let target = diagram.vertex_position(to);

        if !points_nearly_equal(diagram.vertex_position(from), target, epsilon) {
            let start = diagram.vertex_position(from);
            let Some(mut side) = BoxSide::starting_at(start, bounds, epsilon) else {
                return Err(invariant(format!(
                    "open end {:?} of cell #{} is not on the bounding box {}",
                    start, cell, bounds
                )));
            };

            // Höchstens einmal um die Box herum
            let mut closed = false;
            for _ in 0..5 {
                let (last, corner) = side.walk_towards(target, bounds, epsilon);
                let next = diagram.add_vertex(corner);
                insert_border_half_edge(diagram, cell, i + 1, from, next);
                i += 1;
                count += 1;
                if last {
                    closed = true;
                    break;
                }
                from = next;
                side = side.next();
            }
            if !closed {
                return Err(invariant(format!(
                    "walking the bounding box from {:?} never reached {:?} for cell #{}",
                    start, target, cell
                )));
            }
        }
        i += 1;
    }
    Ok(())
}

fn insert_border_half_edge(
    diagram: &mut VoronoiDiagram,
    cell: CellId,
    position: usize,
    from: VertexId,
    to: VertexId,
) {
    let edge = diagram.create_border_edge(cell, from, to);
    let half_edge = diagram.make_half_edge(edge, cell, None);
    diagram.cells[cell].half_edges.insert(position, half_edge);
    diagram.stats.border_edges_added += 1;
}

/// Einzige Zelle ohne Kanten: ihr Polygon ist die ganze Box.
fn close_lone_cell(diagram: &mut VoronoiDiagram, cell: CellId, bounds: &Bounds2D) {
    let corners: Vec<VertexId> = bounds
        .corners()
        .iter()
        .map(|&corner| diagram.add_vertex(corner))
        .collect();
    for i in 0..corners.len() {
        let position = diagram.cells[cell].half_edges.len();
        let next = corners[(i + 1) % corners.len()];
        insert_border_half_edge(diagram, cell, position, corners[i], next);
    }
    let cell = &mut diagram.cells[cell];
    cell.is_border = true;
    cell.needs_closing = false;
}

/// Entfernt verworfene Kanten und nicht mehr referenzierte Eckpunkte; IDs werden neu vergeben.
fn compact(diagram: &mut VoronoiDiagram) {
    let mut edge_map: Vec<Option<EdgeId>> = vec![None; diagram.edges.len()];
    let mut vertex_used = vec![false; diagram.vertices.len()];
    let mut kept_edges = Vec::with_capacity(diagram.edges.len());
    for (id, edge) in diagram.edges.iter().enumerate() {
        if let (Some(start), Some(end)) = (edge.start, edge.end) {
            edge_map[id] = Some(kept_edges.len());
            vertex_used[start] = true;
            vertex_used[end] = true;
            kept_edges.push(*edge);
        }
    }

    let mut vertex_map: Vec<Option<VertexId>> = vec![None; diagram.vertices.len()];
    let mut kept_vertices = Vec::with_capacity(diagram.vertices.len());
    for (id, vertex) in diagram.vertices.iter().enumerate() {
        if vertex_used[id] {
            vertex_map[id] = Some(kept_vertices.len());
            kept_vertices.push(*vertex);
        }
    }

    for edge in &mut kept_edges {
        edge.start = edge.start.and_then(|v| vertex_map[v]);
        edge.end = edge.end.and_then(|v| vertex_map[v]);
    }
    for cell in &mut diagram.cells {
        cell.half_edges.retain_mut(|half_edge| match edge_map[half_edge.edge] {
            Some(new_id) => {
                half_edge.edge = new_id;
                true
            }
            None => false,
        });
    }

    diagram.edges = kept_edges;
    diagram.vertices = kept_vertices;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds2D {
        Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap()
    }

    fn two_cells(left: Point2D, right: Point2D) -> (VoronoiDiagram, EdgeId) {
        let mut diagram = VoronoiDiagram::new(bounds(), 2);
        let a = diagram.add_cell(left, 0);
        let b = diagram.add_cell(right, 1);
        let edge = diagram.create_edge(a, b, None, None);
        (diagram, edge)
    }

    #[test]
    fn test_clip_parameter_rejects_outside() {
        let (mut t0, mut t1) = (0.0, 1.0);
        // Parallel zur Kante und außerhalb
        assert!(!clip_parameter(0.0, -1.0, &mut t0, &mut t1));
        assert!(clip_parameter(0.0, 1.0, &mut t0, &mut t1));
        // Eintritt bei t = 0.25
        assert!(clip_parameter(-4.0, -1.0, &mut t0, &mut t1));
        assert_eq!(t0, 0.25);
        // Austritt bei t = 0.75
        assert!(clip_parameter(4.0, 3.0, &mut t0, &mut t1));
        assert_eq!(t1, 0.75);
    }

    #[test]
    fn test_connect_vertical_bisector() {
        let (mut diagram, edge) = two_cells(Point2D::new(2.0, 5.0), Point2D::new(8.0, 5.0));
        assert!(connect_edge(&mut diagram, edge, &bounds()));
        let (start, end) = diagram.edge_points(edge).unwrap();
        assert_eq!(start, Point2D::new(5.0, 10.0));
        assert_eq!(end, Point2D::new(5.0, 0.0));
        assert!(diagram.cells.iter().all(|cell| cell.needs_closing));
    }

    #[test]
    fn test_connect_rejects_bisector_outside_box() {
        let (mut diagram, edge) = two_cells(Point2D::new(10.0, 5.0), Point2D::new(30.0, 5.0));
        assert!(!connect_edge(&mut diagram, edge, &bounds()));
    }

    #[test]
    fn test_clip_edge_shortens_segment() {
        let (mut diagram, edge) = two_cells(Point2D::new(5.0, 2.0), Point2D::new(5.0, 8.0));
        let a = diagram.add_vertex(Point2D::new(-5.0, 5.0));
        let b = diagram.add_vertex(Point2D::new(15.0, 5.0));
        diagram.edges[edge].start = Some(a);
        diagram.edges[edge].end = Some(b);

        assert!(clip_edge(&mut diagram, edge, &bounds()));
        let (start, end) = diagram.edge_points(edge).unwrap();
        assert_eq!(start, Point2D::new(0.0, 5.0));
        assert_eq!(end, Point2D::new(10.0, 5.0));
    }

    #[test]
    fn test_box_walk_sides() {
        let b = bounds();
        assert_eq!(BoxSide::starting_at(Point2D::new(0.0, 3.0), &b, 1e-9), Some(BoxSide::MinX));
        assert_eq!(BoxSide::starting_at(Point2D::new(0.0, 10.0), &b, 1e-9), Some(BoxSide::MaxY));
        assert_eq!(BoxSide::starting_at(Point2D::new(10.0, 10.0), &b, 1e-9), Some(BoxSide::MaxX));
        assert_eq!(BoxSide::starting_at(Point2D::new(10.0, 0.0), &b, 1e-9), Some(BoxSide::MinY));
        assert_eq!(BoxSide::starting_at(Point2D::new(5.0, 5.0), &b, 1e-9), None);

        let (last, corner) = BoxSide::MinX.walk_towards(Point2D::new(4.0, 10.0), &b, 1e-9);
        assert!(!last);
        assert_eq!(corner, Point2D::new(0.0, 10.0));
        let (last, corner) = BoxSide::MaxY.walk_towards(Point2D::new(4.0, 10.0), &b, 1e-9);
        assert!(last);
        assert_eq!(corner, Point2D::new(4.0, 10.0));
    }

    #[test]
    fn test_lone_cell_becomes_box() {
        let mut diagram = VoronoiDiagram::new(bounds(), 1);
        diagram.add_cell(Point2D::new(3.0, 3.0), 0);
        close_cells(&mut diagram, &bounds(), 1e-9).unwrap();
        compact(&mut diagram);

        let cell = &diagram.cells()[0];
        assert_eq!(cell.vertices(&diagram), bounds().corners().to_vec());
        assert!(cell.is_border);
        assert_eq!(diagram.edges().len(), 4);
        assert!(diagram.edges().iter().all(|edge| edge.is_border()));
    }

    #[test]
    fn test_compact_drops_discarded_edges_and_orphans() {
        let (mut diagram, edge) = two_cells(Point2D::new(2.0, 5.0), Point2D::new(8.0, 5.0));
        let _orphan = diagram.add_vertex(Point2D::new(50.0, 50.0));
        let a = diagram.add_vertex(Point2D::new(5.0, 0.0));
        let b = diagram.add_vertex(Point2D::new(5.0, 10.0));
        let _dead = diagram.create_edge(0, 1, None, None);
        diagram.edges[edge].start = Some(a);
        diagram.edges[edge].end = Some(b);

        compact(&mut diagram);
        assert_eq!(diagram.edges().len(), 1);
        assert_eq!(diagram.vertices().len(), 2);
        assert!(diagram.vertices().iter().all(|v| v.position != Point2D::new(50.0, 50.0)));
        for cell in diagram.cells() {
            assert_eq!(cell.half_edges.len(), 1);
            assert_eq!(cell.half_edges[0].edge, 0);
        }
    }
}
