// src/math/voronoi/builder.rs

use super::{
    beach_line::{ArcHandle, BeachLine, InsertionKind},
    clipping,
    config::VoronoiConfig,
    diagram::{CellId, EdgeId, VoronoiDiagram},
    events::{CircleEvent, CircleQueue, SiteEvent, site_precedes_circle, try_compute_circle_event},
};
use crate::math::{
    error::{VoronoiError, VoronoiResult},
    types::{Bounds2D, Point2D, same_position},
    utils::{comparison::nearly_equal_eps, simple_geometry::circumcenter},
};
use bevy::log::{debug, error, trace, warn};

fn step_description(step_name: &str) -> String {
    format!("VoronoiBuilder::build - Step: {}", step_name)
}

/// Baut planare Voronoi-Diagramme mit Fortunes Sweep-Line-Verfahren.
///
/// Die Sites werden nach (y, x) aufsteigend abgearbeitet; das Ergebnis wird
/// anschließend auf die Bounding Box beschnitten und die Randzellen geschlossen
/// (siehe [`VoronoiConfig`]).
#[derive(Debug, Clone, Default)]
pub struct VoronoiBuilder {
    config: VoronoiConfig,
}

impl VoronoiBuilder {
    pub fn new(config: VoronoiConfig) -> VoronoiResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VoronoiConfig {
        &self.config
    }

    /// Berechnet das Voronoi-Diagramm von `points` innerhalb von `bounds`.
    ///
    /// Alle Punkte müssen endlich sein und in `bounds` liegen (Rand eingeschlossen).
    /// Doppelte Punkte teilen sich die Zelle ihres ersten Vorkommens.
    pub fn build(&self, points: &[Point2D], bounds: &Bounds2D) -> VoronoiResult<VoronoiDiagram> {
        bounds.validate_for_diagram()?;
        validate_sites(points, bounds)?;
        debug!(
            "{:?}: {} input points, bounds {}",
            step_description("InputValidation"),
            points.len(),
            bounds
        );

        let mut sweep = Sweep::new(&self.config, *bounds, points.len());
        sweep.run(points)?;
        let mut diagram = sweep.into_diagram();

        clipping::finalize(&mut diagram, bounds, &self.config)?;
        debug!(
            "{:?}: {:?}",
            step_description("Done"),
            diagram.stats
        );
        Ok(diagram)
    }
}

/// Voronoi-Diagramm mit Standardkonfiguration.
pub fn build(points: &[Point2D], bounds: &Bounds2D) -> VoronoiResult<VoronoiDiagram> {
    VoronoiBuilder::default().build(points, bounds)
}

fn validate_sites(points: &[Point2D], bounds: &Bounds2D) -> VoronoiResult<()> {
    for (index, point) in points.iter().enumerate() {
        let message = if !point.is_finite() {
            "site coordinates must be finite"
        } else if !bounds.contains_point(*point) {
            "site lies outside the bounding box"
        } else {
            continue;
        };
        return Err(VoronoiError::InvalidSite {
            index,
            x: point.x,
            y: point.y,
            message: message.to_string(),
        });
    }
    Ok(())
}

fn invariant(step: &str, message: String) -> VoronoiError {
    let step = step_description(step);
    error!("{}: {}", step, message);
    VoronoiError::InvariantViolation { step, message }
}

/// Zustand eines laufenden Sweeps.
struct Sweep<'a> {
    config: &'a VoronoiConfig,
    /// Absolute Toleranz für diese Bounding Box
    epsilon: f64,
    diagram: VoronoiDiagram,
    beach: BeachLine,
    circles: CircleQueue,
    /// Position und Zelle der zuletzt verarbeiteten Site
    last_site: Option<(Point2D, CellId)>,
}

impl<'a> Sweep<'a> {
    fn new(config: &'a VoronoiConfig, bounds: Bounds2D, input_count: usize) -> Self {
        Self {
            config,
            epsilon: config.scaled_epsilon(&bounds),
            diagram: VoronoiDiagram::new(bounds, input_count),
            beach: BeachLine::new(),
            circles: CircleQueue::new(),
            last_site: None,
        }
    }

    fn run(&mut self, points: &[Point2D]) -> VoronoiResult<()> {
        let sites = SiteEvent::sorted_from(points);
        let mut next_site = 0;

        loop {
            let beach = &self.beach;
            let circle = self.circles.peek_live(|event| beach.holds_circle_event(event));
            match (sites.get(next_site), circle) {
                (Some(site), circle)
                    if circle.is_none_or(|circle| site_precedes_circle(site.position, &circle)) =>
                {
                    self.handle_site(*site)?;
                    next_site += 1;
                }
                (_, Some(circle)) => {
                    self.circles.pop();
                    self.handle_circle(circle)?;
                }
                _ => break,
            }
        }

        self.diagram.stats.stale_circle_events = self.circles.discarded();
        debug!(
            "{:?}: {} cells, {} edges, {} vertices, {} circle events ({} stale)",
            step_description("Sweep"),
            self.diagram.cells.len(),
            self.diagram.edges.len(),
            self.diagram.vertices.len(),
            self.diagram.stats.circle_events_processed,
            self.diagram.stats.stale_circle_events
        );
        Ok(())
    }

    fn into_diagram(self) -> VoronoiDiagram {
        self.diagram
    }

    fn handle_site(&mut self, event: SiteEvent) -> VoronoiResult<()> {
        if let Some((position, cell)) = self.last_site {
            if same_position(position, event.position) {
                trace!(
                    "Skipping duplicate site #{} at {:?}",
                    event.input_index, event.position
                );
                self.diagram.map_input(event.input_index, cell);
                self.diagram.stats.duplicate_sites += 1;
                return Ok(());
            }
        }

        let cell = self.diagram.add_cell(event.position, event.input_index);
        self.diagram.map_input(event.input_index, cell);
        self.diagram.stats.site_events += 1;
        self.last_site = Some((event.position, cell));

        let site = self.diagram.cells[cell].site;
        let sweep_y = site.position.y;
        let insertion = self.beach.insert_around_arc_above(site, self.epsilon);
        trace!("Site #{} at {:?}: {:?}", cell, site.position, insertion.kind);

        match (insertion.kind, insertion.left, insertion.right) {
            (InsertionKind::First, _, _) => {}
            (InsertionKind::Split, Some(left), Some(right)) => {
                // Beide neuen Bruchpunkte liegen auf derselben Mittelsenkrechten
                let edge = self
                    .diagram
                    .create_edge(self.beach[left].site.id, site.id, None, None);
                self.beach[insertion.new_arc].edge = Some(edge);
                self.beach[right].edge = Some(edge);
                self.attach_circle_event(left, sweep_y);
                self.attach_circle_event(right, sweep_y);
            }
            (InsertionKind::Appended, Some(left), _) => {
                let edge = self
                    .diagram
                    .create_edge(self.beach[left].site.id, site.id, None, None);
                self.beach[insertion.new_arc].edge = Some(edge);
            }
            (InsertionKind::OnBreakpoint, Some(left), Some(right)) => {
                self.detach_circle_event(left);
                self.detach_circle_event(right);

                let left_site = self.beach[left].site;
                let right_site = self.beach[right].site;
                let vertex = circumcenter(
                    left_site.position,
                    site.position,
                    right_site.position,
                    self.config.collinearity_epsilon,
                )
                .map(|center| self.diagram.add_vertex(center));
                if vertex.is_none() {
                    warn!(
                        "{:?}: site #{} lies on a breakpoint of collinear sites #{} and #{}",
                        step_description("SiteEvent"),
                        site.id,
                        left_site.id,
                        right_site.id
                    );
                }

                // Die bisherige Kante zwischen links und rechts endet hier
                if let (Some(vertex), Some(edge)) = (vertex, self.beach[right].edge) {
                    self.diagram
                        .set_edge_start_point(edge, left_site.id, right_site.id, vertex);
                }
                let new_edge = self
                    .diagram
                    .create_edge(left_site.id, site.id, None, vertex);
                self.beach[insertion.new_arc].edge = Some(new_edge);
                let right_edge = self
                    .diagram
                    .create_edge(site.id, right_site.id, None, vertex);
                self.beach[right].edge = Some(right_edge);

                self.attach_circle_event(left, sweep_y);
                self.attach_circle_event(right, sweep_y);
            }
            (kind, _, _) => {
                return Err(invariant(
                    "SiteEvent",
                    format!("insertion {:?} of site #{} is missing a neighbour arc", kind, site.id),
                ));
            }
        }

        if let Some(invalidated) = insertion.invalidated {
            trace!("Invalidated circle event {:?}", invalidated);
        }
        Ok(())
    }

    fn handle_circle(&mut self, event: CircleEvent) -> VoronoiResult<()> {
        let arc = event.arc;
        let (Some(mut left), Some(mut right)) = (
            self.beach.left_neighbor_of(arc),
            self.beach.right_neighbor_of(arc),
        ) else {
            return Err(invariant(
                "CircleEvent",
                format!("vanishing arc {:?} has no two neighbours", arc),
            ));
        };

        let center = event.center;
        let vertex = self.diagram.add_vertex(center);
        trace!(
            "Circle event at {:?} (sweep {}), vertex #{}",
            center, event.trigger_y, vertex
        );

        let removed = self.remove_arc(arc)?;

        // Weitere Bögen, die im selben Punkt verschwinden
        let mut left_removed = Vec::new();
        while self.vanishes_at(left, center) {
            let Some(previous) = self.beach.left_neighbor_of(left) else {
                break;
            };
            left_removed.push(self.remove_arc(left)?);
            left = previous;
        }
        let mut right_removed = Vec::new();
        while self.vanishes_at(right, center) {
            let Some(next) = self.beach.right_neighbor_of(right) else {
                break;
            };
            right_removed.push(self.remove_arc(right)?);
            right = next;
        }
        self.detach_circle_event(left);
        self.detach_circle_event(right);

        // Von links nach rechts: (Site, Kante am linken Rand)
        let mut chain: Vec<(CellId, Option<EdgeId>)> =
            Vec::with_capacity(left_removed.len() + right_removed.len() + 3);
        chain.push((self.beach[left].site.id, self.beach[left].edge));
        chain.extend(left_removed.iter().rev().copied());
        chain.push(removed);
        chain.extend(right_removed.iter().copied());
        chain.push((self.beach[right].site.id, self.beach[right].edge));

        for pair in chain.windows(2) {
            let (left_site, _) = pair[0];
            let (right_site, edge) = pair[1];
            let Some(edge) = edge else {
                return Err(invariant(
                    "CircleEvent",
                    format!("arc of site #{} has no boundary edge", right_site),
                ));
            };
            self.diagram
                .set_edge_start_point(edge, left_site, right_site, vertex);
        }

        let left_site = self.beach[left].site.id;
        let right_site = self.beach[right].site.id;
        let edge = self
            .diagram
            .create_edge(left_site, right_site, None, Some(vertex));
        self.beach[right].edge = Some(edge);

        self.attach_circle_event(left, event.trigger_y);
        self.attach_circle_event(right, event.trigger_y);
        self.diagram.stats.circle_events_processed += 1;
        Ok(())
    }

    fn remove_arc(&mut self, arc: ArcHandle) -> VoronoiResult<(CellId, Option<EdgeId>)> {
        match self.beach.remove(arc) {
            Some(section) => Ok((section.site.id, section.edge)),
            None => Err(invariant(
                "CircleEvent",
                format!("arc {:?} is not on the beach line", arc),
            )),
        }
    }

    /// Hat `arc` ein Circle Event mit demselben Mittelpunkt?
    fn vanishes_at(&self, arc: ArcHandle, center: Point2D) -> bool {
        let epsilon = self.epsilon;
        self.beach[arc].circle_event.is_some_and(|event| {
            nearly_equal_eps(event.center.x, center.x, epsilon)
                && nearly_equal_eps(event.center.y, center.y, epsilon)
        })
    }

    fn detach_circle_event(&mut self, arc: ArcHandle) {
        self.beach[arc].circle_event = None;
    }

    /// Plant das Circle Event für das Tripel um `arc` ein, falls es zusammenläuft.
    fn attach_circle_event(&mut self, arc: ArcHandle, sweep_y: f64) {
        self.detach_circle_event(arc);
        let (Some(left), Some(right)) = (
            self.beach.left_neighbor_of(arc),
            self.beach.right_neighbor_of(arc),
        ) else {
            return;
        };
        let left_site = self.beach[left].site;
        let right_site = self.beach[right].site;
        if left_site.id == right_site.id {
            return;
        }

        let Some(event) = try_compute_circle_event(
            arc,
            left_site.position,
            self.beach[arc].site.position,
            right_site.position,
            sweep_y,
            self.epsilon,
            self.config.collinearity_epsilon,
        ) else {
            return;
        };
        let event = self.circles.schedule(event);
        self.beach[arc].circle_event = Some(event);
        self.diagram.stats.circle_events_scheduled += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::voronoi::diagram::PointLocation;
    use approx::assert_relative_eq;
    use geo::{Area, LineString, Polygon};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use spade::{DelaunayTriangulation, Point2, Triangulation};
    use std::collections::{HashMap, HashSet};

    /// Relativ zur Ausdehnung der Box
    const TOLERANCE: f64 = 1e-8;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    fn random_sites(seed: u64, count: usize, bounds: &Bounds2D) -> Vec<Point2D> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                p(
                    rng.random_range(bounds.min.x..bounds.max.x),
                    rng.random_range(bounds.min.y..bounds.max.y),
                )
            })
            .collect()
    }

    /// Jede Zelle ist ein geschlossener Polygonzug innerhalb der Box,
    /// und jede ihrer Halbkanten gehört zu einer Kante dieser Zelle.
    fn assert_closed_and_contained(diagram: &VoronoiDiagram) {
        let bounds = diagram.bounds();
        let tolerance = TOLERANCE * bounds.width().max(bounds.height());
        for cell in diagram.cells() {
            let count = cell.half_edges.len();
            assert!(count >= 3, "cell #{} has only {} half-edges", cell.id, count);
            for (i, half_edge) in cell.half_edges.iter().enumerate() {
                assert_eq!(half_edge.cell, cell.id);
                assert!(
                    diagram.edges()[half_edge.edge].touches_cell(cell.id),
                    "edge {} in cell #{} does not touch it",
                    half_edge.edge,
                    cell.id
                );
                let end = half_edge.end_point(diagram).unwrap();
                let next = cell.half_edges[(i + 1) % count].start_point(diagram).unwrap();
                assert!(
                    end.distance(next) < tolerance,
                    "cell #{} is open between {:?} and {:?}",
                    cell.id,
                    end,
                    next
                );
            }
        }
        for vertex in diagram.vertices() {
            assert!(
                bounds.contains_point_eps(vertex.position, tolerance),
                "vertex {:?} outside {}",
                vertex.position,
                bounds
            );
        }
    }

    fn nearest_site(diagram: &VoronoiDiagram, point: Point2D) -> CellId {
        diagram
            .sites()
            .min_by(|a, b| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            })
            .map(|site| site.id)
            .unwrap()
    }

    fn total_area(diagram: &VoronoiDiagram) -> f64 {
        diagram.cells().iter().map(|cell| cell.area(diagram)).sum()
    }

    #[test]
    fn test_empty_input_gives_empty_diagram() {
        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let diagram = build(&[], &bounds).unwrap();
        assert!(diagram.is_empty());
        assert!(diagram.edges().is_empty());
        assert!(diagram.vertices().is_empty());
    }

    #[test]
    fn test_rejects_invalid_input() {
        let degenerate = Bounds2D {
            min: p(0.0, 0.0),
            max: p(0.0, 10.0),
        };
        assert!(matches!(
            build(&[p(0.0, 1.0)], &degenerate),
            Err(VoronoiError::InvalidBounds { .. })
        ));

        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let result = build(&[p(1.0, 1.0), p(11.0, 1.0)], &bounds);
        assert!(matches!(result, Err(VoronoiError::InvalidSite { index: 1, .. })));

        let result = build(&[p(f64::NAN, 1.0)], &bounds);
        assert!(matches!(result, Err(VoronoiError::InvalidSite { index: 0, .. })));

        assert!(VoronoiBuilder::new(VoronoiConfig::new().with_epsilon(-1.0)).is_err());
    }

    #[test]
    fn test_single_site_gets_whole_box() {
        let bounds = Bounds2D::from_extents(-2.0, 3.0, 1.0, 4.0).unwrap();
        let diagram = build(&[p(0.0, 2.0)], &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 1);
        let cell = &diagram.cells()[0];
        assert_eq!(
            cell.vertices(&diagram),
            vec![p(-2.0, 1.0), p(-2.0, 4.0), p(3.0, 4.0), p(3.0, 1.0)]
        );
        assert!(cell.is_border());
        assert_relative_eq!(cell.area(&diagram), 15.0);
    }

    #[test]
    fn test_two_sites_share_vertical_edge() {
        let bounds = Bounds2D::from_extents(-5.0, 15.0, -5.0, 5.0).unwrap();
        let diagram = build(&[p(0.0, 0.0), p(10.0, 0.0)], &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 2);
        let shared: Vec<_> = diagram.shared_edges().collect();
        assert_eq!(shared.len(), 1);
        let (start, end) = diagram.edge_points(shared[0].0).unwrap();
        assert_relative_eq!(start.x, 5.0);
        assert_relative_eq!(end.x, 5.0);
        assert_relative_eq!(start.y.min(end.y), -5.0);
        assert_relative_eq!(start.y.max(end.y), 5.0);

        for cell in diagram.cells() {
            assert_relative_eq!(cell.area(&diagram), 100.0, epsilon = 1e-9);
            assert_eq!(cell.neighbor_ids(&diagram).len(), 1);
        }
        assert_closed_and_contained(&diagram);
    }

    #[test]
    fn test_collinear_sites() {
        let bounds = Bounds2D::from_extents(-5.0, 15.0, -5.0, 5.0).unwrap();
        let diagram = build(&[p(0.0, 0.0), p(5.0, 0.0), p(10.0, 0.0)], &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 3);
        let mut xs: Vec<f64> = diagram
            .shared_edges()
            .map(|(id, _)| {
                let (start, end) = diagram.edge_points(id).unwrap();
                assert_relative_eq!(start.x, end.x);
                assert_relative_eq!((start.y - end.y).abs(), 10.0);
                start.x
            })
            .collect();
        xs.sort_by(f64::total_cmp);
        assert_eq!(xs.len(), 2);
        assert_relative_eq!(xs[0], 2.5);
        assert_relative_eq!(xs[1], 7.5);
        assert_eq!(diagram.stats().circle_events_processed, 0);
        assert_closed_and_contained(&diagram);
    }

    #[test]
    fn test_vertically_collinear_sites() {
        let bounds = Bounds2D::from_extents(-5.0, 5.0, -5.0, 15.0).unwrap();
        let diagram = build(&[p(0.0, 0.0), p(0.0, 5.0), p(0.0, 10.0)], &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 3);
        assert_eq!(diagram.shared_edges().count(), 2);
        assert_relative_eq!(total_area(&diagram), bounds.area(), epsilon = 1e-9);
        assert_closed_and_contained(&diagram);
    }

    #[test]
    fn test_duplicates_share_cell() {
        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let diagram = build(&[p(1.0, 1.0), p(1.0, 1.0), p(5.0, 5.0)], &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 2);
        assert_eq!(diagram.stats().duplicate_sites, 1);
        assert_eq!(diagram.cell_for_input(0).map(|c| c.id), Some(0));
        assert_eq!(diagram.cell_for_input(1).map(|c| c.id), Some(0));
        assert_eq!(diagram.cell_for_input(2).map(|c| c.id), Some(1));
        assert_eq!(diagram.cells()[0].site.input_index, 0);
        assert_closed_and_contained(&diagram);
    }

    #[test]
    fn test_square_lattice_with_cocircular_sites() {
        let bounds = Bounds2D::from_extents(0.0, 4.0, 0.0, 4.0).unwrap();
        let points: Vec<Point2D> = (0..4)
            .flat_map(|i| (0..4).map(move |j| p(0.5 + i as f64, 0.5 + j as f64)))
            .collect();
        let diagram = build(&points, &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 16);
        assert_closed_and_contained(&diagram);
        for cell in diagram.cells() {
            assert_relative_eq!(cell.area(&diagram), 1.0, epsilon = 1e-9);
            let centroid = cell.centroid(&diagram);
            assert_relative_eq!(centroid.x, cell.site.position.x, epsilon = 1e-9);
            assert_relative_eq!(centroid.y, cell.site.position.y, epsilon = 1e-9);
        }
        // Innere Zellen haben genau vier Nachbarn, diagonale Kanten der Länge 0 fallen weg
        let interior = diagram
            .cells()
            .iter()
            .find(|cell| cell.site.position == p(1.5, 1.5))
            .unwrap();
        assert_eq!(interior.neighbor_ids(&diagram).len(), 4);
        assert!(!interior.is_border());
    }

    #[test]
    fn test_sites_on_box_boundary() {
        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let points = vec![p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(5.0, 0.0)];
        let diagram = build(&points, &bounds).unwrap();

        assert_eq!(diagram.cells().len(), 4);
        assert_closed_and_contained(&diagram);
        assert_relative_eq!(total_area(&diagram), bounds.area(), epsilon = 1e-7);
    }

    #[test]
    fn test_random_clouds_tile_the_box() {
        let bounds = Bounds2D::from_extents(-50.0, 150.0, 0.0, 100.0).unwrap();
        for seed in [1, 7, 42] {
            let points = random_sites(seed, 200, &bounds);
            let diagram = build(&points, &bounds).unwrap();

            assert_eq!(diagram.cells().len(), 200);
            assert_closed_and_contained(&diagram);
            assert_relative_eq!(total_area(&diagram), bounds.area(), max_relative = 1e-8);

            for cell in diagram.cells() {
                assert_eq!(
                    cell.point_location(&diagram, cell.site.position),
                    PointLocation::Inside
                );
                // Jeder Punkt der Zelle liegt ihrer Site am nächsten
                assert_eq!(nearest_site(&diagram, cell.centroid(&diagram)), cell.id);

                let ring: Vec<(f64, f64)> = cell
                    .vertices(&diagram)
                    .iter()
                    .map(|v| (v.x, v.y))
                    .collect();
                let polygon = Polygon::new(LineString::from(ring), vec![]);
                assert_relative_eq!(
                    polygon.unsigned_area(),
                    cell.area(&diagram),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_tiny_box_keeps_circle_events() {
        let bounds = Bounds2D::from_extents(0.0, 1e-6, 0.0, 1e-6).unwrap();
        let points = [p(2e-7, 2e-7), p(8e-7, 3e-7), p(5e-7, 8e-7)];
        let diagram = build(&points, &bounds).unwrap();

        assert_eq!(diagram.stats().circle_events_processed, 1);
        assert_eq!(diagram.shared_edges().count(), 3);
        assert_closed_and_contained(&diagram);
        assert_relative_eq!(total_area(&diagram), 1e-12, max_relative = 1e-8);
    }

    #[test]
    fn test_random_clouds_in_tiny_and_huge_boxes() {
        for (extent, seed) in [(1e-6, 3), (1e6, 11)] {
            let bounds = Bounds2D::from_extents(0.0, extent, 0.0, extent).unwrap();
            let points = random_sites(seed, 30, &bounds);
            let diagram = build(&points, &bounds).unwrap();

            assert_eq!(diagram.cells().len(), 30);
            assert!(diagram.stats().circle_events_processed > 0);
            assert_closed_and_contained(&diagram);
            assert_relative_eq!(total_area(&diagram), bounds.area(), max_relative = 1e-8);
        }
    }

    #[test]
    fn test_near_duplicate_sites_on_one_row() {
        let bounds = Bounds2D::from_extents(-1.0, 10.0, -1.0, 10.0).unwrap();

        let diagram = build(&[p(0.0, 0.0), p(1e-10, 0.0), p(5.0, 5.0)], &bounds).unwrap();
        assert_eq!(diagram.cells().len(), 3);
        assert_closed_and_contained(&diagram);
        assert_relative_eq!(total_area(&diagram), 121.0, max_relative = 1e-8);

        let points = [p(1.0, 1.0), p(1.0 + 1e-10, 1.0), p(3.0, 1.0), p(5.0, 5.0)];
        let diagram = build(&points, &bounds).unwrap();
        assert_eq!(diagram.cells().len(), 4);
        assert_closed_and_contained(&diagram);
        assert_relative_eq!(total_area(&diagram), 121.0, max_relative = 1e-8);
    }

    #[test]
    fn test_shared_edges_are_delaunay_edges() {
        let bounds = Bounds2D::from_extents(0.0, 100.0, 0.0, 100.0).unwrap();
        let points = random_sites(99, 300, &bounds);
        let diagram = build(&points, &bounds).unwrap();

        let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        let mut cell_by_position = HashMap::new();
        for site in diagram.sites() {
            triangulation
                .insert(Point2::new(site.position.x, site.position.y))
                .unwrap();
            let key = (site.position.x.to_bits(), site.position.y.to_bits());
            cell_by_position.insert(key, site.id);
        }
        let delaunay: HashSet<(CellId, CellId)> = triangulation
            .undirected_edges()
            .map(|edge| {
                let [a, b] = edge.vertices();
                let a = cell_by_position[&(a.position().x.to_bits(), a.position().y.to_bits())];
                let b = cell_by_position[&(b.position().x.to_bits(), b.position().y.to_bits())];
                (a.min(b), a.max(b))
            })
            .collect();

        assert!(diagram.shared_edges().count() > 0);
        for (_, edge) in diagram.shared_edges() {
            let a = edge.left_cell;
            let b = edge.right_cell.unwrap();
            assert!(
                delaunay.contains(&(a.min(b), a.max(b))),
                "edge between #{} and #{} is not a Delaunay edge",
                a,
                b
            );
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let bounds = Bounds2D::from_extents(0.0, 1.0, 0.0, 1.0).unwrap();
        let points = random_sites(2024, 150, &bounds);
        let first = build(&points, &bounds).unwrap();
        let second = build(&points, &bounds).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.stats(), second.stats());
    }

    #[test]
    fn test_without_clipping_rays_stay_open() {
        let bounds = Bounds2D::from_extents(-5.0, 15.0, -5.0, 5.0).unwrap();
        let builder = VoronoiBuilder::new(VoronoiConfig::new().with_clipping(false)).unwrap();
        let diagram = builder.build(&[p(0.0, 0.0), p(10.0, 0.0)], &bounds).unwrap();

        assert_eq!(diagram.edges().len(), 1);
        assert!(!diagram.edges()[0].is_complete());
        assert!(diagram.vertices().is_empty());
    }

    #[test]
    fn test_stats_count_events() {
        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let diagram = build(&[p(2.0, 2.0), p(8.0, 3.0), p(5.0, 8.0)], &bounds).unwrap();

        let stats = diagram.stats();
        assert_eq!(stats.site_events, 3);
        assert_eq!(stats.circle_events_processed, 1);
        assert!(stats.circle_events_scheduled >= 1);
        assert!(stats.border_edges_added > 0);
        // Drei Halbgeraden von einem gemeinsamen Eckpunkt
        assert_eq!(diagram.shared_edges().count(), 3);
        assert_closed_and_contained(&diagram);
    }

    #[test]
    fn test_diagram_serializes() {
        let bounds = Bounds2D::from_extents(0.0, 10.0, 0.0, 10.0).unwrap();
        let diagram = build(&[p(2.0, 2.0), p(8.0, 3.0), p(5.0, 8.0)], &bounds).unwrap();

        let json = serde_json::to_string(&diagram).unwrap();
        let restored: VoronoiDiagram = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.cells().len(), diagram.cells().len());
        assert_eq!(restored.edges(), diagram.edges());
        assert_eq!(restored.stats(), diagram.stats());
    }
}
