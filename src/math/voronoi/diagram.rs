// src/math/voronoi/diagram.rs

use crate::math::{
    types::{Bounds2D, Point2D},
    utils::simple_geometry::orientation,
};
use serde::{Deserialize, Serialize};

pub type CellId = usize;
pub type EdgeId = usize;
pub type VertexId = usize;

/// Ein Eingabepunkt, der genau eine Zelle besitzt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Position nach der (y, x)-Sortierung ohne Duplikate; identisch mit der Zell-ID.
    pub id: CellId,
    /// Index des ersten Eingabepunktes mit dieser Position.
    pub input_index: usize,
    pub position: Point2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point2D,
}

/// Eine Kante zwischen zwei Zellen.
///
/// `right_cell == None` markiert eine synthetische Randkante entlang der Bounding Box;
/// die Außenseite ist dann die "äußere" Region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub left_cell: CellId,
    pub right_cell: Option<CellId>,
    pub start: Option<VertexId>,
    pub end: Option<VertexId>,
}

impl Edge {
    pub fn is_border(&self) -> bool {
        self.right_cell.is_none()
    }

    /// Beide Endpunkte gesetzt
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn touches_cell(&self, cell: CellId) -> bool {
        self.left_cell == cell || self.right_cell == Some(cell)
    }

    /// Die Zelle auf der anderen Seite, von `cell` aus gesehen.
    pub fn other_cell(&self, cell: CellId) -> Option<CellId> {
        if self.left_cell == cell {
            self.right_cell
        } else {
            Some(self.left_cell)
        }
    }
}

/// Eine Kante aus Sicht einer ihrer Zellen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfEdge {
    pub cell: CellId,
    pub edge: EdgeId,
    /// Sortierschlüssel innerhalb der Zelle (absteigend)
    pub angle: f64,
}

impl HalfEdge {
    /// Startpunkt in Umlaufrichtung der Zelle
    pub fn start_vertex(&self, edges: &[Edge]) -> Option<VertexId> {
        let edge = &edges[self.edge];
        if edge.left_cell == self.cell {
            edge.start
        } else {
            edge.end
        }
    }

    /// Endpunkt in Umlaufrichtung der Zelle
    pub fn end_vertex(&self, edges: &[Edge]) -> Option<VertexId> {
        let edge = &edges[self.edge];
        if edge.left_cell == self.cell {
            edge.end
        } else {
            edge.start
        }
    }

    pub fn start_point(&self, diagram: &VoronoiDiagram) -> Option<Point2D> {
        self.start_vertex(&diagram.edges)
            .map(|v| diagram.vertices[v].position)
    }

    pub fn end_point(&self, diagram: &VoronoiDiagram) -> Option<Point2D> {
        self.end_vertex(&diagram.edges)
            .map(|v| diagram.vertices[v].position)
    }
}

/// Lage eines Punktes relativ zu einer Zelle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    OnBoundary,
    Outside,
}

/// Eine Voronoi-Zelle: die Region aller Punkte, die ihrer Site am nächsten liegen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub site: Site,
    /// Im Uhrzeigersinn (y nach oben) sortierte Halbkanten;
    /// nach dem Schließen ein geschlossener Polygonzug.
    pub half_edges: Vec<HalfEdge>,
    /// Die Zelle grenzt an die Bounding Box.
    pub is_border: bool,
    #[serde(skip)]
    pub(crate) needs_closing: bool,
}

impl Cell {
    pub fn is_border(&self) -> bool {
        self.is_border
    }

    /// Eckpunkte des Zellpolygons in Umlaufreihenfolge (Startpunkt jeder Halbkante).
    pub fn vertices(&self, diagram: &VoronoiDiagram) -> Vec<Point2D> {
        self.half_edges
            .iter()
            .filter_map(|half_edge| half_edge.start_point(diagram))
            .collect()
    }

    /// IDs der Nachbarzellen, in Umlaufreihenfolge und ohne Randkanten.
    pub fn neighbor_ids(&self, diagram: &VoronoiDiagram) -> Vec<CellId> {
        self.half_edges
            .iter()
            .filter_map(|half_edge| diagram.edges[half_edge.edge].other_cell(self.id))
            .collect()
    }

    pub fn bounds(&self, diagram: &VoronoiDiagram) -> Option<Bounds2D> {
        Bounds2D::from_points_iter(self.vertices(diagram))
    }

    /// Fläche des Zellpolygons (Gaußsche Trapezformel)
    pub fn area(&self, diagram: &VoronoiDiagram) -> f64 {
        let vertices = self.vertices(diagram);
        if vertices.len() < 3 {
            return 0.0;
        }
        let mut area_sum = 0.0;
        for i in 0..vertices.len() {
            let p1 = vertices[i];
            let p2 = vertices[(i + 1) % vertices.len()];
            area_sum += p1.x * p2.y - p2.x * p1.y;
        }
        0.5 * area_sum.abs()
    }

    /// Flächenschwerpunkt; fällt bei degenerierten Polygonen auf die Site zurück.
    pub fn centroid(&self, diagram: &VoronoiDiagram) -> Point2D {
        let vertices = self.vertices(diagram);
        if vertices.len() < 3 {
            return self.site.position;
        }
        let mut signed_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..vertices.len() {
            let p1 = vertices[i];
            let p2 = vertices[(i + 1) % vertices.len()];
            let cross = p1.x * p2.y - p2.x * p1.y;
            signed_area += cross;
            cx += (p1.x + p2.x) * cross;
            cy += (p1.y + p2.y) * cross;
        }
        if signed_area == 0.0 {
            return self.site.position;
        }
        Point2D::new(cx / (3.0 * signed_area), cy / (3.0 * signed_area))
    }

    /// Lage eines Punktes relativ zur (konvexen) Zelle.
    pub fn point_location(&self, diagram: &VoronoiDiagram, point: Point2D) -> PointLocation {
        let mut on_boundary = false;
        for half_edge in &self.half_edges {
            let (Some(p0), Some(p1)) =
                (half_edge.start_point(diagram), half_edge.end_point(diagram))
            else {
                continue;
            };
            // Halbkanten laufen im Uhrzeigersinn: innen liegt rechts
            let side = orientation(p0, p1, point);
            if side > 0.0 {
                return PointLocation::Outside;
            }
            if side == 0.0 {
                on_boundary = true;
            }
        }
        if on_boundary {
            PointLocation::OnBoundary
        } else {
            PointLocation::Inside
        }
    }
}

/// Zähler aus einem Diagrammaufbau. Nur Zählwerte, damit Ergebnisse reproduzierbar bleiben.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub site_events: usize,
    pub duplicate_sites: usize,
    pub circle_events_scheduled: usize,
    pub circle_events_processed: usize,
    pub stale_circle_events: usize,
    pub edges_discarded: usize,
    pub border_edges_added: usize,
}

/// Das fertige Diagramm: Zellen, Kanten und Eckpunkte, beschnitten auf `bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoronoiDiagram {
    pub(crate) bounds: Bounds2D,
    pub(crate) cells: Vec<Cell>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) input_to_cell: Vec<CellId>,
    pub(crate) stats: BuildStats,
}

impl VoronoiDiagram {
    pub(crate) fn new(bounds: Bounds2D, input_count: usize) -> Self {
        Self {
            bounds,
            cells: Vec::new(),
            edges: Vec::new(),
            vertices: Vec::new(),
            input_to_cell: Vec::with_capacity(input_count),
            stats: BuildStats::default(),
        }
    }

    pub fn bounds(&self) -> &Bounds2D {
        &self.bounds
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Die Sites aller Zellen, geordnet nach Zell-ID.
    pub fn sites(&self) -> impl Iterator<Item = &Site> + '_ {
        self.cells.iter().map(|cell| &cell.site)
    }

    /// Zelle des Eingabepunktes `input_index`.
    /// Duplikate zeigen auf die Zelle ihres ersten Vorkommens.
    pub fn cell_for_input(&self, input_index: usize) -> Option<&Cell> {
        self.input_to_cell
            .get(input_index)
            .and_then(|&id| self.cells.get(id))
    }

    /// Endpunkte einer Kante, sofern beide gesetzt sind.
    pub fn edge_points(&self, id: EdgeId) -> Option<(Point2D, Point2D)> {
        let edge = self.edges.get(id)?;
        let start = self.vertices[edge.start?].position;
        let end = self.vertices[edge.end?].position;
        Some((start, end))
    }

    /// Kanten zwischen zwei echten Zellen (ohne Randkanten).
    pub fn shared_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| !edge.is_border())
    }

    // --- Aufbau (nur während des Sweeps und der Nachbearbeitung) ---

    pub(crate) fn add_cell(&mut self, position: Point2D, input_index: usize) -> CellId {
        let id = self.cells.len();
        self.cells.push(Cell {
            id,
            site: Site {
                id,
                input_index,
                position,
            },
            half_edges: Vec::new(),
            is_border: false,
            needs_closing: false,
        });
        id
    }

    pub(crate) fn map_input(&mut self, input_index: usize, cell: CellId) {
        if self.input_to_cell.len() <= input_index {
            self.input_to_cell.resize(input_index + 1, cell);
        }
        self.input_to_cell[input_index] = cell;
    }

    pub(crate) fn site_position(&self, cell: CellId) -> Point2D {
        self.cells[cell].site.position
    }

    pub(crate) fn add_vertex(&mut self, position: Point2D) -> VertexId {
        self.vertices.push(Vertex { position });
        self.vertices.len() - 1
    }

    pub(crate) fn vertex_position(&self, id: VertexId) -> Point2D {
        self.vertices[id].position
    }

    /// Neue Kante zwischen `left` und `right`, mit Halbkanten in beiden Zellen.
    pub(crate) fn create_edge(
        &mut self,
        left: CellId,
        right: CellId,
        start: Option<VertexId>,
        end: Option<VertexId>,
    ) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            left_cell: left,
            right_cell: Some(right),
            start: None,
            end: None,
        });
        if let Some(vertex) = start {
            self.set_edge_start_point(id, left, right, vertex);
        }
        if let Some(vertex) = end {
            self.set_edge_end_point(id, left, right, vertex);
        }
        let left_half = self.make_half_edge(id, left, Some(right));
        self.cells[left].half_edges.push(left_half);
        let right_half = self.make_half_edge(id, right, Some(left));
        self.cells[right].half_edges.push(right_half);
        id
    }

    /// Randkante entlang der Bounding Box; die Halbkante fügt der Aufrufer selbst ein.
    pub(crate) fn create_border_edge(
        &mut self,
        cell: CellId,
        start: VertexId,
        end: VertexId,
    ) -> EdgeId {
        self.edges.push(Edge {
            left_cell: cell,
            right_cell: None,
            start: Some(start),
            end: Some(end),
        });
        self.edges.len() - 1
    }

    /// Setzt den Startpunkt aus Sicht von (`left`, `right`).
    ///
    /// Hat die Kante noch keinen Endpunkt, legt der erste Aufruf ihre Orientierung fest.
    pub(crate) fn set_edge_start_point(
        &mut self,
        edge: EdgeId,
        left: CellId,
        right: CellId,
        vertex: VertexId,
    ) {
        let edge = &mut self.edges[edge];
        if edge.start.is_none() && edge.end.is_none() {
            edge.start = Some(vertex);
            edge.left_cell = left;
            edge.right_cell = Some(right);
        } else if edge.left_cell == right {
            edge.end = Some(vertex);
        } else {
            edge.start = Some(vertex);
        }
    }

    pub(crate) fn set_edge_end_point(
        &mut self,
        edge: EdgeId,
        left: CellId,
        right: CellId,
        vertex: VertexId,
    ) {
        self.set_edge_start_point(edge, right, left, vertex);
    }

    /// Halbkante mit Sortierwinkel: Richtung zur Nachbar-Site, bei Randkanten
    /// die Normale der Kante.
    pub(crate) fn make_half_edge(
        &self,
        edge: EdgeId,
        cell: CellId,
        other: Option<CellId>,
    ) -> HalfEdge {
        let site = self.site_position(cell);
        let angle = match other {
            Some(other) => {
                let neighbor = self.site_position(other);
                (neighbor.y - site.y).atan2(neighbor.x - site.x)
            }
            None => {
                let e = &self.edges[edge];
                match (e.start, e.end) {
                    (Some(a), Some(b)) => {
                        let va = self.vertex_position(a);
                        let vb = self.vertex_position(b);
                        if e.left_cell == cell {
                            (vb.x - va.x).atan2(va.y - vb.y)
                        } else {
                            (va.x - vb.x).atan2(vb.y - va.y)
                        }
                    }
                    _ => 0.0,
                }
            }
        };
        HalfEdge { cell, edge, angle }
    }
}
