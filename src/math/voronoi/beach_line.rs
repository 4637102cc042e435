// src/math/voronoi/beach_line.rs

use super::diagram::{EdgeId, Site};
use super::events::CircleEvent;
use crate::math::types::Point2D;
use std::ops::{Index, IndexMut};

/// Stabiler Verweis auf einen Abschnitt im Beach Line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcHandle(usize);

impl ArcHandle {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Ein Parabelbogen des Beach Line.
#[derive(Debug, Clone)]
pub struct BeachSection {
    pub site: Site,
    pub left: Option<ArcHandle>,
    pub right: Option<ArcHandle>,
    /// Das einzige gültige Circle Event dieses Bogens.
    pub circle_event: Option<CircleEvent>,
    /// Die Kante auf der linken Grenze des Bogens (zwischen `left` und diesem Bogen).
    pub edge: Option<EdgeId>,
}

impl BeachSection {
    fn new(site: Site) -> Self {
        Self {
            site,
            left: None,
            right: None,
            circle_event: None,
            edge: None,
        }
    }
}

/// Wo eine neue Site auf den Beach Line trifft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcLocation {
    /// Der Beach Line ist leer.
    Empty,
    /// Die Site liegt unter dem Inneren dieses Bogens.
    Within(ArcHandle),
    /// Die Site liegt (innerhalb der Toleranz) genau unter dem Bruchpunkt zweier Bögen.
    Between(ArcHandle, ArcHandle),
    /// Rechts vom äußersten Bogen, dessen Site auf der Sweep-Line liegt.
    RightOf(ArcHandle),
}

/// Art einer Einfügung in den Beach Line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionKind {
    /// Erster Bogen überhaupt.
    First,
    /// `left` wurde geteilt; `right` ist die rechte Kopie desselben Bogens.
    Split,
    /// Neuer Bogen ganz rechts, auf gleicher Höhe wie `left`.
    Appended,
    /// Neuer Bogen zwischen zwei bestehenden Bögen an ihrem Bruchpunkt.
    OnBreakpoint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    pub kind: InsertionKind,
    pub new_arc: ArcHandle,
    pub left: Option<ArcHandle>,
    pub right: Option<ArcHandle>,
    /// Durch das Teilen ungültig gewordenes Circle Event.
    pub invalidated: Option<CircleEvent>,
}

/// x-Koordinate des Bruchpunkts zwischen dem Bogen von `left` und dem rechts
/// anschließenden Bogen von `right` bei Sweep-Position `directrix`.
///
/// Liegt eine der beiden Sites auf der Sweep-Line, ist ihr Bogen ein senkrechter
/// Strahl bei ihrem x. Bei gleicher Höhe beider Sites liegt der Bruchpunkt in der Mitte.
pub fn breakpoint_x(left: Point2D, right: Point2D, directrix: f64) -> f64 {
    let pby2 = right.y - directrix;
    if pby2 == 0.0 {
        return right.x;
    }
    let plby2 = left.y - directrix;
    if plby2 == 0.0 {
        return left.x;
    }
    let hl = left.x - right.x;
    let aby2 = 1.0 / pby2 - 1.0 / plby2;
    let b = hl / plby2;
    if aby2 != 0.0 {
        let c = hl * hl / (-2.0 * plby2) - left.y + plby2 / 2.0 + right.y - pby2 / 2.0;
        let discriminant = b * b - 2.0 * aby2 * c;
        return (-b + discriminant.max(0.0).sqrt()) / aby2 + right.x;
    }
    (right.x + left.x) / 2.0
}

/// Der Beach Line als Arena von Abschnitten mit expliziten Nachbarverweisen.
/// Freigegebene Plätze werden wiederverwendet, Handles bleiben bis zur Entfernung gültig.
#[derive(Debug, Default)]
pub struct BeachLine {
    slots: Vec<Option<BeachSection>>,
    free: Vec<usize>,
    head: Option<ArcHandle>,
    /// Startpunkt für die gerichtete Suche; zuletzt eingefügter Bogen.
    hint: Option<ArcHandle>,
    len: usize,
}

impl BeachLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, handle: ArcHandle) -> Option<&BeachSection> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: ArcHandle) -> Option<&mut BeachSection> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    pub fn left_neighbor_of(&self, handle: ArcHandle) -> Option<ArcHandle> {
        self.get(handle).and_then(|section| section.left)
    }

    pub fn right_neighbor_of(&self, handle: ArcHandle) -> Option<ArcHandle> {
        self.get(handle).and_then(|section| section.right)
    }

    /// Gilt `event` noch? Der Bogen muss existieren und genau dieses Event halten.
    pub fn holds_circle_event(&self, event: &CircleEvent) -> bool {
        self.get(event.arc)
            .and_then(|section| section.circle_event.as_ref())
            .is_some_and(|current| current.sequence == event.sequence)
    }

    /// Bögen von links nach rechts.
    pub fn iter(&self) -> impl Iterator<Item = (ArcHandle, &BeachSection)> + '_ {
        std::iter::successors(self.head, move |&handle| self.right_neighbor_of(handle))
            .map(move |handle| (handle, &self[handle]))
    }

    pub fn left_break_point(&self, handle: ArcHandle, directrix: f64) -> f64 {
        let section = &self[handle];
        let focus = section.site.position;
        if focus.y == directrix {
            return focus.x;
        }
        match section.left {
            Some(left) => breakpoint_x(self[left].site.position, focus, directrix),
            None => f64::NEG_INFINITY,
        }
    }

    pub fn right_break_point(&self, handle: ArcHandle, directrix: f64) -> f64 {
        let section = &self[handle];
        if let Some(right) = section.right {
            return self.left_break_point(right, directrix);
        }
        let focus = section.site.position;
        if focus.y == directrix {
            focus.x
        } else {
            f64::INFINITY
        }
    }

    /// Sucht den Bogen über `x` bei Sweep-Position `directrix`.
    ///
    /// Gerichtete Suche ab dem zuletzt eingefügten Bogen: Die Bruchpunkte sind
    /// von links nach rechts monoton, also genügt ein Lauf in eine Richtung.
    pub fn locate_arc_above(&self, x: f64, directrix: f64, epsilon: f64) -> ArcLocation {
        let Some(mut node) = self.hint.or(self.head) else {
            return ArcLocation::Empty;
        };
        loop {
            let dxl = self.left_break_point(node, directrix) - x;
            if dxl > epsilon {
                match self.left_neighbor_of(node) {
                    Some(left) => {
                        node = left;
                        continue;
                    }
                    None => return ArcLocation::Within(node),
                }
            }
            let dxr = x - self.right_break_point(node, directrix);
            if dxr > epsilon {
                match self.right_neighbor_of(node) {
                    Some(right) => {
                        node = right;
                        continue;
                    }
                    None => return ArcLocation::RightOf(node),
                }
            }
            // Ein Bogen mit Fokus auf der Sweep-Line ist ein senkrechter Strahl bei seinem x.
            // Spätere Sites derselben Höhe liegen immer rechts davon.
            let on_directrix = self[node].site.position.y == directrix;
            if dxl > -epsilon && !on_directrix {
                if let Some(left) = self.left_neighbor_of(node) {
                    return ArcLocation::Between(left, node);
                }
            }
            if dxr > -epsilon {
                return match self.right_neighbor_of(node) {
                    Some(right) => ArcLocation::Between(node, right),
                    None => ArcLocation::RightOf(node),
                };
            }
            return ArcLocation::Within(node);
        }
    }

    /// Fügt den Bogen für `site` unter dem Bogen ein, der über `site.position.x` liegt.
    ///
    /// Liegt die Site unter dem Inneren eines Bogens, wird dieser geteilt: links bleibt
    /// der bestehende Abschnitt (sein Circle Event wird ungültig), rechts entsteht eine
    /// Kopie. Kanten und Circle Events legt der Aufrufer an.
    pub fn insert_around_arc_above(&mut self, site: Site, epsilon: f64) -> Insertion {
        let position = site.position;
        let location = self.locate_arc_above(position.x, position.y, epsilon);
        let (kind, left, right) = match location {
            ArcLocation::Empty => (InsertionKind::First, None, None),
            ArcLocation::Within(arc) => (InsertionKind::Split, Some(arc), Some(arc)),
            ArcLocation::RightOf(arc) => (InsertionKind::Appended, Some(arc), None),
            ArcLocation::Between(l, r) => (InsertionKind::OnBreakpoint, Some(l), Some(r)),
        };

        let new_arc = self.insert_after(left, BeachSection::new(site));
        self.hint = Some(new_arc);

        // Teilen: links bleibt der bestehende Abschnitt, rechts entsteht eine Kopie
        if let (InsertionKind::Split, Some(split)) = (kind, left) {
            let invalidated = self[split].circle_event.take();
            let copy_site = self[split].site;
            let copy = self.insert_after(Some(new_arc), BeachSection::new(copy_site));
            return Insertion {
                kind,
                new_arc,
                left: Some(split),
                right: Some(copy),
                invalidated,
            };
        }

        Insertion {
            kind,
            new_arc,
            left,
            right,
            invalidated: None,
        }
    }

    /// Entfernt den Abschnitt und verbindet seine Nachbarn miteinander.
    pub fn remove(&mut self, handle: ArcHandle) -> Option<BeachSection> {
        let section = self.slots.get_mut(handle.0)?.take()?;
        if let Some(left) = section.left {
            self[left].right = section.right;
        } else {
            self.head = section.right;
        }
        if let Some(right) = section.right {
            self[right].left = section.left;
        }
        if self.hint == Some(handle) {
            self.hint = section.left.or(section.right);
        }
        self.free.push(handle.0);
        self.len -= 1;
        Some(section)
    }

    /// Fügt `section` rechts von `anchor` ein, ohne `anchor` am Anfang.
    fn insert_after(&mut self, anchor: Option<ArcHandle>, mut section: BeachSection) -> ArcHandle {
        let right = match anchor {
            Some(anchor) => self[anchor].right,
            None => self.head,
        };
        section.left = anchor;
        section.right = right;

        let handle = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(section);
                ArcHandle(index)
            }
            None => {
                self.slots.push(Some(section));
                ArcHandle(self.slots.len() - 1)
            }
        };

        match anchor {
            Some(anchor) => self[anchor].right = Some(handle),
            None => self.head = Some(handle),
        }
        if let Some(right) = right {
            self[right].left = Some(handle);
        }
        self.len += 1;
        handle
    }
}

impl Index<ArcHandle> for BeachLine {
    type Output = BeachSection;

    fn index(&self, handle: ArcHandle) -> &BeachSection {
        match self.slots.get(handle.0) {
            Some(Some(section)) => section,
            _ => panic!("stale beach line handle {:?}", handle),
        }
    }
}

impl IndexMut<ArcHandle> for BeachLine {
    fn index_mut(&mut self, handle: ArcHandle) -> &mut BeachSection {
        match self.slots.get_mut(handle.0) {
            Some(Some(section)) => section,
            _ => panic!("stale beach line handle {:?}", handle),
        }
    }
}
