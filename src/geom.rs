//! Tolerance-aware geometry predicates.
//!
//! Every fuzzy comparison in the crate goes through this module so that a
//! single pair of tolerances governs all degeneracy decisions. `EPSILON` is
//! an absolute distance in input units: predicates normalize their cross
//! products by segment length before comparing against it.

use crate::vec2::Vec2;

pub(crate) const EPSILON: f32 = 1e-5;

/// Tolerance for angle comparisons, in radians.
pub(crate) const ANGLE_EPSILON: f32 = 1e-4;

const TAU: f32 = std::f32::consts::TAU;

/// An unordered pair of points; `Edge::new(a, b) == Edge::new(b, a)`.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub a: Vec2,
    pub b: Vec2,
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl Edge {
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    pub fn has_vertex(&self, v: Vec2) -> bool {
        self.a == v || self.b == v
    }

    pub fn shares_vertex(&self, other: &Edge) -> bool {
        self.has_vertex(other.a) || self.has_vertex(other.b)
    }

    pub(crate) fn direction(&self) -> Vec2 {
        self.b - self.a
    }

    /// Perpendicular distance from `p` to the edge's supporting line,
    /// signed by which side of a->b the point falls on.
    pub(crate) fn signed_distance(&self, p: Vec2) -> f32 {
        let d = self.direction();
        let len = d.length();
        if len <= EPSILON {
            return (p - self.a).length();
        }
        d.cross(p - self.a) / len
    }

    /// Is `p` on the segment, within [`EPSILON`] of it?
    pub(crate) fn contains_point(&self, p: Vec2) -> bool {
        let d = self.direction();
        let len = d.length();
        if len <= EPSILON {
            return (p - self.a).length() <= EPSILON;
        }
        if self.signed_distance(p).abs() > EPSILON {
            return false;
        }
        let along = (p - self.a).dot(d) / len;
        along >= -EPSILON && along <= len + EPSILON
    }

    /// True when the two segments cross at a point interior to both.
    ///
    /// Contact at a shared endpoint is not a proper intersection, and
    /// neither is a collinear overlap (the determinant vanishes there).
    pub(crate) fn properly_intersects(&self, other: &Edge) -> bool {
        let d1 = self.direction();
        let d2 = other.direction();
        let (l1, l2) = (d1.length(), d2.length());
        let det = d1.cross(d2);
        if det.abs() <= EPSILON * l1 * l2 {
            return false;
        }
        // self.a + t*d1 == other.a + u*d2, by Cramer
        let offset = other.a - self.a;
        let t = offset.cross(d2) / det;
        let u = offset.cross(d1) / det;
        let (m1, m2) = (EPSILON / l1, EPSILON / l2);
        t > m1 && t < 1. - m1 && u > m2 && u < 1. - m2
    }
}

/// Where a point sits relative to a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Containment {
    Inside,
    OnEdge(Edge),
    Outside,
}

/// Three points, semantically unordered: equality is vertex-set equality.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub a: Vec2,
    pub b: Vec2,
    pub c: Vec2,
}

impl PartialEq for Triangle {
    fn eq(&self, other: &Self) -> bool {
        other.has_vertex(self.a) && other.has_vertex(self.b) && other.has_vertex(self.c)
    }
}

impl Triangle {
    pub const fn new(a: Vec2, b: Vec2, c: Vec2) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [Vec2; 3] {
        [self.a, self.b, self.c]
    }

    pub fn edges(&self) -> [Edge; 3] {
        [
            Edge::new(self.a, self.b),
            Edge::new(self.b, self.c),
            Edge::new(self.c, self.a),
        ]
    }

    pub fn has_vertex(&self, v: Vec2) -> bool {
        self.a == v || self.b == v || self.c == v
    }

    pub fn has_edge(&self, edge: &Edge) -> bool {
        self.edges().iter().any(|e| e == edge)
    }

    pub fn area(&self) -> f32 {
        (self.b - self.a).cross(self.c - self.a).abs() * 0.5
    }

    pub(crate) fn centroid(&self) -> Vec2 {
        (self.a + self.b + self.c) * (1. / 3.)
    }

    /// Collinear within tolerance: the smallest height is below [`EPSILON`].
    pub(crate) fn is_degenerate(&self) -> bool {
        let longest = self
            .edges()
            .iter()
            .map(|e| e.direction().length())
            .fold(0f32, f32::max);
        longest <= EPSILON || (self.b - self.a).cross(self.c - self.a).abs() <= EPSILON * longest
    }

    pub(crate) fn shared_edge(&self, other: &Triangle) -> Option<Edge> {
        self.edges().into_iter().find(|e| other.has_edge(e))
    }

    /// The vertex not on `edge`, for an edge of this triangle.
    pub(crate) fn opposite_vertex(&self, edge: &Edge) -> Option<Vec2> {
        self.vertices().into_iter().find(|v| !edge.has_vertex(*v))
    }

    /// Interior angle at vertex `v`, in [0, pi].
    pub(crate) fn angle_at(&self, v: Vec2) -> f32 {
        let (u, w) = if v == self.a {
            (self.b, self.c)
        } else if v == self.b {
            (self.a, self.c)
        } else {
            (self.a, self.b)
        };
        let (d1, d2) = (u - v, w - v);
        d1.cross(d2).abs().atan2(d1.dot(d2))
    }

    pub(crate) fn classify(&self, p: Vec2) -> Containment {
        let edges = self.edges();
        let d = edges.map(|e| e.signed_distance(p));
        if d.iter().all(|s| *s > EPSILON) || d.iter().all(|s| *s < -EPSILON) {
            return Containment::Inside;
        }
        for edge in edges {
            if edge.contains_point(p) {
                return Containment::OnEdge(edge);
            }
        }
        Containment::Outside
    }
}

/// Counterclockwise angle from direction `from` to direction `to`, in [0, tau).
pub(crate) fn ccw_angle(from: Vec2, to: Vec2) -> f32 {
    let a = from.cross(to).atan2(from.dot(to));
    if a < 0. {
        a + TAU
    } else {
        a
    }
}

/// Clockwise angle from direction `from` to direction `to`, in [0, tau).
///
/// Directions a hair counterclockwise of `from` snap to zero rather than a
/// full turn, so near-collinear continuations compare as "straight ahead".
pub(crate) fn cw_angle(from: Vec2, to: Vec2) -> f32 {
    let a = ccw_angle(to, from);
    if a >= TAU - ANGLE_EPSILON {
        0.
    } else {
        a
    }
}

/// True when the quad a-b-c-d (in boundary order) is strictly convex.
pub(crate) fn is_convex_quad(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let v = [b - a, c - b, d - c, a - d];
    let z = [
        v[0].cross(v[1]),
        v[1].cross(v[2]),
        v[2].cross(v[3]),
        v[3].cross(v[0]),
    ];
    z[0] * z[1] > 0. && z[1] * z[2] > 0. && z[2] * z[3] > 0. && z[3] * z[0] > 0.
}

/// Shoelace area of a simple polygon.
pub(crate) fn polygon_area(points: &[Vec2]) -> f32 {
    let mut doubled = 0.;
    for i in 0..points.len() {
        doubled += points[i].cross(points[(i + 1) % points.len()]);
    }
    (doubled * 0.5).abs()
}
