use std::f32::consts::PI;

use log::{debug, trace};
use snafu::Snafu;

use crate::{
    geom::{
        ccw_angle, cw_angle, is_convex_quad, polygon_area, Containment, Edge, Triangle,
        ANGLE_EPSILON, EPSILON,
    },
    triangle_set::TriangleSet,
    vec2::Vec2,
};

/// Triangle pool bound per input point, an empirically safe upper bound
/// for outline workloads.
const TRIANGLES_PER_POINT: usize = 10;

/// Relative margin added around the hull's bounding box before deriving the
/// bootstrap triangle, so no hull point can touch its sides.
const SUPER_PADDING: f32 = 0.25;

#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum TriangulateError {
    /// Fewer than 3 distinct input points, or all of them collinear.
    DegenerateInput,
    /// A point to insert fell inside no triangle and on no shared edge,
    /// which means the triangulation no longer covers its own hull.
    UnresolvedContainment,
    /// The triangle pool bound was exhausted.
    CapacityExceeded,
    /// A constraint edge crosses another constraint edge, references a
    /// point not in the input, or splits off a region with fewer than
    /// 3 vertices.
    ConstraintGeometry,
}

/// Triangulates the convex hull of `points`, forcing every edge of
/// `constraints` to appear in the result.
///
/// Hull points are swapped to the front of `points` in clockwise order;
/// callers that need the original order must pass a copy. Constraint edges
/// must reference input points and may touch each other only at shared
/// vertices. When the constraints form closed loops (every constrained
/// point has even degree), triangles falling outside the loops are removed
/// from the result, which turns a closed outline into a mesh of its
/// interior.
pub fn triangulate(
    points: &mut [Vec2],
    constraints: &[Edge],
) -> Result<TriangleSet, TriangulateError> {
    check_constraints(points, constraints)?;
    let mut set = triangulate_points(points)?;
    if !constraints.is_empty() {
        let mut mesher = Mesher { set };
        for edge in constraints {
            mesher.insert_constraint(edge)?;
        }
        set = mesher.set;
        if forms_closed_loops(constraints) {
            remove_exterior(&mut set, constraints);
        }
    }
    debug!(
        "triangulated {} points / {} constraints into {} triangles",
        points.len(),
        constraints.len(),
        set.len()
    );
    Ok(set)
}

/// Gift-wraps the convex hull of `points`, swapping hull points into a
/// clockwise-ordered prefix, and returns the hull length.
///
/// The walk starts at the largest-x point (ties broken by largest y) and
/// repeatedly takes the candidate with the smallest clockwise turn from
/// the previous hull edge; angle ties go to the nearest candidate, so
/// collinear boundary points all end up on the hull.
pub fn convex_hull(points: &mut [Vec2]) -> Result<usize, TriangulateError> {
    if points.len() < 3 {
        return Err(TriangulateError::DegenerateInput);
    }
    let mut start = 0;
    for i in 1..points.len() {
        if points[i].x > points[start].x
            || (points[i].x == points[start].x && points[i].y > points[start].y)
        {
            start = i;
        }
    }
    points.swap(0, start);

    let mut hull_len = 1;
    let mut dir = Vec2::new(0., 1.);
    loop {
        let current = points[hull_len - 1];
        // candidates are the unconfirmed points, plus the start point to
        // close the loop once the walk is under way
        let closing = if hull_len > 1 { 0..1 } else { 0..0 };
        let mut best: Option<(usize, f32, f32)> = None;
        for i in (hull_len..points.len()).chain(closing) {
            let to = points[i] - current;
            let dist = to.length_squared();
            if dist <= EPSILON * EPSILON {
                continue; // coincides with the current point
            }
            let turn = cw_angle(dir, to);
            let better = match best {
                None => true,
                Some((_, best_turn, best_dist)) => {
                    turn + ANGLE_EPSILON < best_turn
                        || (turn < best_turn + ANGLE_EPSILON && dist < best_dist)
                }
            };
            if better {
                best = Some((i, turn, dist));
            }
        }
        let Some((next, _, _)) = best else {
            return Err(TriangulateError::DegenerateInput);
        };
        if next == 0 {
            break;
        }
        points.swap(hull_len, next);
        dir = points[hull_len] - current;
        hull_len += 1;
    }
    if hull_len < 3 || polygon_area(&points[..hull_len]) <= EPSILON {
        return Err(TriangulateError::DegenerateInput);
    }
    Ok(hull_len)
}

/// Builds an equilateral triangle strictly containing every hull point.
///
/// The hull's bounding box is padded, then 60 degree rays through the
/// padded box's top corners meet at the apex; following them back down to
/// the box floor places the two base corners.
fn super_triangle(hull: &[Vec2]) -> Triangle {
    let mut min = hull[0];
    let mut max = hull[0];
    for p in hull {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    let pad = (max.x - min.x + max.y - min.y) * SUPER_PADDING + 1.;
    let min = min - Vec2::new(pad, pad);
    let max = max + Vec2::new(pad, pad);
    let (w, h) = (max.x - min.x, max.y - min.y);
    let sqrt3 = 3f32.sqrt();
    let apex = Vec2::new((min.x + max.x) * 0.5, max.y + w * 0.5 * sqrt3);
    let base_left = Vec2::new(min.x - h / sqrt3, min.y);
    let base_right = Vec2::new(max.x + h / sqrt3, min.y);
    Triangle::new(apex, base_left, base_right)
}

/// Unconstrained triangulation of the convex hull of `points`.
///
/// This is the recursion target of constraint insertion: half-polygon
/// point sets come back through here with fresh, independent pools.
fn triangulate_points(points: &mut [Vec2]) -> Result<TriangleSet, TriangulateError> {
    let hull_len = convex_hull(points)?;
    trace!("{} hull points of {}", hull_len, points.len());
    let bootstrap = super_triangle(&points[..hull_len]);
    let mut mesher = Mesher::new(points.len());
    mesher.set.push(bootstrap)?;
    for i in 0..hull_len {
        mesher.insert(points[i])?;
    }
    mesher.convexify(&bootstrap)?;
    for i in hull_len..points.len() {
        mesher.insert(points[i])?;
    }
    mesher.legalize()?;
    Ok(mesher.set)
}

struct Mesher {
    set: TriangleSet,
}

impl Mesher {
    fn new(point_count: usize) -> Self {
        Self {
            set: TriangleSet::with_limit(TRIANGLES_PER_POINT * point_count),
        }
    }

    /// Inserts one point into the current triangulation.
    ///
    /// A strictly interior point splits its containing triangle into a fan
    /// of 3. A point on a shared edge splits both triangles on that edge
    /// into fans and drops the two pieces collapsed along it, keeping 4.
    fn insert(&mut self, p: Vec2) -> Result<(), TriangulateError> {
        for i in 0..self.set.len() {
            if self.set[i].classify(p) == Containment::Inside {
                let t = self.set.swap_remove(i);
                for e in t.edges() {
                    self.set.push(Triangle::new(e.a, e.b, p))?;
                }
                return Ok(());
            }
        }
        for i in 0..self.set.len() {
            let Containment::OnEdge(edge) = self.set[i].classify(p) else {
                continue;
            };
            // the edge must be interior: another triangle shares it
            let Some(j) = (0..self.set.len()).find(|&j| j != i && self.set[j].has_edge(&edge))
            else {
                return Err(TriangulateError::UnresolvedContainment);
            };
            let (hi, lo) = if i > j { (i, j) } else { (j, i) };
            let first = self.set.swap_remove(hi);
            let second = self.set.swap_remove(lo);
            for t in [first, second] {
                for e in t.edges() {
                    let piece = Triangle::new(e.a, e.b, p);
                    if !piece.is_degenerate() {
                        self.set.push(piece)?;
                    }
                }
            }
            return Ok(());
        }
        Err(TriangulateError::UnresolvedContainment)
    }

    /// Flips edges around the bootstrap triangle's vertices until the hull
    /// region is triangulated as a true convex fan, then removes every
    /// triangle still touching a bootstrap vertex.
    fn convexify(&mut self, bootstrap: &Triangle) -> Result<(), TriangulateError> {
        let sv = bootstrap.vertices();
        loop {
            let mut changed = false;
            for k in 0..3 {
                // the bootstrap edge leaving this vertex anchors the fan order
                let along = sv[(k + 1) % 3] - sv[k];
                while self.convexify_fan(sv[k], along, &sv)? {
                    changed = true;
                }
            }
            while self.merge_split_fans(&sv)? {
                changed = true;
            }
            if !changed {
                break;
            }
        }
        let before = self.set.len();
        self.set.retain(|t| !sv.iter().any(|s| t.has_vertex(*s)));
        trace!(
            "dropped {} bootstrap triangles, {} remain",
            before - self.set.len(),
            self.set.len()
        );
        Ok(())
    }

    /// One pass over the fan of triangles around bootstrap vertex `s`,
    /// performing at most one flip. Returns whether a flip happened.
    fn convexify_fan(
        &mut self,
        s: Vec2,
        along: Vec2,
        sv: &[Vec2; 3],
    ) -> Result<bool, TriangulateError> {
        let mut fan: Vec<(f32, usize)> = Vec::new();
        for i in 0..self.set.len() {
            let t = self.set[i];
            if t.has_vertex(s) {
                fan.push((ccw_angle(along, t.centroid() - s), i));
            }
        }
        fan.sort_by(|x, y| x.0.total_cmp(&y.0));
        for pair in fan.windows(2) {
            let (i, j) = (pair[0].1, pair[1].1);
            let (t1, t2) = (self.set[i], self.set[j]);
            let Some(shared) = t1.shared_edge(&t2) else {
                continue;
            };
            if !shared.has_vertex(s) {
                continue;
            }
            let (Some(o1), Some(o2)) = (t1.opposite_vertex(&shared), t2.opposite_vertex(&shared))
            else {
                continue;
            };
            if sv.contains(&o1) || sv.contains(&o2) {
                continue; // the flipped diagonal may not touch the bootstrap triangle
            }
            // the quad's angles at the shared edge's endpoints must stay
            // strictly under a half turn for the flip to remain convex
            let at_a = t1.angle_at(shared.a) + t2.angle_at(shared.a);
            let at_b = t1.angle_at(shared.b) + t2.angle_at(shared.b);
            if at_a + at_b >= PI - ANGLE_EPSILON {
                continue;
            }
            if !is_convex_quad(shared.a, o1, shared.b, o2) {
                continue;
            }
            let n1 = Triangle::new(o1, o2, shared.a);
            let n2 = Triangle::new(o1, o2, shared.b);
            if n1.is_degenerate() || n2.is_degenerate() {
                continue;
            }
            self.flip(i, j, n1, n2)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Repairs the seam between two fans: when the last triangle of one
    /// hull stretch and the first of the next share a hull vertex but no
    /// edge, the notch at that vertex is still covered only through the
    /// bootstrap triangle. Replacing the pair with the hull-side ear keeps
    /// the hull covered once the bootstrap triangles go away.
    fn merge_split_fans(&mut self, sv: &[Vec2; 3]) -> Result<bool, TriangulateError> {
        let hull_pair = |t: &Triangle| -> Option<[Vec2; 2]> {
            let mut pair = [Vec2::default(); 2];
            let mut n = 0;
            for v in t.vertices() {
                if sv.contains(&v) {
                    continue;
                }
                if n == 2 {
                    return None; // touches no bootstrap vertex
                }
                pair[n] = v;
                n += 1;
            }
            if n == 2 {
                Some(pair)
            } else {
                None
            }
        };
        for i in 0..self.set.len() {
            let Some(h1) = hull_pair(&self.set[i]) else {
                continue;
            };
            for j in 0..self.set.len() {
                if j == i {
                    continue;
                }
                let Some(h2) = hull_pair(&self.set[j]) else {
                    continue;
                };
                if self.set[i].shared_edge(&self.set[j]).is_some() {
                    continue;
                }
                let mut common = h1.iter().copied().filter(|v| h2.contains(v));
                let (Some(m), None) = (common.next(), common.next()) else {
                    continue;
                };
                let a = if h1[0] == m { h1[1] } else { h1[0] };
                let c = if h2[0] == m { h2[1] } else { h2[0] };
                let ear = Triangle::new(a, m, c);
                if !self.can_accept_ear(&ear, sv) {
                    continue;
                }
                let (hi, lo) = if i > j { (i, j) } else { (j, i) };
                self.set.swap_remove(hi);
                self.set.swap_remove(lo);
                self.set.push(ear)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Acceptance test for a repair ear during convexification. Triangles
    /// still touching a bootstrap vertex are transient and get deleted once
    /// convexification finishes, so their edges must not veto the ear; a
    /// thin hull otherwise stalls with every candidate ear crossing a
    /// bootstrap wedge and loses the region the wedges covered.
    fn can_accept_ear(&self, ear: &Triangle, sv: &[Vec2; 3]) -> bool {
        if ear.is_degenerate() {
            return false;
        }
        if self.set.iter().any(|other| other == ear) {
            return false;
        }
        for other in self.set.iter() {
            if sv.iter().any(|s| other.has_vertex(*s)) {
                continue;
            }
            for oe in other.edges() {
                for ee in ear.edges() {
                    if ee.properly_intersects(&oe) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Relaxes the whole set to the Delaunay condition: any shared edge
    /// whose opposite angles sum past a half turn is flipped, and the scan
    /// restarts until a full pass is clean.
    fn legalize(&mut self) -> Result<(), TriangulateError> {
        let mut flips = 0usize;
        'scan: loop {
            for i in 0..self.set.len() {
                for j in (i + 1)..self.set.len() {
                    let (t1, t2) = (self.set[i], self.set[j]);
                    let Some(shared) = t1.shared_edge(&t2) else {
                        continue;
                    };
                    let (Some(o1), Some(o2)) =
                        (t1.opposite_vertex(&shared), t2.opposite_vertex(&shared))
                    else {
                        continue;
                    };
                    if t1.angle_at(o1) + t2.angle_at(o2) <= PI + ANGLE_EPSILON {
                        continue;
                    }
                    if !is_convex_quad(shared.a, o1, shared.b, o2) {
                        continue;
                    }
                    let n1 = Triangle::new(o1, o2, shared.a);
                    let n2 = Triangle::new(o1, o2, shared.b);
                    if n1.is_degenerate() || n2.is_degenerate() {
                        continue;
                    }
                    self.flip(i, j, n1, n2)?;
                    flips += 1;
                    continue 'scan;
                }
            }
            if flips > 0 {
                trace!("legalization converged after {flips} flips");
            }
            return Ok(());
        }
    }

    /// Replaces the pair at `i` and `j` with the flipped pair.
    fn flip(
        &mut self,
        i: usize,
        j: usize,
        n1: Triangle,
        n2: Triangle,
    ) -> Result<(), TriangulateError> {
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        self.set.swap_remove(hi);
        self.set.swap_remove(lo);
        self.set.push(n1)?;
        self.set.push(n2)
    }

    /// Forces one constraint edge into the triangulation.
    ///
    /// Every triangle crossed by the edge is removed, its vertices are
    /// classified by side into two half polygons (vertices on the edge
    /// belong to both), each half is retriangulated recursively, and the
    /// sub-triangles that fit the vacated region are taken back in.
    fn insert_constraint(&mut self, edge: &Edge) -> Result<(), TriangulateError> {
        if self.set.contains_edge(edge) {
            return Ok(());
        }
        let dir = edge.direction();
        let len = dir.length();
        if len <= EPSILON {
            return Err(TriangulateError::ConstraintGeometry);
        }
        let mut halves = [vec![edge.a, edge.b], vec![edge.a, edge.b]];
        let mut removed = 0usize;
        let mut i = 0;
        while i < self.set.len() {
            let t = self.set[i];
            let crossed = t
                .edges()
                .iter()
                .any(|e| !e.shares_vertex(edge) && e.properly_intersects(edge));
            if !crossed {
                i += 1;
                continue;
            }
            for v in t.vertices() {
                let side = dir.cross(v - edge.a) / len;
                if side >= -EPSILON {
                    push_unique(&mut halves[0], v);
                }
                if side <= EPSILON {
                    push_unique(&mut halves[1], v);
                }
            }
            self.set.swap_remove(i);
            removed += 1;
        }
        if removed == 0 {
            // nothing crosses the edge yet it is absent: the outline self-intersects
            return Err(TriangulateError::ConstraintGeometry);
        }
        trace!(
            "constraint cut {} triangles into halves of {} and {} points",
            removed,
            halves[0].len(),
            halves[1].len()
        );
        for half in &mut halves {
            if half.len() < 3 {
                return Err(TriangulateError::ConstraintGeometry);
            }
            let sub = triangulate_points(half)?;
            for t in sub.iter() {
                if !self.can_accept(t) {
                    continue;
                }
                // a survivor with all three vertices inside or on the
                // accepted candidate is covered by it and must go, or the
                // two would overlap without any edge crossing
                self.set.retain(|s| {
                    !s.vertices()
                        .iter()
                        .all(|v| t.classify(*v) != Containment::Outside)
                });
                self.set.push(*t)?;
            }
        }
        if !self.set.contains_edge(edge) {
            // a vertex sat exactly on the edge and split it during
            // retriangulation, so the edge cannot be forced as given
            return Err(TriangulateError::ConstraintGeometry);
        }
        Ok(())
    }

    /// A candidate triangle may join the set if it has area, is not already
    /// present, and none of its edges properly intersects a surviving edge.
    /// Candidates that fail are subsumed by or in conflict with geometry
    /// already present and are dropped.
    fn can_accept(&self, t: &Triangle) -> bool {
        if t.is_degenerate() {
            return false;
        }
        if self.set.iter().any(|other| other == t) {
            return false;
        }
        for other in self.set.iter() {
            for oe in other.edges() {
                for te in t.edges() {
                    if te.properly_intersects(&oe) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

fn check_constraints(points: &[Vec2], constraints: &[Edge]) -> Result<(), TriangulateError> {
    for (i, edge) in constraints.iter().enumerate() {
        if !points.contains(&edge.a) || !points.contains(&edge.b) {
            return Err(TriangulateError::ConstraintGeometry);
        }
        for other in &constraints[i + 1..] {
            if edge.properly_intersects(other) {
                return Err(TriangulateError::ConstraintGeometry);
            }
        }
    }
    Ok(())
}

fn push_unique(points: &mut Vec<Vec2>, p: Vec2) {
    if !points.contains(&p) {
        points.push(p);
    }
}

/// A constraint set bounds closed loops exactly when every constrained
/// point has even degree.
fn forms_closed_loops(constraints: &[Edge]) -> bool {
    let mut degrees: Vec<(Vec2, usize)> = Vec::new();
    for edge in constraints {
        for v in [edge.a, edge.b] {
            match degrees.iter_mut().find(|(p, _)| *p == v) {
                Some((_, d)) => *d += 1,
                None => degrees.push((v, 1)),
            }
        }
    }
    !degrees.is_empty() && degrees.iter().all(|(_, d)| d % 2 == 0)
}

fn remove_exterior(set: &mut TriangleSet, outline: &[Edge]) {
    let before = set.len();
    set.retain(|t| point_in_outline(t.centroid(), outline));
    debug!(
        "removed {} triangles outside the outline",
        before - set.len()
    );
}

/// Even-odd containment test with a leftward horizontal ray, skipping
/// horizontal edges. Centroids of valid triangles never sit on the
/// outline itself, so the parity is stable.
fn point_in_outline(p: Vec2, outline: &[Edge]) -> bool {
    let mut counter = 0;
    for edge in outline {
        let (u, b) = if edge.a.y > edge.b.y {
            (edge.a, edge.b)
        } else {
            (edge.b, edge.a)
        };
        if !(p.y <= u.y && p.y > b.y) {
            continue;
        }
        let dy = u.y - b.y;
        if dy.abs() <= EPSILON {
            continue;
        }
        let dx = p.x - (p.y - b.y) / dy * (u.x - b.x) - b.x;
        if dx >= 0. {
            counter += 1;
        }
    }
    counter & 1 == 1
}
