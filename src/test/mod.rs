use approx::assert_relative_eq;
use proptest::prelude::*;

use crate::{
    geom::Containment, convex_hull, triangulate, Edge, Triangle, TriangleSet, TriangulateError,
    Vec2,
};

fn points(coords: &[[f32; 2]]) -> Vec<Vec2> {
    coords.iter().map(|&c| Vec2::from(c)).collect()
}

fn total_area(set: &TriangleSet) -> f32 {
    set.iter().map(Triangle::area).sum()
}

fn overlapping(a: &Triangle, b: &Triangle) -> bool {
    for ea in a.edges() {
        for eb in b.edges() {
            if ea.properly_intersects(&eb) {
                return true;
            }
        }
    }
    a.classify(b.centroid()) == Containment::Inside
        || b.classify(a.centroid()) == Containment::Inside
}

fn assert_no_overlap(set: &TriangleSet) {
    for i in 0..set.len() {
        for j in (i + 1)..set.len() {
            assert!(
                !overlapping(&set[i], &set[j]),
                "{:?} overlaps {:?}",
                set[i],
                set[j]
            );
        }
    }
}

#[test]
fn unit_square() {
    let mut pts = points(&[[1., 1.], [1., 0.], [0., 0.], [0., 1.]]);
    let set = triangulate(&mut pts, &[]).unwrap();
    assert_eq!(set.len(), 2);
    assert_relative_eq!(total_area(&set), 1., epsilon = 1e-4);
}

#[test]
fn pentagon() {
    let mut pts = points(&[[0., 2.], [2., 0.5], [1.2, -2.], [-1.2, -2.], [-2., 0.5]]);
    let set = triangulate(&mut pts, &[]).unwrap();
    assert_eq!(set.len(), 3);
}

#[test]
fn square_with_center() {
    // the center lands exactly on a diagonal and takes the on-edge split
    let mut pts = points(&[[0., 0.], [2., 0.], [2., 2.], [0., 2.], [1., 1.]]);
    let set = triangulate(&mut pts, &[]).unwrap();
    assert_eq!(set.len(), 4);
    let center = Vec2::new(1., 1.);
    assert!(set.iter().all(|t| t.has_vertex(center)));
    assert_relative_eq!(total_area(&set), 4., epsilon = 1e-4);
}

#[test]
fn square_diagonal_constraints() {
    for diagonal in [
        Edge::new(Vec2::new(0., 0.), Vec2::new(1., 1.)),
        Edge::new(Vec2::new(1., 0.), Vec2::new(0., 1.)),
    ] {
        let mut pts = points(&[[0., 0.], [1., 0.], [1., 1.], [0., 1.]]);
        let set = triangulate(&mut pts, &[diagonal]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains_edge(&diagonal));
        assert_relative_eq!(total_area(&set), 1., epsilon = 1e-4);
    }
}

#[test]
fn concave_outline_drops_exterior() {
    let (a, b, c, d) = (
        Vec2::new(0., 0.),
        Vec2::new(4., 0.),
        Vec2::new(4., 4.),
        Vec2::new(2., 1.),
    );
    let mut pts = vec![a, b, c, d];
    let outline = [
        Edge::new(a, b),
        Edge::new(b, c),
        Edge::new(c, d),
        Edge::new(d, a),
    ];
    let set = triangulate(&mut pts, &outline).unwrap();
    assert_eq!(set.len(), 2);
    let expect = [Triangle::new(a, b, d), Triangle::new(b, c, d)];
    for t in expect {
        assert!(set.iter().any(|got| *got == t), "missing {t:?}");
    }
}

#[test]
fn square_ring() {
    let mut pts = points(&[
        [0., 0.],
        [4., 0.],
        [4., 4.],
        [0., 4.],
        [1., 1.],
        [3., 1.],
        [3., 3.],
        [1., 3.],
    ]);
    let mut constraints = vec![];
    for ring in [&pts[..4], &pts[4..]] {
        for k in 0..4 {
            constraints.push(Edge::new(ring[k], ring[(k + 1) % 4]));
        }
    }
    let set = triangulate(&mut pts, &constraints).unwrap();
    assert_eq!(set.len(), 8);
    assert_relative_eq!(total_area(&set), 12., epsilon = 1e-3);
    assert_no_overlap(&set);
}

#[test]
fn thin_quad() {
    // the hull of this quad is thin enough that every repair ear during
    // convexification crosses a bootstrap wedge edge
    let mut pts = points(&[[0., 0.], [10., 0.], [3.5, -1.], [2.5, -1.]]);
    let set = triangulate(&mut pts, &[]).unwrap();
    assert_eq!(set.len(), 2);
    assert_relative_eq!(total_area(&set), 5.5, epsilon = 1e-3);
    assert_no_overlap(&set);
}

#[test]
fn triangle_pool_limit() {
    let t = Triangle::new(Vec2::new(0., 0.), Vec2::new(1., 0.), Vec2::new(0., 1.));
    let mut set = TriangleSet::with_limit(1);
    set.push(t).unwrap();
    assert_eq!(
        set.push(t).unwrap_err(),
        TriangulateError::CapacityExceeded
    );
}

#[test]
fn grid_count() {
    let mut pts = vec![];
    for x in 0..3 {
        for y in 0..3 {
            pts.push(Vec2::new(x as f32, y as f32));
        }
    }
    let set = triangulate(&mut pts, &[]).unwrap();
    // 2n - h - 2 with 9 points and 8 on the hull
    assert_eq!(set.len(), 8);
    assert_relative_eq!(total_area(&set), 4., epsilon = 1e-3);
    assert_no_overlap(&set);
}

#[test]
fn degenerate_input() {
    let mut two = points(&[[0., 0.], [1., 0.]]);
    assert_eq!(
        triangulate(&mut two, &[]).unwrap_err(),
        TriangulateError::DegenerateInput
    );

    let mut collinear = points(&[[0., 0.], [1., 1.], [2., 2.], [3., 3.], [4., 4.]]);
    assert_eq!(
        triangulate(&mut collinear, &[]).unwrap_err(),
        TriangulateError::DegenerateInput
    );
}

#[test]
fn bad_constraints() {
    let mut pts = points(&[[0., 0.], [1., 0.], [1., 1.], [0., 1.]]);
    let stranger = Edge::new(Vec2::new(5., 5.), Vec2::new(6., 6.));
    assert_eq!(
        triangulate(&mut pts, &[stranger]).unwrap_err(),
        TriangulateError::ConstraintGeometry
    );

    let mut pts = points(&[[0., 0.], [1., 0.], [1., 1.], [0., 1.]]);
    let crossing = [
        Edge::new(Vec2::new(0., 0.), Vec2::new(1., 1.)),
        Edge::new(Vec2::new(1., 0.), Vec2::new(0., 1.)),
    ];
    assert_eq!(
        triangulate(&mut pts, &crossing).unwrap_err(),
        TriangulateError::ConstraintGeometry
    );
}

#[test]
fn repeatable() {
    let coords = [[0., 2.], [2., 0.5], [1.2, -2.], [-1.2, -2.], [-2., 0.5], [0., 0.]];
    let mut first = points(&coords);
    let mut second = points(&coords);
    let a = triangulate(&mut first, &[]).unwrap();
    let b = triangulate(&mut second, &[]).unwrap();
    assert_eq!(a.len(), b.len());
    assert_relative_eq!(total_area(&a), total_area(&b), epsilon = 1e-4);
}

proptest! {
    #[test]
    fn covers_hull(raw in proptest::collection::hash_set((0u8..8, 0u8..8), 3..12)) {
        let mut pts: Vec<Vec2> = raw
            .into_iter()
            .map(|(x, y)| Vec2::new(x as f32, y as f32))
            .collect();
        let mut hull_pts = pts.clone();
        let Ok(hull_len) = convex_hull(&mut hull_pts) else {
            return Ok(()); // collinear draws carry no area
        };
        let set = triangulate(&mut pts, &[]).unwrap();
        prop_assert_eq!(set.len(), 2 * pts.len() - hull_len - 2);
        assert_no_overlap(&set);
        let mut area = 0.;
        for k in 1..hull_len - 1 {
            area += Triangle::new(hull_pts[0], hull_pts[k], hull_pts[k + 1]).area();
        }
        prop_assert!((total_area(&set) - area).abs() < 1e-2);
    }

    #[test]
    fn forced_chord(
        raw in proptest::collection::hash_set((0u8..8, 0u8..8), 4..12),
        i in 0usize..16,
        j in 0usize..16,
    ) {
        let mut pts: Vec<Vec2> = raw
            .into_iter()
            .map(|(x, y)| Vec2::new(x as f32, y as f32))
            .collect();
        let mut hull_pts = pts.clone();
        let Ok(hull_len) = convex_hull(&mut hull_pts) else {
            return Ok(());
        };
        let a = pts[i % pts.len()];
        let b = pts[j % pts.len()];
        if a == b {
            return Ok(());
        }
        let chord = Edge::new(a, b);
        let set = match triangulate(&mut pts, &[chord]) {
            Ok(set) => set,
            // the chord may run through a third point exactly
            Err(TriangulateError::ConstraintGeometry) => return Ok(()),
            Err(err) => {
                return Err(proptest::test_runner::TestCaseError::fail(format!("{err:?}")))
            }
        };
        prop_assert!(set.contains_edge(&chord));
        assert_no_overlap(&set);
        let mut area = 0.;
        for k in 1..hull_len - 1 {
            area += Triangle::new(hull_pts[0], hull_pts[k], hull_pts[k + 1]).area();
        }
        prop_assert!((total_area(&set) - area).abs() < 1e-2);
    }
}
