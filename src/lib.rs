mod geom;
mod triangle_set;
mod triangulation;
mod vec2;

pub use {
    geom::{Edge, Triangle},
    triangle_set::TriangleSet,
    triangulation::{convex_hull, triangulate, TriangulateError},
    vec2::Vec2,
};

#[cfg(test)]
mod test;
