use std::ops::Index;

use crate::{
    geom::{Edge, Triangle},
    triangulation::TriangulateError,
};

/// The central mutable bag of triangles threaded through every pass.
///
/// Unordered storage with O(1) swap-with-last removal. The pool is bounded
/// at construction time; running past the bound reports
/// [`TriangulateError::CapacityExceeded`] instead of growing silently, which
/// turns runaway retriangulation into a diagnosable error.
#[derive(Debug, Default)]
pub struct TriangleSet {
    triangles: Vec<Triangle>,
    limit: usize,
}

impl TriangleSet {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(limit),
            limit,
        }
    }

    pub(crate) fn push(&mut self, triangle: Triangle) -> Result<(), TriangulateError> {
        if self.triangles.len() >= self.limit {
            return Err(TriangulateError::CapacityExceeded);
        }
        self.triangles.push(triangle);
        Ok(())
    }

    /// Removes the triangle at `index`, moving the last one into its slot.
    /// Indices above `index` held across this call are invalidated.
    pub(crate) fn swap_remove(&mut self, index: usize) -> Triangle {
        self.triangles.swap_remove(index)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Triangle) -> bool) {
        self.triangles.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triangle> {
        self.triangles.iter()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn into_vec(self) -> Vec<Triangle> {
        self.triangles
    }

    /// Does any triangle carry this edge (as an unordered pair)?
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.triangles.iter().any(|t| t.has_edge(edge))
    }
}

impl Index<usize> for TriangleSet {
    type Output = Triangle;

    fn index(&self, index: usize) -> &Self::Output {
        &self.triangles[index]
    }
}

impl<'a> IntoIterator for &'a TriangleSet {
    type Item = &'a Triangle;
    type IntoIter = std::slice::Iter<'a, Triangle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
