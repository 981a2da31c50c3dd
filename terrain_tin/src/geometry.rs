//! Geometry primitives and the pure predicates used by the TIN engine.

/// Representation of a 2D point on the earth plane.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Single precision 3D vector, used for surface normals.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the vector scaled to unit length, or `None` for a zero vector.
    pub fn normalized(self) -> Option<Vec3> {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len <= f32::EPSILON {
            None
        } else {
            Some(Vec3::new(self.x / len, self.y / len, self.z / len))
        }
    }
}

/// Signed parallelogram area of `(b - a) x (c - a)`. Positive when the
/// triangle `a`, `b`, `c` winds counter-clockwise.
pub fn cross2d(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Barycentric weights of `p` with respect to the triangle `a`, `b`, `c`.
/// Returns `None` when the triangle has no area. The weights sum to 1 and
/// are all non-negative exactly when `p` lies inside or on the triangle.
pub fn barycentric(a: Point, b: Point, c: Point, p: Point) -> Option<(f64, f64, f64)> {
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if det.abs() < f64::EPSILON {
        return None;
    }
    let u = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let v = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    Some((u, v, 1.0 - u - v))
}

/// Returns `true` if `p` lies inside or on the boundary of the triangle
/// `a`, `b`, `c`. Degenerate triangles contain nothing.
pub fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    match barycentric(a, b, c, p) {
        Some((u, v, w)) => u >= 0.0 && v >= 0.0 && w >= 0.0,
        None => false,
    }
}

fn in_bounding_box(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Returns `true` if the segments `p1`..`p2` and `p3`..`p4` intersect.
/// Touching at an endpoint and collinear overlap both count as intersections.
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let d1 = cross2d(p3, p4, p1);
    let d2 = cross2d(p3, p4, p2);
    let d3 = cross2d(p1, p2, p3);
    let d4 = cross2d(p1, p2, p4);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && in_bounding_box(p3, p4, p1))
        || (d2 == 0.0 && in_bounding_box(p3, p4, p2))
        || (d3 == 0.0 && in_bounding_box(p1, p2, p3))
        || (d4 == 0.0 && in_bounding_box(p1, p2, p4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross2d_sign_matches_winding() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.0, 1.0);
        assert!(cross2d(a, b, c) > 0.0);
        assert!(cross2d(a, c, b) < 0.0);
    }

    #[test]
    fn barycentric_weights_sum_to_one() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let c = Point::new(0.0, 10.0);
        let (u, v, w) = barycentric(a, b, c, Point::new(2.0, 3.0)).unwrap();
        assert!((u + v + w - 1.0).abs() < 1e-12);
        assert!(u >= 0.0 && v >= 0.0 && w >= 0.0);
    }

    #[test]
    fn barycentric_degenerate_fails() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 1.0);
        let c = Point::new(2.0, 2.0);
        assert!(barycentric(a, b, c, Point::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn point_in_triangle_agrees_with_barycentric() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 0.0);
        let c = Point::new(0.0, 4.0);
        assert!(point_in_triangle(Point::new(1.0, 1.0), a, b, c));
        assert!(point_in_triangle(Point::new(2.0, 0.0), a, b, c));
        assert!(!point_in_triangle(Point::new(5.0, 5.0), a, b, c));
    }

    #[test]
    fn segments_crossing() {
        let hit = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
        );
        assert!(hit);
    }

    #[test]
    fn segments_touching_at_endpoint() {
        let hit = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 1.0),
        );
        assert!(hit);
    }

    #[test]
    fn segments_disjoint() {
        let hit = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        );
        assert!(!hit);
    }

    #[test]
    fn segments_collinear_overlap() {
        let hit = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(3.0, 0.0),
        );
        assert!(hit);
    }

    #[test]
    fn vec3_normalized() {
        let n = Vec3::new(0.0, 3.0, 4.0).normalized().unwrap();
        assert!((n.y - 0.6).abs() < 1e-6);
        assert!((n.z - 0.8).abs() < 1e-6);
        assert!(Vec3::new(0.0, 0.0, 0.0).normalized().is_none());
    }
}
