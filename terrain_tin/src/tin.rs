//! Index based triangle mesh for 2.5D terrain surfaces.

use log::debug;

use crate::bins::BinGrid;
use crate::crs::Crs;
use crate::geometry::{barycentric, cross2d, segments_intersect, Point, Vec3};
use crate::progress::{NoProgress, Progress};

/// Default bucket count for [`TinMesh::weld_vertices`].
pub const DEFAULT_WELD_BUCKETS: usize = 4000;

/// Named surface material attachable to individual triangles.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceType {
    pub texture: String,
    pub tiled: bool,
}

/// A mesh vertex: planar position, elevation and an optional normal.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    pub point: Point,
    pub elevation: f32,
    pub normal: Option<Vec3>,
}

/// Three vertex indices, counter-clockwise when viewed from above, plus an
/// optional reference into the surface type table.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Triangle {
    pub v: [usize; 3],
    pub surface: Option<usize>,
}

/// Bounding rectangle and elevation range of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extents {
    pub min: Point,
    pub max: Point,
    pub min_elevation: f32,
    pub max_elevation: f32,
}

/// Triangulated irregular network with per-triangle surface materials.
///
/// Vertices are identified by their position in the vertex sequence; the
/// removal operations renumber surviving triangle references so that every
/// stored index stays valid. The cached extents and the triangle bucket grid
/// are derived state: extents are recomputed by the operations that change
/// geometry, the bucket grid is discarded on any mutation and rebuilt on
/// demand with [`setup_triangle_bins`](TinMesh::setup_triangle_bins).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TinMesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub surface_types: Vec<SurfaceType>,
    pub crs: Option<Crs>,
    extents: Option<Extents>,
    #[serde(skip)]
    tri_bins: Option<BinGrid>,
}

impl TinMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Extents cached by the last [`compute_extents`](TinMesh::compute_extents).
    pub fn extents(&self) -> Option<Extents> {
        self.extents
    }

    pub fn has_triangle_bins(&self) -> bool {
        self.tri_bins.is_some()
    }

    /// Appends a vertex and returns its index. Duplicates are not detected;
    /// callers wanting deduplication run [`weld_vertices`](TinMesh::weld_vertices)
    /// afterwards.
    pub fn add_vertex(&mut self, point: Point, elevation: f32) -> usize {
        self.tri_bins = None;
        self.vertices.push(Vertex {
            point,
            elevation,
            normal: None,
        });
        self.vertices.len() - 1
    }

    pub fn add_vertex_with_normal(&mut self, point: Point, elevation: f32, normal: Vec3) -> usize {
        let index = self.add_vertex(point, elevation);
        self.vertices[index].normal = Some(normal);
        index
    }

    /// Appends a triangle and returns its index. The indices are not range
    /// checked; producing valid references is the caller's responsibility.
    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> usize {
        self.tri_bins = None;
        self.triangles.push(Triangle {
            v: [a, b, c],
            surface: None,
        });
        self.triangles.len() - 1
    }

    pub fn add_triangle_with_surface(
        &mut self,
        a: usize,
        b: usize,
        c: usize,
        surface: usize,
    ) -> usize {
        let index = self.add_triangle(a, b, c);
        self.triangles[index].surface = Some(surface);
        index
    }

    /// Appends a surface type and returns its index for use by
    /// [`add_triangle_with_surface`](TinMesh::add_triangle_with_surface).
    pub fn add_surface_type(&mut self, texture: &str, tiled: bool) -> usize {
        self.surface_types.push(SurfaceType {
            texture: texture.to_string(),
            tiled,
        });
        self.surface_types.len() - 1
    }

    /// Removes vertex `index` together with every triangle referencing it.
    /// Surviving triangle references above `index` are renumbered. An
    /// out-of-range index is silently ignored.
    pub fn remove_vertex(&mut self, index: usize) {
        if index >= self.vertices.len() {
            return;
        }
        self.tri_bins = None;
        self.vertices.remove(index);
        self.triangles.retain(|t| !t.v.contains(&index));
        for tri in &mut self.triangles {
            for v in &mut tri.v {
                if *v > index {
                    *v -= 1;
                }
            }
        }
    }

    /// Removes triangle `index`. Vertices are untouched. An out-of-range
    /// index is silently ignored.
    pub fn remove_triangle(&mut self, index: usize) {
        if index >= self.triangles.len() {
            return;
        }
        self.tri_bins = None;
        self.triangles.remove(index);
    }

    /// Removes every vertex not referenced by any triangle, renumbering the
    /// surviving references in a single compaction pass. Returns the number
    /// of vertices removed.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let total = self.vertices.len();
        let mut used = vec![false; total];
        for tri in &self.triangles {
            for &v in &tri.v {
                used[v] = true;
            }
        }
        let mut remap = vec![usize::MAX; total];
        let mut kept = 0;
        for (i, flag) in used.iter().enumerate() {
            if *flag {
                remap[i] = kept;
                kept += 1;
            }
        }
        if kept == total {
            return 0;
        }
        self.tri_bins = None;
        let old = std::mem::take(&mut self.vertices);
        self.vertices = old
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| used[i].then_some(v))
            .collect();
        for tri in &mut self.triangles {
            for v in &mut tri.v {
                *v = remap[*v];
            }
        }
        total - kept
    }

    /// Drops all buffers, the surface type table, the CRS and the derived
    /// state so the mesh can be reused for a new load.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.surface_types.clear();
        self.crs = None;
        self.extents = None;
        self.tri_bins = None;
    }

    pub(crate) fn scan_extents(&self) -> Option<Extents> {
        let first = self.vertices.first()?;
        let mut ext = Extents {
            min: first.point,
            max: first.point,
            min_elevation: first.elevation,
            max_elevation: first.elevation,
        };
        for v in &self.vertices[1..] {
            ext.min.x = ext.min.x.min(v.point.x);
            ext.min.y = ext.min.y.min(v.point.y);
            ext.max.x = ext.max.x.max(v.point.x);
            ext.max.y = ext.max.y.max(v.point.y);
            ext.min_elevation = ext.min_elevation.min(v.elevation);
            ext.max_elevation = ext.max_elevation.max(v.elevation);
        }
        Some(ext)
    }

    pub(crate) fn set_extents(&mut self, extents: Extents) {
        self.extents = Some(extents);
    }

    /// Recomputes the cached extents with a single scan. Returns `false`
    /// when the mesh has no vertices.
    pub fn compute_extents(&mut self) -> bool {
        self.extents = self.scan_extents();
        self.extents.is_some()
    }

    /// Translates every vertex position by `(dx, dy)` and recomputes the
    /// extents.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.tri_bins = None;
        for v in &mut self.vertices {
            v.point.x += dx;
            v.point.y += dy;
        }
        self.compute_extents();
    }

    /// Multiplies every elevation by `factor` and recomputes the extents.
    /// Positions are untouched.
    pub fn scale_elevation(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.elevation *= factor;
        }
        self.compute_extents();
    }

    /// Adds `amount` to every elevation and recomputes the extents.
    pub fn raise_elevation(&mut self, amount: f32) {
        for v in &mut self.vertices {
            v.elevation += amount;
        }
        self.compute_extents();
    }

    /// Transforms every vertex position from the mesh CRS to `target`, adopts
    /// `target` as the mesh CRS and recomputes the extents. Elevations are
    /// untouched. Returns `false` without mutating anything when the mesh has
    /// no CRS or the pair is not convertible.
    pub fn convert_projection(&mut self, target: &Crs) -> bool {
        let Some(source) = &self.crs else {
            return false;
        };
        let mut coords: Vec<(f64, f64)> = self
            .vertices
            .iter()
            .map(|v| (v.point.x, v.point.y))
            .collect();
        if !source.transform_points(target, &mut coords) {
            return false;
        }
        for (v, (x, y)) in self.vertices.iter_mut().zip(coords) {
            v.point = Point::new(x, y);
        }
        self.crs = Some(target.clone());
        self.tri_bins = None;
        self.compute_extents();
        true
    }

    fn triangle_bounds(&self, tri: &Triangle) -> (Point, Point) {
        let [a, b, c] = tri.v.map(|i| self.vertices[i].point);
        let min = Point::new(a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y));
        let max = Point::new(a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y));
        (min, max)
    }

    /// Builds the triangle bucket grid used by [`elevation_at`](TinMesh::elevation_at),
    /// discarding any previous grid. A triangle is referenced from every
    /// bucket its bounding box overlaps. Recomputes the extents as part of
    /// the build.
    pub fn setup_triangle_bins(&mut self, per_axis: usize) {
        self.tri_bins = None;
        if !self.compute_extents() {
            return;
        }
        let Some(ext) = self.extents else {
            return;
        };
        let mut grid = BinGrid::new(ext.min, ext.max, per_axis, per_axis);
        for (i, tri) in self.triangles.iter().enumerate() {
            let (min, max) = self.triangle_bounds(tri);
            grid.insert_rect(min, max, i);
        }
        debug!(
            "binned {} triangles into a {}x{} grid",
            self.triangles.len(),
            grid.cols(),
            grid.rows()
        );
        self.tri_bins = Some(grid);
    }

    /// Interpolated elevation of `p` inside triangle `index`, or `None` when
    /// `p` lies outside it, the triangle is degenerate or `index` is out of
    /// range.
    pub fn test_triangle(&self, index: usize, p: Point) -> Option<f32> {
        let tri = self.triangles.get(index)?;
        let [a, b, c] = tri.v.map(|i| self.vertices[i]);
        let (u, v, w) = barycentric(a.point, b.point, c.point, p)?;
        if u < 0.0 || v < 0.0 || w < 0.0 {
            return None;
        }
        Some((u * a.elevation as f64 + v * b.elevation as f64 + w * c.elevation as f64) as f32)
    }

    /// Index of the triangle containing `p`, or `None` outside the
    /// triangulated region. Where triangles overlap the lowest index wins:
    /// buckets hold indices in ascending order and the linear fallback scans
    /// in the same order, so binned and unbinned lookups agree.
    pub fn triangle_at(&self, p: Point) -> Option<usize> {
        if let Some(grid) = &self.tri_bins {
            let cell = grid.cell_at(p);
            return grid
                .entries(cell)
                .iter()
                .copied()
                .find(|&t| self.test_triangle(t, p).is_some());
        }
        (0..self.triangles.len()).find(|&t| self.test_triangle(t, p).is_some())
    }

    /// Elevation of the surface at `p`, or `None` outside the triangulated
    /// region. Uses the triangle bucket grid when one has been built and
    /// degrades to a linear scan otherwise.
    pub fn elevation_at(&self, p: Point) -> Option<f32> {
        self.test_triangle(self.triangle_at(p)?, p)
    }

    /// Transforms a coordinate given in `source` into the mesh CRS and
    /// queries the elevation there. `None` when the mesh has no CRS, the
    /// pair is not convertible or the point lies outside the surface.
    pub fn elevation_at_transformed(&self, p: Point, source: &Crs) -> Option<f32> {
        let crs = self.crs.as_ref()?;
        let (x, y) = source.transform_point(crs, p.x, p.y)?;
        self.elevation_at(Point::new(x, y))
    }

    /// Unit normal of triangle `index`, `None` for a degenerate triangle or
    /// an out-of-range index.
    pub fn face_normal(&self, index: usize) -> Option<Vec3> {
        let tri = self.triangles.get(index)?;
        let (nx, ny, nz) = self.face_normal_raw(tri);
        let len = (nx * nx + ny * ny + nz * nz).sqrt();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Vec3::new(
            (nx / len) as f32,
            (ny / len) as f32,
            (nz / len) as f32,
        ))
    }

    // Unnormalized cross product of two triangle edges; its length is twice
    // the face area, which is what the vertex normal accumulation weights by.
    fn face_normal_raw(&self, tri: &Triangle) -> (f64, f64, f64) {
        let [a, b, c] = tri.v.map(|i| self.vertices[i]);
        let ux = b.point.x - a.point.x;
        let uy = b.point.y - a.point.y;
        let uz = (b.elevation - a.elevation) as f64;
        let vx = c.point.x - a.point.x;
        let vy = c.point.y - a.point.y;
        let vz = (c.elevation - a.elevation) as f64;
        (uy * vz - uz * vy, uz * vx - ux * vz, ux * vy - uy * vx)
    }

    /// Face normal of the triangle containing `p`.
    pub fn surface_normal_at(&self, p: Point) -> Option<Vec3> {
        self.face_normal(self.triangle_at(p)?)
    }

    /// Fills every vertex normal with the area weighted average of its
    /// incident face normals. Vertices with no incident triangle keep `None`.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![(0.0f64, 0.0f64, 0.0f64); self.vertices.len()];
        for tri in &self.triangles {
            let (nx, ny, nz) = self.face_normal_raw(tri);
            for &i in &tri.v {
                sums[i].0 += nx;
                sums[i].1 += ny;
                sums[i].2 += nz;
            }
        }
        for (v, (x, y, z)) in self.vertices.iter_mut().zip(sums) {
            let len = (x * x + y * y + z * z).sqrt();
            v.normal = if len > f64::EPSILON {
                Some(Vec3::new((x / len) as f32, (y / len) as f32, (z / len) as f32))
            } else {
                None
            };
        }
    }

    /// Reorders clockwise triangles to counter-clockwise by swapping their
    /// second and third indices, so every signed area ends up non-negative.
    /// Idempotent. Returns the number of triangles flipped.
    pub fn fix_winding(&mut self) -> usize {
        let mut flipped = 0;
        for index in 0..self.triangles.len() {
            let [a, b, c] = self.triangles[index].v.map(|i| self.vertices[i].point);
            if cross2d(a, b, c) < 0.0 {
                self.triangles[index].v.swap(1, 2);
                flipped += 1;
            }
        }
        flipped
    }

    /// Removes every triangle with an edge intersecting the segment
    /// `p1`..`p2`, then prunes vertices left unreferenced and recomputes the
    /// extents. Returns the number of triangles removed.
    pub fn remove_triangles_crossing(&mut self, p1: Point, p2: Point) -> usize {
        let before = self.triangles.len();
        let vertices = &self.vertices;
        self.triangles.retain(|tri| {
            let [a, b, c] = tri.v.map(|i| vertices[i].point);
            !(segments_intersect(a, b, p1, p2)
                || segments_intersect(b, c, p1, p2)
                || segments_intersect(c, a, p1, p2))
        });
        let removed = before - self.triangles.len();
        if removed > 0 {
            self.tri_bins = None;
            self.remove_unused_vertices();
            self.compute_extents();
        }
        removed
    }

    /// Merges vertices sharing an exact planar position, keeping the lowest
    /// index of each duplicate set. Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, buckets: usize) -> usize {
        self.weld_vertices_with_progress(buckets, &mut NoProgress)
            .unwrap_or(0)
    }

    /// Exact-position vertex weld. Vertices are bucketed by X coordinate so
    /// only pairs within one bucket or in the adjacent bucket are compared;
    /// equal-position sets are tracked in a disjoint set and every triangle
    /// reference is rewritten to the compacted survivor index. The dedup
    /// criterion is exact floating point equality, not a distance threshold.
    /// Returns `None` without mutating the mesh when `progress` cancels.
    pub fn weld_vertices_with_progress(
        &mut self,
        buckets: usize,
        progress: &mut dyn Progress,
    ) -> Option<usize> {
        let total = self.vertices.len();
        if total < 2 {
            progress.report(100);
            return Some(0);
        }
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        for v in &self.vertices {
            min_x = min_x.min(v.point.x);
            max_x = max_x.max(v.point.x);
        }
        let mut grid = BinGrid::new(Point::new(min_x, 0.0), Point::new(max_x, 0.0), buckets, 1);
        for (i, v) in self.vertices.iter().enumerate() {
            grid.insert(Point::new(v.point.x, 0.0), i);
        }
        let mut set = DisjointSet::new(total);
        let cells = grid.len();
        for cell in 0..cells {
            let current = grid.entries(cell);
            for (k, &i) in current.iter().enumerate() {
                for &j in &current[k + 1..] {
                    if self.vertices[i].point == self.vertices[j].point {
                        set.union(i, j);
                    }
                }
            }
            if cell + 1 < cells {
                for &i in current {
                    for &j in grid.entries(cell + 1) {
                        if self.vertices[i].point == self.vertices[j].point {
                            set.union(i, j);
                        }
                    }
                }
            }
            if cell % 64 == 0 && progress.report((cell * 100 / cells) as u32) {
                return None;
            }
        }
        let roots: Vec<usize> = (0..total).map(|i| set.find(i)).collect();
        let mut remap = vec![usize::MAX; total];
        let mut kept = 0;
        for i in 0..total {
            if roots[i] == i {
                remap[i] = kept;
                kept += 1;
            }
        }
        if kept == total {
            progress.report(100);
            return Some(0);
        }
        // union keeps the lowest index as root, so remap[root] is always
        // filled before any higher duplicate reaches it
        for i in 0..total {
            if remap[i] == usize::MAX {
                remap[i] = remap[roots[i]];
            }
        }
        self.tri_bins = None;
        let old = std::mem::take(&mut self.vertices);
        self.vertices = old
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| (roots[i] == i).then_some(v))
            .collect();
        for tri in &mut self.triangles {
            for v in &mut tri.v {
                *v = remap[*v];
            }
        }
        self.compute_extents();
        debug!("welded {} duplicate vertices", total - kept);
        progress.report(100);
        Some(total - kept)
    }
}

/// Disjoint set with path compression; union keeps the lowest index as the
/// root, which makes the lowest index of every duplicate set its survivor.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if ra < rb {
            self.parent[rb] = ra;
        } else {
            self.parent[ra] = rb;
        }
    }
}
