//! ESRI ADF TIN triple reader.
//!
//! A surface arrives as three co-located files sharing a base name:
//! `<base>xy.adf` with big endian double position pairs, `<base>z.adf` with
//! big endian float elevations and `<base>od.adf` with big endian 32 bit
//! 1-based triangle indices. The producing software always prepends four
//! synthetic boundary vertices; the first four records are stripped on that
//! assumption (it is not validated), remaining indices are shifted down by
//! four and triangles referencing the boundary are dropped.

use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt};
use log::info;

use crate::geometry::Point;
use crate::progress::{NoProgress, Progress};
use crate::tin::TinMesh;

use super::{cancelled, PROGRESS_BATCH};

const BOUNDARY_VERTS: usize = 4;

/// Reads the `xy`/`z`/`od` file triple starting at `base` (e.g. a base of
/// `"/data/tdn"` reads `/data/tdnxy.adf`, `/data/tdnz.adf` and
/// `/data/tdnod.adf`).
pub fn read_tin_adf(base: &str) -> io::Result<TinMesh> {
    read_tin_adf_with_progress(base, &mut NoProgress)
}

pub fn read_tin_adf_with_progress(base: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    let xy = std::fs::read(format!("{}xy.adf", base))?;
    let z = std::fs::read(format!("{}z.adf", base))?;
    let od = std::fs::read(format!("{}od.adf", base))?;
    if xy.len() % 16 != 0 || z.len() % 4 != 0 || od.len() % 12 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file size is not a whole number of records",
        ));
    }
    let vert_count = xy.len() / 16;
    if z.len() / 4 != vert_count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "position and elevation counts differ",
        ));
    }
    if vert_count < BOUNDARY_VERTS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing the four boundary vertices",
        ));
    }

    let mut xy_cursor = Cursor::new(&xy);
    let mut z_cursor = Cursor::new(&z);
    let mut mesh = TinMesh::new();
    for i in 0..vert_count {
        let x = xy_cursor.read_f64::<BigEndian>()?;
        let y = xy_cursor.read_f64::<BigEndian>()?;
        let elevation = z_cursor.read_f32::<BigEndian>()?;
        if i >= BOUNDARY_VERTS {
            mesh.add_vertex(Point::new(x, y), elevation);
        }
        if i % PROGRESS_BATCH == 0 && progress.report((i * 50 / vert_count) as u32) {
            return Err(cancelled());
        }
    }

    let kept_verts = vert_count - BOUNDARY_VERTS;
    let tri_count = od.len() / 12;
    let mut od_cursor = Cursor::new(&od);
    let mut dropped = 0usize;
    for i in 0..tri_count {
        let a = od_cursor.read_i32::<BigEndian>()?;
        let b = od_cursor.read_i32::<BigEndian>()?;
        let c = od_cursor.read_i32::<BigEndian>()?;
        let mut shifted = [0usize; 3];
        let mut boundary = false;
        for (slot, raw) in shifted.iter_mut().zip([a, b, c]) {
            if raw < 1 || raw as usize > vert_count {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("triangle {} references vertex {} out of range", i, raw),
                ));
            }
            let zero_based = raw as usize - 1;
            if zero_based < BOUNDARY_VERTS {
                boundary = true;
                break;
            }
            *slot = zero_based - BOUNDARY_VERTS;
        }
        if boundary {
            dropped += 1;
        } else {
            mesh.add_triangle(shifted[0], shifted[1], shifted[2]);
        }
        if i % PROGRESS_BATCH == 0 && progress.report((50 + i * 50 / tri_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    mesh.compute_extents();
    info!(
        "read {} vertices and {} triangles ({} boundary triangles dropped) from {}*.adf",
        kept_verts,
        mesh.triangle_count(),
        dropped,
        base
    );
    progress.report(100);
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn write_fixture(dir: &std::path::Path, base: &str) {
        // four boundary vertices followed by a real triangle
        let verts = [
            (-1000.0, -1000.0, 0.0f32),
            (1000.0, -1000.0, 0.0),
            (1000.0, 1000.0, 0.0),
            (-1000.0, 1000.0, 0.0),
            (0.0, 0.0, 1.0),
            (10.0, 0.0, 2.0),
            (0.0, 10.0, 3.0),
        ];
        let mut xy = Vec::new();
        let mut z = Vec::new();
        for (x, y, elev) in verts {
            xy.write_f64::<BigEndian>(x).unwrap();
            xy.write_f64::<BigEndian>(y).unwrap();
            z.write_f32::<BigEndian>(elev).unwrap();
        }
        // one triangle on the boundary (dropped), one real (1-based indices)
        let mut od = Vec::new();
        for idx in [1, 2, 5, 5, 6, 7] {
            od.write_i32::<BigEndian>(idx).unwrap();
        }
        std::fs::write(dir.join(format!("{}xy.adf", base)), xy).unwrap();
        std::fs::write(dir.join(format!("{}z.adf", base)), z).unwrap();
        std::fs::write(dir.join(format!("{}od.adf", base)), od).unwrap();
    }

    #[test]
    fn boundary_vertices_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "surf");
        let base = dir.path().join("surf");
        let mesh = read_tin_adf(base.to_str().unwrap()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangles[0].v, [0, 1, 2]);
        assert_eq!(mesh.vertices[0].point, Point::new(0.0, 0.0));
        assert_eq!(mesh.vertices[2].elevation, 3.0);
        // extents cover only the surviving vertices
        let ext = mesh.extents().unwrap();
        assert_eq!(ext.min, Point::new(0.0, 0.0));
        assert_eq!(ext.max, Point::new(10.0, 10.0));
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "bad");
        let z_path = dir.path().join("badz.adf");
        let mut z = std::fs::read(&z_path).unwrap();
        z.extend_from_slice(&[0, 0, 0, 0]);
        std::fs::write(&z_path, z).unwrap();
        let base = dir.path().join("bad");
        let err = read_tin_adf(base.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
