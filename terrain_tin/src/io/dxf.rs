//! Minimal DXF reader for triangulated entities.
//!
//! Scans the group code / value pair stream for `3DFACE` entities and
//! `POLYLINE`/`VERTEX` sequences. A 3DFACE counts as a triangle when its
//! fourth corner is absent or repeats the third; a polyline counts when it
//! has exactly three vertices. Everything else is skipped. Triangle winding
//! is normalized after the load.

use std::io;

use log::info;

use crate::geometry::Point;
use crate::progress::{NoProgress, Progress};
use crate::tin::TinMesh;

use super::{cancelled, read_lines};

/// Reads triangles from an ASCII DXF file.
pub fn read_tin_dxf(path: &str) -> io::Result<TinMesh> {
    read_tin_dxf_with_progress(path, &mut NoProgress)
}

pub fn read_tin_dxf_with_progress(path: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    let lines = read_lines(path)?;
    let total = lines.len().max(1);
    let mut mesh = TinMesh::new();
    let mut i = 0;
    while i + 1 < lines.len() {
        if i % 200 == 0 && progress.report((i * 100 / total) as u32) {
            return Err(cancelled());
        }
        let code = lines[i].trim();
        let value = lines[i + 1].trim();
        if code != "0" {
            i += 2;
            continue;
        }
        match value {
            "3DFACE" => i = read_face(&lines, i + 2, &mut mesh),
            "POLYLINE" => i = read_polyline(&lines, i + 2, &mut mesh),
            _ => i += 2,
        }
    }
    mesh.fix_winding();
    mesh.compute_extents();
    info!(
        "read {} triangles from DXF {}",
        mesh.triangle_count(),
        path
    );
    progress.report(100);
    Ok(mesh)
}

// Corner coordinates of a 3DFACE arrive as group codes 10..13 (x), 20..23
// (y) and 30..33 (z): the last digit selects the corner, the first the axis.
fn read_face(lines: &[String], mut i: usize, mesh: &mut TinMesh) -> usize {
    let mut corners = [[0.0f64; 3]; 4];
    let mut got = [false; 4];
    while i + 1 < lines.len() {
        let code = lines[i].trim();
        if code == "0" {
            break;
        }
        let value = lines[i + 1].trim();
        if let (Ok(group), Ok(num)) = (code.parse::<u32>(), value.parse::<f64>()) {
            let corner = (group % 10) as usize;
            if corner < 4 {
                match group / 10 {
                    1 => {
                        corners[corner][0] = num;
                        got[corner] = true;
                    }
                    2 => corners[corner][1] = num,
                    3 => corners[corner][2] = num,
                    _ => {}
                }
            }
        }
        i += 2;
    }
    if got[0] && got[1] && got[2] && (!got[3] || corners[3] == corners[2]) {
        push_face(mesh, &corners[..3]);
    }
    i
}

fn read_polyline(lines: &[String], mut i: usize, mesh: &mut TinMesh) -> usize {
    let mut pts: Vec<[f64; 3]> = Vec::new();
    while i + 1 < lines.len() {
        let code = lines[i].trim();
        let value = lines[i + 1].trim();
        if code != "0" {
            i += 2;
            continue;
        }
        match value {
            "VERTEX" => {
                i += 2;
                let mut x = None;
                let mut y = None;
                let mut z = 0.0;
                while i + 1 < lines.len() && lines[i].trim() != "0" {
                    let v = lines[i + 1].trim();
                    match lines[i].trim() {
                        "10" => x = v.parse().ok(),
                        "20" => y = v.parse().ok(),
                        "30" => z = v.parse().unwrap_or(0.0),
                        _ => {}
                    }
                    i += 2;
                }
                if let (Some(x), Some(y)) = (x, y) {
                    pts.push([x, y, z]);
                }
            }
            "SEQEND" => {
                i += 2;
                break;
            }
            // next entity started without a SEQEND; leave it to the caller
            _ => break,
        }
    }
    if pts.len() == 3 {
        push_face(mesh, &pts);
    }
    i
}

fn push_face(mesh: &mut TinMesh, corners: &[[f64; 3]]) {
    let base = mesh.vertex_count();
    for c in corners {
        mesh.add_vertex(Point::new(c[0], c[1]), c[2] as f32);
    }
    mesh.add_triangle(base, base + 1, base + 2);
}
