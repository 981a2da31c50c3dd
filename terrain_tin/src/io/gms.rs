//! GMS ASCII TIN format.
//!
//! Line oriented text with `TIN`, `BEGT` .. `ENDT` section keywords, a
//! `VERT <n>` block of `x y z [flag]` lines and a `TRI <n>` block of 1-based
//! index lines. The flag field is accepted and ignored. Triangle records
//! store the second and third indices swapped relative to the in-memory
//! winding convention; both directions reconcile the swap, so writing a mesh
//! and reading it back is the identity even though the raw file differs.

use std::fmt::Write as _;
use std::io;

use log::info;

use crate::geometry::Point;
use crate::progress::{NoProgress, Progress};
use crate::tin::TinMesh;

use super::{cancelled, read_lines, write_string, PROGRESS_BATCH};

/// Reads a GMS ASCII TIN file.
pub fn read_tin_gms(path: &str) -> io::Result<TinMesh> {
    read_tin_gms_with_progress(path, &mut NoProgress)
}

pub fn read_tin_gms_with_progress(path: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    let lines = read_lines(path)?;
    let total = lines.len().max(1);
    let mut mesh = TinMesh::new();
    let mut i = 0;
    while i < lines.len() {
        if i % PROGRESS_BATCH == 0 && progress.report((i * 100 / total) as u32) {
            return Err(cancelled());
        }
        let mut tokens = lines[i].split_whitespace();
        let Some(keyword) = tokens.next() else {
            i += 1;
            continue;
        };
        match keyword {
            "TIN" | "BEGT" | "ID" | "MAT" | "TCOL" | "TNAM" => i += 1,
            "VERT" => {
                let count = parse_count(tokens.next(), i)?;
                i += 1;
                let mut read = 0;
                while read < count {
                    if i >= lines.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "unexpected end of VERT block",
                        ));
                    }
                    if i % PROGRESS_BATCH == 0 && progress.report((i * 100 / total) as u32) {
                        return Err(cancelled());
                    }
                    let fields: Vec<&str> = lines[i].split_whitespace().collect();
                    if fields.is_empty() {
                        i += 1;
                        continue;
                    }
                    if fields.len() < 3 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("line {}: expected x y z", i + 1),
                        ));
                    }
                    let x = parse_num::<f64>(fields[0], i)?;
                    let y = parse_num::<f64>(fields[1], i)?;
                    let z = parse_num::<f32>(fields[2], i)?;
                    mesh.add_vertex(Point::new(x, y), z);
                    read += 1;
                    i += 1;
                }
            }
            "TRI" => {
                let count = parse_count(tokens.next(), i)?;
                i += 1;
                let mut read = 0;
                while read < count {
                    if i >= lines.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "unexpected end of TRI block",
                        ));
                    }
                    if i % PROGRESS_BATCH == 0 && progress.report((i * 100 / total) as u32) {
                        return Err(cancelled());
                    }
                    let fields: Vec<&str> = lines[i].split_whitespace().collect();
                    if fields.is_empty() {
                        i += 1;
                        continue;
                    }
                    if fields.len() < 3 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("line {}: expected three vertex indices", i + 1),
                        ));
                    }
                    let a = parse_index(fields[0], i, mesh.vertex_count())?;
                    let b = parse_index(fields[1], i, mesh.vertex_count())?;
                    let c = parse_index(fields[2], i, mesh.vertex_count())?;
                    // the file stores the second and third corners swapped
                    mesh.add_triangle(a, c, b);
                    read += 1;
                    i += 1;
                }
            }
            "ENDT" => break,
            _ => i += 1,
        }
    }
    mesh.compute_extents();
    info!(
        "read {} vertices and {} triangles from GMS {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        path
    );
    progress.report(100);
    Ok(mesh)
}

fn parse_count(token: Option<&str>, line: usize) -> io::Result<usize> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected a record count", line + 1),
            )
        })
}

fn parse_num<T: std::str::FromStr>(field: &str, line: usize) -> io::Result<T>
where
    T::Err: std::fmt::Display,
{
    field.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line {}: {}", line + 1, e),
        )
    })
}

fn parse_index(field: &str, line: usize, vert_count: usize) -> io::Result<usize> {
    let raw: usize = parse_num(field, line)?;
    if raw < 1 || raw > vert_count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line {}: vertex index {} out of range", line + 1, raw),
        ));
    }
    Ok(raw - 1)
}

/// Writes a GMS ASCII TIN file.
pub fn write_tin_gms(path: &str, mesh: &TinMesh) -> io::Result<()> {
    write_tin_gms_with_progress(path, mesh, &mut NoProgress)
}

pub fn write_tin_gms_with_progress(
    path: &str,
    mesh: &TinMesh,
    progress: &mut dyn Progress,
) -> io::Result<()> {
    let mut out = String::new();
    out.push_str("TIN\nBEGT\nTNAM tin\n");
    writeln!(&mut out, "VERT {}", mesh.vertex_count()).unwrap();
    let vert_count = mesh.vertex_count().max(1);
    for (i, v) in mesh.vertices.iter().enumerate() {
        writeln!(&mut out, "{} {} {}", v.point.x, v.point.y, v.elevation).unwrap();
        if i % PROGRESS_BATCH == 0 && progress.report((i * 50 / vert_count) as u32) {
            return Err(cancelled());
        }
    }
    writeln!(&mut out, "TRI {}", mesh.triangle_count()).unwrap();
    let tri_count = mesh.triangle_count().max(1);
    for (i, tri) in mesh.triangles.iter().enumerate() {
        // swap the second and third corners back to the file convention
        writeln!(
            &mut out,
            "{} {} {}",
            tri.v[0] + 1,
            tri.v[2] + 1,
            tri.v[1] + 1
        )
        .unwrap();
        if i % PROGRESS_BATCH == 0 && progress.report((50 + i * 50 / tri_count) as u32) {
            return Err(cancelled());
        }
    }
    out.push_str("ENDT\n");
    write_string(path, &out)?;
    progress.report(100);
    Ok(())
}
