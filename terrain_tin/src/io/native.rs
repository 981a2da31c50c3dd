//! Native binary TIN formats.
//!
//! Version 2 files carry a 5 byte magic (`tin` plus two version digits), a
//! header with record counts, the body offset, the projection WKT and the
//! extents, then packed vertex and triangle records, all little endian.
//! Version 1 is the legacy headerless form: single precision `x y z` triples
//! where every three consecutive vertices form one implicit triangle.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;

use crate::crs::Crs;
use crate::geometry::Point;
use crate::progress::{NoProgress, Progress};
use crate::tin::{Extents, TinMesh};

use super::{cancelled, PROGRESS_BATCH};

const MAGIC_V2: &[u8; 5] = b"tin02";

// magic + four u32 header fields + extents block
const HEADER_FIXED: usize = 5 + 4 * 4 + 4 * 8 + 2 * 4;

/// Reads a native v2 TIN file.
pub fn read_tin(path: &str) -> io::Result<TinMesh> {
    read_tin_with_progress(path, &mut NoProgress)
}

/// Reads a native v2 TIN file, reporting progress between record batches.
pub fn read_tin_with_progress(path: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_V2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "bad magic {:?}, expected {:?}",
                String::from_utf8_lossy(&magic),
                String::from_utf8_lossy(MAGIC_V2)
            ),
        ));
    }
    let vert_count = reader.read_u32::<LittleEndian>()? as usize;
    let tri_count = reader.read_u32::<LittleEndian>()? as usize;
    let body_offset = reader.read_u32::<LittleEndian>()? as u64;
    let wkt_len = reader.read_u32::<LittleEndian>()? as usize;
    let mut wkt = vec![0u8; wkt_len];
    reader.read_exact(&mut wkt)?;
    let wkt =
        String::from_utf8(wkt).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let extents = Extents {
        min: Point::new(
            reader.read_f64::<LittleEndian>()?,
            reader.read_f64::<LittleEndian>()?,
        ),
        max: Point::new(
            reader.read_f64::<LittleEndian>()?,
            reader.read_f64::<LittleEndian>()?,
        ),
        min_elevation: reader.read_f32::<LittleEndian>()?,
        max_elevation: reader.read_f32::<LittleEndian>()?,
    };
    reader.seek(SeekFrom::Start(body_offset))?;

    let mut mesh = TinMesh::new();
    if !wkt.is_empty() {
        mesh.crs = Some(Crs::from_wkt(&wkt));
    }
    for i in 0..vert_count {
        let x = reader.read_f64::<LittleEndian>()?;
        let y = reader.read_f64::<LittleEndian>()?;
        let z = reader.read_f32::<LittleEndian>()?;
        mesh.add_vertex(Point::new(x, y), z);
        if i % PROGRESS_BATCH == 0 && progress.report((i * 50 / vert_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    for i in 0..tri_count {
        let a = reader.read_u32::<LittleEndian>()? as usize;
        let b = reader.read_u32::<LittleEndian>()? as usize;
        let c = reader.read_u32::<LittleEndian>()? as usize;
        if a >= vert_count || b >= vert_count || c >= vert_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("triangle {} references a vertex out of range", i),
            ));
        }
        mesh.add_triangle(a, b, c);
        if i % PROGRESS_BATCH == 0 && progress.report((50 + i * 50 / tri_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    if vert_count > 0 {
        mesh.set_extents(extents);
    }
    info!(
        "read {} vertices and {} triangles from {}",
        vert_count, tri_count, path
    );
    progress.report(100);
    Ok(mesh)
}

/// Writes a native v2 TIN file. Write-then-read reproduces the vertex
/// positions, elevations, triangle indices, projection definition and
/// extents exactly.
pub fn write_tin(path: &str, mesh: &TinMesh) -> io::Result<()> {
    write_tin_with_progress(path, mesh, &mut NoProgress)
}

pub fn write_tin_with_progress(
    path: &str,
    mesh: &TinMesh,
    progress: &mut dyn Progress,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let wkt = mesh
        .crs
        .as_ref()
        .map(|c| c.definition().to_string())
        .unwrap_or_default();
    let extents = mesh.extents().or_else(|| mesh.scan_extents()).unwrap_or(Extents {
        min: Point::new(0.0, 0.0),
        max: Point::new(0.0, 0.0),
        min_elevation: 0.0,
        max_elevation: 0.0,
    });
    let body_offset = (HEADER_FIXED + wkt.len()) as u32;

    writer.write_all(MAGIC_V2)?;
    writer.write_u32::<LittleEndian>(mesh.vertex_count() as u32)?;
    writer.write_u32::<LittleEndian>(mesh.triangle_count() as u32)?;
    writer.write_u32::<LittleEndian>(body_offset)?;
    writer.write_u32::<LittleEndian>(wkt.len() as u32)?;
    writer.write_all(wkt.as_bytes())?;
    writer.write_f64::<LittleEndian>(extents.min.x)?;
    writer.write_f64::<LittleEndian>(extents.min.y)?;
    writer.write_f64::<LittleEndian>(extents.max.x)?;
    writer.write_f64::<LittleEndian>(extents.max.y)?;
    writer.write_f32::<LittleEndian>(extents.min_elevation)?;
    writer.write_f32::<LittleEndian>(extents.max_elevation)?;

    let vert_count = mesh.vertex_count();
    for (i, v) in mesh.vertices.iter().enumerate() {
        writer.write_f64::<LittleEndian>(v.point.x)?;
        writer.write_f64::<LittleEndian>(v.point.y)?;
        writer.write_f32::<LittleEndian>(v.elevation)?;
        if i % PROGRESS_BATCH == 0 && progress.report((i * 50 / vert_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    let tri_count = mesh.triangle_count();
    for (i, tri) in mesh.triangles.iter().enumerate() {
        for &v in &tri.v {
            writer.write_u32::<LittleEndian>(v as u32)?;
        }
        if i % PROGRESS_BATCH == 0 && progress.report((50 + i * 50 / tri_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    writer.flush()?;
    progress.report(100);
    Ok(())
}

/// Reads a legacy v1 file: little endian `f32` triples, three vertices per
/// triangle, no header and no explicit indices.
pub fn read_tin_v1(path: &str) -> io::Result<TinMesh> {
    read_tin_v1_with_progress(path, &mut NoProgress)
}

pub fn read_tin_v1_with_progress(path: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    let data = std::fs::read(path)?;
    if data.len() % 12 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file size is not a whole number of x/y/z records",
        ));
    }
    let count = data.len() / 12;
    if count % 3 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "vertex count is not a multiple of three",
        ));
    }
    let mut cursor = io::Cursor::new(&data);
    let mut mesh = TinMesh::new();
    for i in 0..count {
        let x = cursor.read_f32::<LittleEndian>()?;
        let y = cursor.read_f32::<LittleEndian>()?;
        let z = cursor.read_f32::<LittleEndian>()?;
        mesh.add_vertex(Point::new(x as f64, y as f64), z);
        if i % PROGRESS_BATCH == 0 && progress.report((i * 100 / count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    for t in 0..count / 3 {
        mesh.add_triangle(3 * t, 3 * t + 1, 3 * t + 2);
    }
    mesh.compute_extents();
    info!("read {} implicit triangles from {}", count / 3, path);
    progress.report(100);
    Ok(mesh)
}

/// Writes a legacy v1 file. Vertices are emitted in triangle order, so
/// vertices shared between triangles are duplicated in the output.
pub fn write_tin_v1(path: &str, mesh: &TinMesh) -> io::Result<()> {
    write_tin_v1_with_progress(path, mesh, &mut NoProgress)
}

pub fn write_tin_v1_with_progress(
    path: &str,
    mesh: &TinMesh,
    progress: &mut dyn Progress,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let tri_count = mesh.triangle_count();
    for (i, tri) in mesh.triangles.iter().enumerate() {
        for &v in &tri.v {
            let vert = &mesh.vertices[v];
            writer.write_f32::<LittleEndian>(vert.point.x as f32)?;
            writer.write_f32::<LittleEndian>(vert.point.y as f32)?;
            writer.write_f32::<LittleEndian>(vert.elevation)?;
        }
        if i % PROGRESS_BATCH == 0 && progress.report((i * 100 / tri_count.max(1)) as u32) {
            return Err(cancelled());
        }
    }
    writer.flush()?;
    progress.report(100);
    Ok(())
}
