use std::io;

use clap::{Parser, Subcommand};

use terrain_tin::geometry::Point;
use terrain_tin::io::{adf, dxf, gms, native};
use terrain_tin::progress::{NoProgress, Progress};
use terrain_tin::tin::{TinMesh, DEFAULT_WELD_BUCKETS};

#[derive(Parser)]
#[command(name = "terrain_tin", about = "TIN surface inspection, conversion and repair")]
struct Cli {
    /// Print progress percentages to stderr.
    #[arg(long, global = true)]
    progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints vertex and triangle counts, surface types and extents.
    Info { file: String },
    /// Converts a surface between the supported formats.
    Convert { input: String, output: String },
    /// Queries the surface elevation at a point.
    Query {
        file: String,
        x: f64,
        y: f64,
        /// Buckets per axis for the spatial index; 0 disables binning.
        #[arg(long, default_value_t = 64)]
        bins: usize,
    },
    /// Repairs a surface and writes the result.
    Clean {
        input: String,
        output: String,
        /// Merge vertices sharing an exact position.
        #[arg(long)]
        weld: bool,
        /// Reorient clockwise triangles to counter-clockwise.
        #[arg(long)]
        fix_winding: bool,
        /// Remove vertices referenced by no triangle.
        #[arg(long)]
        prune: bool,
    },
}

/// Prints each percentage once as it changes.
struct PercentPrinter {
    last: Option<u32>,
}

impl Progress for PercentPrinter {
    fn report(&mut self, percent: u32) -> bool {
        if self.last != Some(percent) {
            eprintln!("{}%", percent);
            self.last = Some(percent);
        }
        false
    }
}

fn read_any(path: &str, progress: &mut dyn Progress) -> io::Result<TinMesh> {
    if let Some(base) = path.strip_suffix("xy.adf") {
        return adf::read_tin_adf_with_progress(base, progress);
    }
    match extension(path) {
        "tin" => native::read_tin_with_progress(path, progress),
        "flat" => native::read_tin_v1_with_progress(path, progress),
        "dxf" => dxf::read_tin_dxf_with_progress(path, progress),
        "gms" => gms::read_tin_gms_with_progress(path, progress),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported input format: .{}", other),
        )),
    }
}

fn write_any(path: &str, mesh: &TinMesh, progress: &mut dyn Progress) -> io::Result<()> {
    match extension(path) {
        "tin" => native::write_tin_with_progress(path, mesh, progress),
        "flat" => native::write_tin_v1_with_progress(path, mesh, progress),
        "gms" => gms::write_tin_gms_with_progress(path, mesh, progress),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported output format: .{}", other),
        )),
    }
}

fn extension(path: &str) -> &str {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

fn run(cli: Cli) -> io::Result<()> {
    let mut printer = PercentPrinter { last: None };
    let mut silent = NoProgress;
    let progress: &mut dyn Progress = if cli.progress {
        &mut printer
    } else {
        &mut silent
    };
    match cli.command {
        Command::Info { file } => {
            let mesh = read_any(&file, progress)?;
            println!("vertices: {}", mesh.vertex_count());
            println!("triangles: {}", mesh.triangle_count());
            for st in &mesh.surface_types {
                println!("surface type: {} (tiled: {})", st.texture, st.tiled);
            }
            if let Some(crs) = &mesh.crs {
                println!("projection: {}", crs.definition());
            }
            if let Some(ext) = mesh.extents() {
                println!(
                    "extents: ({:.3}, {:.3}) .. ({:.3}, {:.3})",
                    ext.min.x, ext.min.y, ext.max.x, ext.max.y
                );
                println!(
                    "elevation: {:.3} .. {:.3}",
                    ext.min_elevation, ext.max_elevation
                );
            }
            Ok(())
        }
        Command::Convert { input, output } => {
            let mesh = read_any(&input, progress)?;
            log::debug!(
                "writing {} vertices and {} triangles to {}",
                mesh.vertex_count(),
                mesh.triangle_count(),
                output
            );
            write_any(&output, &mesh, progress)
        }
        Command::Query { file, x, y, bins } => {
            let mut mesh = read_any(&file, progress)?;
            if bins > 0 {
                mesh.setup_triangle_bins(bins);
            }
            match mesh.elevation_at(Point::new(x, y)) {
                Some(z) => {
                    println!("{:.3}", z);
                    Ok(())
                }
                None => Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "point is outside the surface",
                )),
            }
        }
        Command::Clean {
            input,
            output,
            weld,
            fix_winding,
            prune,
        } => {
            let mut mesh = read_any(&input, progress)?;
            if weld {
                let removed = mesh
                    .weld_vertices_with_progress(DEFAULT_WELD_BUCKETS, progress)
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::Interrupted, "weld cancelled")
                    })?;
                println!("welded: {}", removed);
            }
            if fix_winding {
                println!("reoriented: {}", mesh.fix_winding());
            }
            if prune {
                println!("pruned: {}", mesh.remove_unused_vertices());
            }
            mesh.compute_extents();
            write_any(&output, &mesh, progress)
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
