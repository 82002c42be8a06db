//! Colored terminal summary of a loaded mesh
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshload_core::{MeshFormat, MeshStore};
use nalgebra::Vector3;
use std::io::Write;
use std::path::Path;

fn triple(v: &Vector3<f32>) -> String {
    format!("({:.4}, {:.4}, {:.4})", v.x, v.y, v.z)
}

/// One `label: value` row with the label highlighted.
fn row<W: Write>(writer: &mut W, label: &str, value: &str, color: Color) -> std::io::Result<()> {
    writer.queue(SetForegroundColor(color))?;
    writer.queue(Print(format!("{label:>14}: ")))?;
    writer.queue(ResetColor)?;
    writer.queue(Print(format!("{value}\n")))?;
    Ok(())
}

/// Print format, buffer sizes and bounds of `store`.
pub fn print_summary<W: Write>(
    writer: &mut W,
    path: &Path,
    format: MeshFormat,
    store: &MeshStore,
) -> std::io::Result<()> {
    let bbox = store.bounding_box();
    let safe = bbox.display_safe();

    writer.queue(SetForegroundColor(Color::Yellow))?;
    writer.queue(Print(format!("{}\n", path.display())))?;
    writer.queue(ResetColor)?;

    row(writer, "format", format.name(), Color::Cyan)?;
    row(writer, "triangles", &store.triangle_count().to_string(), Color::Cyan)?;
    row(writer, "vertices", &store.vertex_count().to_string(), Color::Cyan)?;
    row(writer, "normals", &store.normal_count().to_string(), Color::Cyan)?;
    if store.index_count() > 0 {
        row(writer, "indices", &store.index_count().to_string(), Color::Cyan)?;
    }
    row(writer, "bbox min", &triple(&bbox.min.coords), Color::Green)?;
    row(writer, "bbox max", &triple(&bbox.max.coords), Color::Green)?;
    row(writer, "extents", &triple(&safe.extents()), Color::Green)?;

    if store.is_empty() {
        writer.queue(SetForegroundColor(Color::DarkYellow))?;
        writer.queue(Print("no triangles were loaded\n"))?;
        writer.queue(ResetColor)?;
    }
    writer.flush()
}

/// Confirmation line after a conversion.
pub fn print_written<W: Write>(
    writer: &mut W,
    path: &Path,
    format: MeshFormat,
) -> std::io::Result<()> {
    writer.queue(SetForegroundColor(Color::Green))?;
    writer.queue(Print("wrote "))?;
    writer.queue(ResetColor)?;
    writer.queue(Print(format!("{} ({})\n", path.display(), format.name())))?;
    writer.flush()
}
