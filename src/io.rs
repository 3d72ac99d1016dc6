//! JSON persistence of fields and solver reports.
use crate::driver::SolveReport;
use crate::field::NodalField;
use crate::nalgebra::Scalar;
use crate::Real;
use eyre::WrapErr;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn write_json<V: Serialize + ?Sized>(path: &Path, value: &V) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path).wrap_err_with(|| format!("Failed to create file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .wrap_err_with(|| format!("Failed to serialize JSON to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Writes a nodal field as JSON, creating parent directories as needed.
pub fn write_field_json<T>(path: impl AsRef<Path>, field: &NodalField<T>) -> eyre::Result<()>
where
    T: Scalar + Serialize,
{
    write_json(path.as_ref(), field)
}

/// Reads a nodal field written by [`write_field_json`].
///
/// The grids are checked against the stored layout and shape, so a malformed file is an error
/// rather than a field that panics on access.
pub fn read_field_json<T>(path: impl AsRef<Path>) -> eyre::Result<NodalField<T>>
where
    T: Real + DeserializeOwned,
{
    let path = path.as_ref();
    let file = File::open(path).wrap_err_with(|| format!("Failed to open file {}", path.display()))?;
    let field: NodalField<T> = serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("Failed to parse nodal field from {}", path.display()))?;
    let (shape, batch_size, num_components) = (field.shape(), field.batch_size(), field.num_components());
    let field = NodalField::validated(shape, batch_size, num_components, field.into_grids())
        .wrap_err_with(|| format!("Inconsistent nodal field in {}", path.display()))?;
    Ok(field)
}

/// Writes the per-step metrics and the stop reason of a solve as JSON.
pub fn write_report_json<T>(path: impl AsRef<Path>, report: &SolveReport<T>) -> eyre::Result<()>
where
    T: Serialize,
{
    write_json(path.as_ref(), report)
}
