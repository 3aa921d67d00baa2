//! CSV exports.
//!
//! - the residual table of a search (one row per grid point, grid order)
//! - an observation set (the output of `gridfit simulate`)
//!
//! Both are plain comma-separated files meant for spreadsheets and scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{ObservationSet, ResidualTable};
use crate::error::AppError;

/// Write a residual table: `index,<param names...>,sse`.
///
/// Non-finite SSE values are written as `inf` / `NaN`.
pub fn write_residual_table_csv(path: &Path, table: &ResidualTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residual_table(BufWriter::new(file), table)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_residual_table<W: Write>(mut out: W, table: &ResidualTable) -> std::io::Result<()> {
    writeln!(out, "index,{},sse", table.param_names().join(","))?;
    for e in table.entries() {
        let params: Vec<String> = e.params.iter().map(|p| format!("{p}")).collect();
        writeln!(out, "{},{},{}", e.index, params.join(","), e.sse)?;
    }
    out.flush()
}

/// Write observations as a two-column CSV with the given header names.
pub fn write_observations_csv(path: &Path, obs: &ObservationSet, x_col: &str, y_col: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_observations(BufWriter::new(file), obs, x_col, y_col)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV '{}': {e}", path.display())))
}

fn write_observations<W: Write>(mut out: W, obs: &ObservationSet, x_col: &str, y_col: &str) -> std::io::Result<()> {
    writeln!(out, "{x_col},{y_col}")?;
    for p in obs.points() {
        writeln!(out, "{},{}", p.x, p.y)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResidualEntry;
    use crate::io::read_observations;

    #[test]
    fn residual_table_has_one_row_per_grid_point() {
        let table = ResidualTable::new(
            vec!["r".to_string(), "k".to_string()],
            vec![
                ResidualEntry {
                    index: 0,
                    params: vec![0.5, 100.0],
                    sse: 12.5,
                },
                ResidualEntry {
                    index: 1,
                    params: vec![0.5, 150.0],
                    sse: f64::INFINITY,
                },
            ],
        );
        let mut buf = Vec::new();
        write_residual_table(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "index,r,k,sse\n0,0.5,100,12.5\n1,0.5,150,inf\n");
    }

    #[test]
    fn observations_reload_unchanged() {
        let obs = ObservationSet::from_pairs(&[(0.0, 10.0), (0.5, 11.051709180756477), (1.0, -3.25)]).unwrap();
        let mut buf = Vec::new();
        write_observations(&mut buf, &obs, "t", "n").unwrap();
        let back = read_observations(buf.as_slice(), "t", "n").unwrap();
        assert_eq!(back.observations, obs);
    }
}
