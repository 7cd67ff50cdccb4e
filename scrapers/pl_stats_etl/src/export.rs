use anyhow::{Context, Result};
use std::{fs, io::Write, path::{Path, PathBuf}};

use crate::types::Dataset;

/// Writes the header and up to `limit` rows of a dataset as CSV.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W, limit: Option<usize>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.column_names())?;

    let limit = limit.unwrap_or(usize::MAX);
    for row in dataset.rows().iter().take(limit) {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes `<dir>/<dataset>.csv`, creating the directory if needed.
pub fn write_csv_file(dataset: &Dataset, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", dataset.name));
    let file = fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(dataset, file, None)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, ColumnType, Value};
    use pretty_assertions::assert_eq;

    fn scorers() -> Dataset {
        let mut dataset = Dataset::new(
            "top_scorers",
            vec![
                Column::new("player", ColumnType::Text),
                Column::new("goals", ColumnType::Integer),
            ],
        );
        for (player, goals) in [("Erling Haaland", 27), ("Cole Palmer, Jr", 22), ("Alexander Isak", 21)] {
            dataset
                .push_row(vec![Value::Text(player.into()), Value::Integer(goals)])
                .unwrap();
        }
        dataset
    }

    #[test]
    fn test_write_csv_with_limit() {
        let mut out = Vec::new();
        write_csv(&scorers(), &mut out, Some(2)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "player,goals\nErling Haaland,27\n\"Cole Palmer, Jr\",22\n"
        );
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv_file(&scorers(), &dir.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), "top_scorers.csv");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
