use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Date,
    Float,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Date => "date",
            ColumnType::Float => "float",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Float(f64),
    Null,
}

impl Value {
    pub fn ty(&self) -> Option<ColumnType> {
        match self {
            Value::Text(_) => Some(ColumnType::Text),
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Float(x) => write!(f, "{}", x),
            Value::Null => Ok(()),
        }
    }
}

/// A named table of scraped records, typed by column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row after checking its width and the type of every non-null value.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::schema(
                &self.name,
                format!(
                    "row {} has {} values, expected {}",
                    self.rows.len(),
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        for (column, value) in self.columns.iter().zip(&row) {
            if let Some(ty) = value.ty() {
                if ty != column.ty {
                    return Err(EtlError::schema(
                        &self.name,
                        format!(
                            "column {} expects {}, got {} value {:?}",
                            column.name, column.ty, ty, value
                        ),
                    ));
                }
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standings() -> Dataset {
        Dataset::new(
            "standings",
            vec![
                Column::new("team", ColumnType::Text),
                Column::new("points", ColumnType::Integer),
            ],
        )
    }

    #[test]
    fn test_push_row_accepts_matching_values() {
        let mut dataset = standings();
        dataset
            .push_row(vec![Value::Text("Arsenal".into()), Value::Integer(89)])
            .unwrap();
        dataset
            .push_row(vec![Value::Text("Chelsea".into()), Value::Null])
            .unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.column_names(), vec!["team", "points"]);
        assert_eq!(dataset.column_index("points"), Some(1));
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut dataset = standings();
        let err = dataset
            .push_row(vec![Value::Text("Arsenal".into())])
            .unwrap_err();
        assert!(matches!(err, EtlError::Schema { .. }));
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_push_row_rejects_wrong_type() {
        let mut dataset = standings();
        let err = dataset
            .push_row(vec![Value::Text("Arsenal".into()), Value::Text("89".into())])
            .unwrap_err();
        assert!(matches!(err, EtlError::Schema { .. }));
    }

    #[test]
    fn test_value_display() {
        let date = NaiveDate::from_ymd_opt(1999, 5, 16).unwrap();
        assert_eq!(Value::Date(date).to_string(), "1999-05-16");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Null.to_string(), "");
    }
}
