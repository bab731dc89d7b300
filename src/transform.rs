//! Per-column row transforms
//!
//! A [`RowTransform`] is built once from an ordered list of
//! [`ColumnTransform`]s and applied to every fetched row. A transform either
//! replaces the value of an exported field in place or appends derived
//! columns computed from the value of a source field.

use crate::error::{ExportError, Result};
use crate::types::{CellValue, Row};
use std::fmt;
use std::sync::Arc;

/// Result of a transform callback: a single value or several columns
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    One(CellValue),
    Many(Vec<CellValue>),
}

impl Derived {
    fn len(&self) -> usize {
        match self {
            Derived::One(_) => 1,
            Derived::Many(values) => values.len(),
        }
    }
}

impl<T: Into<CellValue>> From<T> for Derived {
    fn from(value: T) -> Self {
        Derived::One(value.into())
    }
}

impl From<Vec<CellValue>> for Derived {
    fn from(values: Vec<CellValue>) -> Self {
        Derived::Many(values)
    }
}

/// Shared transform callback
pub type TransformFn = Arc<dyn Fn(&CellValue) -> Derived + Send + Sync>;

fn boxed<F, T>(f: F) -> TransformFn
where
    F: Fn(&CellValue) -> T + Send + Sync + 'static,
    T: Into<Derived>,
{
    Arc::new(move |value: &CellValue| -> Derived { f(value).into() })
}

/// A single column transform
#[derive(Clone)]
pub enum ColumnTransform {
    /// Overwrite the value of `field` with `f(value)`
    Replace { field: String, f: TransformFn },
    /// Append `width` columns computed from the original value of `source`
    Append {
        source: String,
        width: usize,
        f: TransformFn,
    },
}

impl ColumnTransform {
    pub fn replace<F, T>(field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        ColumnTransform::Replace {
            field: field.into(),
            f: boxed(f),
        }
    }

    /// Append one column derived from `source`
    pub fn append<F, T>(source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        Self::append_columns(source, 1, f)
    }

    /// Append `width` columns derived from `source`
    pub fn append_columns<F, T>(source: impl Into<String>, width: usize, f: F) -> Self
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        ColumnTransform::Append {
            source: source.into(),
            width,
            f: boxed(f),
        }
    }

    /// Build a transform from a `field` or `<prefix>_<field>` key.
    ///
    /// A key naming an exported field replaces it. Any other key is split on
    /// its first underscore; the part after it must name an exported field,
    /// whose value feeds a single appended column.
    pub fn from_key<F, T>(key: &str, fields: &[String], f: F) -> Result<Self>
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        Self::keyed(key, 1, fields, boxed(f))
    }

    /// Like [`ColumnTransform::from_key`], for a `<prefix>_<field>` key whose
    /// callback yields `width` columns
    pub fn from_key_columns<F, T>(key: &str, width: usize, fields: &[String], f: F) -> Result<Self>
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        Self::keyed(key, width, fields, boxed(f))
    }

    pub(crate) fn keyed(key: &str, width: usize, fields: &[String], f: TransformFn) -> Result<Self> {
        if fields.iter().any(|name| name == key) {
            if width != 1 {
                return Err(ExportError::config(format!(
                    "transform key '{}' replaces a field and must yield one value, not {}",
                    key, width
                )));
            }
            return Ok(ColumnTransform::Replace {
                field: key.to_string(),
                f,
            });
        }

        let source = match key.split_once('_') {
            Some((_, source)) if !source.is_empty() => source,
            _ => {
                return Err(ExportError::config(format!(
                    "transform key '{}' is neither a field nor of the form <prefix>_<field>",
                    key
                )))
            }
        };
        if !fields.iter().any(|name| name == source) {
            return Err(ExportError::config(format!(
                "transform key '{}' references unknown field '{}'",
                key, source
            )));
        }
        Ok(ColumnTransform::Append {
            source: source.to_string(),
            width,
            f,
        })
    }

    fn field(&self) -> &str {
        match self {
            ColumnTransform::Replace { field, .. } => field,
            ColumnTransform::Append { source, .. } => source,
        }
    }
}

impl fmt::Debug for ColumnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTransform::Replace { field, .. } => {
                f.debug_struct("Replace").field("field", field).finish()
            }
            ColumnTransform::Append { source, width, .. } => f
                .debug_struct("Append")
                .field("source", source)
                .field("width", width)
                .finish(),
        }
    }
}

struct Step {
    index: usize,
    transform: ColumnTransform,
}

/// Row transform function with field positions resolved up front
#[derive(Default)]
pub struct RowTransform {
    steps: Vec<Step>,
    appended: usize,
}

impl RowTransform {
    /// The identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Resolve every transform against the exported field list
    pub fn build(transforms: &[ColumnTransform], fields: &[String]) -> Result<Self> {
        let mut steps = Vec::with_capacity(transforms.len());
        let mut appended = 0;

        for transform in transforms {
            let name = transform.field();
            let index = fields.iter().position(|f| f == name).ok_or_else(|| {
                ExportError::config(format!(
                    "transform references field '{}' which is not exported",
                    name
                ))
            })?;
            if let ColumnTransform::Append { width, .. } = transform {
                if *width == 0 {
                    return Err(ExportError::config(format!(
                        "appended columns from '{}' must have a width of at least 1",
                        name
                    )));
                }
                appended += width;
            }
            steps.push(Step {
                index,
                transform: transform.clone(),
            });
        }

        Ok(RowTransform { steps, appended })
    }

    /// Number of columns appended to every row
    pub fn appended_columns(&self) -> usize {
        self.appended
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Transform a single row; `row_num` is only used for error reporting.
    pub fn apply(&self, row: &Row, row_num: u32) -> Result<Row> {
        if self.is_identity() {
            return Ok(row.clone());
        }

        let mut out = row.cells.clone();
        out.reserve(self.appended);

        for step in &self.steps {
            let shape_error = |message: String| ExportError::Transform {
                row: row_num,
                message,
            };
            match &step.transform {
                ColumnTransform::Replace { field, f } => {
                    let current = out.get(step.index).ok_or_else(|| {
                        shape_error(format!("row has no value for field '{}'", field))
                    })?;
                    match f(current) {
                        Derived::One(value) => out[step.index] = value,
                        Derived::Many(values) => {
                            return Err(shape_error(format!(
                                "replacement for '{}' returned {} values",
                                field,
                                values.len()
                            )))
                        }
                    }
                }
                ColumnTransform::Append { source, width, f } => {
                    let original = row.get(step.index).ok_or_else(|| {
                        shape_error(format!("row has no value for field '{}'", source))
                    })?;
                    let derived = f(original);
                    if derived.len() != *width {
                        return Err(shape_error(format!(
                            "columns derived from '{}' expected {} values, got {}",
                            source,
                            width,
                            derived.len()
                        )));
                    }
                    match derived {
                        Derived::One(value) => out.push(value),
                        Derived::Many(values) => out.extend(values),
                    }
                }
            }
        }

        Ok(Row::new(out))
    }
}

impl fmt::Debug for RowTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| &s.transform))
            .finish()
    }
}
