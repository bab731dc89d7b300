//! Query filters and row sources
//!
//! Request query parameters become a [`FilterSet`] of equality filters which a
//! [`RowSource`] applies when fetching the exported rows.

use crate::error::{ExportError, Result};
use crate::types::{CellValue, Row};
use indexmap::IndexMap;

/// Ordered equality filters (`field = value`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterSet {
    filters: IndexMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a URL query string (`a=1&b=two`); a later key overwrites an
    /// earlier one.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = FilterSet::new();
        for (key, value) in pairs {
            set.insert(key, value);
        }
        set
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An incoming export request as seen by the view and its permissions
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Query parameters, used as equality filters
    pub query: FilterSet,
    /// Request headers with lower-cased names
    pub headers: IndexMap<String, String>,
}

impl ExportRequest {
    pub fn new(query: FilterSet) -> Self {
        ExportRequest {
            query,
            headers: IndexMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// The query layer an export reads from
pub trait RowSource {
    /// Fetch `fields` of every row matching all `filters`, in source order.
    fn fetch(&self, fields: &[String], filters: &FilterSet) -> Result<Vec<Row>>;

    /// Id of the last record, if there is one
    fn last_id(&self) -> Result<Option<i64>>;
}

impl<S: RowSource + ?Sized> RowSource for &S {
    fn fetch(&self, fields: &[String], filters: &FilterSet) -> Result<Vec<Row>> {
        (**self).fetch(fields, filters)
    }

    fn last_id(&self) -> Result<Option<i64>> {
        (**self).last_id()
    }
}

impl<S: RowSource + ?Sized> RowSource for std::sync::Arc<S> {
    fn fetch(&self, fields: &[String], filters: &FilterSet) -> Result<Vec<Row>> {
        (**self).fetch(fields, filters)
    }

    fn last_id(&self) -> Result<Option<i64>> {
        (**self).last_id()
    }
}

/// In-memory table of records
///
/// Filters compare the textual rendering of a value with the filter value, so
/// `?id=3` matches `CellValue::Int(3)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    records: Vec<Vec<CellValue>>,
    id_column: String,
}

impl MemoryTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryTable {
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
            id_column: "id".to_string(),
        }
    }

    /// Use another column as the record id
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Append a record; it must have one value per column
    pub fn insert(&mut self, record: Vec<CellValue>) -> Result<()> {
        if record.len() != self.columns.len() {
            return Err(ExportError::query(format!(
                "record has {} values but the table has {} columns",
                record.len(),
                self.columns.len()
            )));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                ExportError::query(format!(
                    "cannot resolve '{}' into a field. Choices are: {}",
                    name,
                    self.columns.join(", ")
                ))
            })
    }
}

impl RowSource for MemoryTable {
    fn fetch(&self, fields: &[String], filters: &FilterSet) -> Result<Vec<Row>> {
        let projection = fields
            .iter()
            .map(|f| self.column_index(f))
            .collect::<Result<Vec<_>>>()?;
        let conditions = filters
            .iter()
            .map(|(k, v)| self.column_index(k).map(|idx| (idx, v)))
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .records
            .iter()
            .filter(|record| {
                conditions
                    .iter()
                    .all(|(idx, value)| record[*idx].as_string() == *value)
            })
            .map(|record| Row::new(projection.iter().map(|&i| record[i].clone()).collect()))
            .collect())
    }

    fn last_id(&self) -> Result<Option<i64>> {
        let idx = self.column_index(&self.id_column)?;
        Ok(self.records.last().and_then(|r| r[idx].as_i64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MemoryTable {
        let mut t = MemoryTable::new(["id", "nombre", "ciudad"]);
        t.insert(vec![1.into(), "Ana".into(), "Lima".into()]).unwrap();
        t.insert(vec![2.into(), "Luis".into(), "Quito".into()]).unwrap();
        t.insert(vec![3.into(), "Eva".into(), "Lima".into()]).unwrap();
        t
    }

    fn fields(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_string_to_filters() {
        let filters = FilterSet::from_query_str("?ciudad=Lima&nombre=Ana+Mar%C3%ADa&ciudad=Quito");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get("ciudad"), Some("Quito"));
        assert_eq!(filters.get("nombre"), Some("Ana María"));
        assert!(FilterSet::from_query_str("").is_empty());
    }

    #[test]
    fn test_fetch_without_filters_returns_all_in_order() {
        let rows = table().fetch(&fields(&["nombre", "id"]), &FilterSet::new()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].to_strings(), vec!["Ana", "1"]);
        assert_eq!(rows[2].to_strings(), vec!["Eva", "3"]);
    }

    #[test]
    fn test_equality_filters_compare_text() {
        let filters = FilterSet::from_pairs([("ciudad", "Lima"), ("id", "3")]);
        let rows = table().fetch(&fields(&["id", "nombre"]), &filters).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].to_strings(), vec!["3", "Eva"]);
    }

    #[test]
    fn test_unknown_names_are_query_errors() {
        let t = table();
        assert!(matches!(
            t.fetch(&fields(&["email"]), &FilterSet::new()),
            Err(ExportError::Query(_))
        ));
        let filters = FilterSet::from_pairs([("page", "2")]);
        assert!(matches!(
            t.fetch(&fields(&["id"]), &filters),
            Err(ExportError::Query(_))
        ));
    }

    #[test]
    fn test_last_id() {
        assert_eq!(table().last_id().unwrap(), Some(3));
        assert_eq!(MemoryTable::new(["id"]).last_id().unwrap(), None);
    }

    #[test]
    fn test_insert_checks_width() {
        let mut t = MemoryTable::new(["id", "nombre"]);
        assert!(t.insert(vec![1.into()]).is_err());
    }

    #[test]
    fn test_request_headers_are_case_insensitive() {
        let req = ExportRequest::default().with_header("X-Api-Key", "secret");
        assert_eq!(req.header("x-api-key"), Some("secret"));
        assert_eq!(req.header("X-API-KEY"), Some("secret"));
    }
}
