//! Model schema descriptors and field/header resolution
//!
//! A [`ModelSchema`] is the explicit description of an exportable model: its
//! name, display names and the ordered list of its fields. The resolver
//! functions turn a schema plus the export configuration into the ordered
//! field list and the matching header labels.

use crate::error::{ExportError, Result};

/// Description of a single model field
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDescriptor {
    /// Column name as understood by the row source
    pub name: String,
    /// Human readable label; defaults to the name with underscores as spaces
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    /// Foreign key, one-to-one or many-to-many field
    #[cfg_attr(feature = "serde", serde(default))]
    pub relation: bool,
    /// UUID-like identifier field, never exported by default
    #[cfg_attr(feature = "serde", serde(default))]
    pub identifier: bool,
    /// Primary key field
    #[cfg_attr(feature = "serde", serde(default))]
    pub primary_key: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            label: None,
            relation: false,
            identifier: false,
            primary_key: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn relation(mut self) -> Self {
        self.relation = true;
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Title-cased header label for this field
    pub fn header_label(&self) -> String {
        match &self.label {
            Some(label) => title_case(label),
            None => title_case(&self.name.replace('_', " ")),
        }
    }
}

/// Explicit description of an exportable model
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSchema {
    /// Model (type) name
    pub name: String,
    /// Source table or collection name
    pub table: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub verbose_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub verbose_name_plural: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl ModelSchema {
    /// Create a schema whose table name is the lower-cased model name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ModelSchema {
            table: name.to_lowercase(),
            name,
            verbose_name: None,
            verbose_name_plural: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    pub fn verbose_name_plural(mut self, name: impl Into<String>) -> Self {
        self.verbose_name_plural = Some(name.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of the primary key: the flagged field, else a field named `id`
    fn primary_key_name(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .or_else(|| self.get_field("id"))
            .map(|f| f.name.as_str())
    }

    /// Sheet title: plural display name, else singular, else the model name
    pub fn display_title(&self) -> String {
        self.verbose_name_plural
            .as_deref()
            .or(self.verbose_name.as_deref())
            .map(title_case)
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Resolve the ordered list of exported field names.
///
/// Explicit fields are used verbatim. Otherwise identifier fields are always
/// dropped; with `include_relations` the list is trimmed to start at the
/// primary key, without it relational fields are dropped too.
pub fn resolve_fields(
    schema: &ModelSchema,
    explicit_fields: Option<&[String]>,
    include_relations: bool,
) -> Result<Vec<String>> {
    if let Some(fields) = explicit_fields.filter(|f| !f.is_empty()) {
        return Ok(fields.to_vec());
    }

    if include_relations {
        let fields: Vec<String> = schema
            .fields
            .iter()
            .filter(|f| !f.identifier)
            .map(|f| f.name.clone())
            .collect();
        let pk = schema.primary_key_name().ok_or_else(|| {
            ExportError::config(format!("model '{}' has no primary key field", schema.name))
        })?;
        let start = fields.iter().position(|f| f == pk).ok_or_else(|| {
            ExportError::config(format!(
                "primary key '{}' of model '{}' is an identifier field",
                pk, schema.name
            ))
        })?;
        return Ok(fields[start..].to_vec());
    }

    Ok(schema
        .fields
        .iter()
        .filter(|f| !f.relation && !f.identifier)
        .map(|f| f.name.clone())
        .collect())
}

/// Resolve the header labels: explicit header or one title-cased label per
/// field, followed by the extra labels.
pub fn resolve_header(
    schema: &ModelSchema,
    fields: &[String],
    explicit_header: Option<&[String]>,
    extra_header: Option<&[String]>,
) -> Vec<String> {
    let mut header: Vec<String> = match explicit_header.filter(|h| !h.is_empty()) {
        Some(header) => header.to_vec(),
        None => fields
            .iter()
            .map(|name| match schema.get_field(name) {
                Some(field) => field.header_label(),
                None => title_case(&name.replace('_', " ")),
            })
            .collect(),
    };

    if let Some(extra) = extra_header {
        header.extend(extra.iter().cloned());
    }
    header
}

/// Check that the header has one label per field plus one per appended column
pub fn validate_header(fields: &[String], header: &[String], appended_columns: usize) -> Result<()> {
    let expected = fields.len() + appended_columns;
    if header.len() != expected {
        return Err(ExportError::config(format!(
            "the number of fields and headers must be the same: {} fields + {} extra columns, {} headers",
            fields.len(),
            appended_columns,
            header.len()
        )));
    }
    Ok(())
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word is a run of alphabetic characters, so `"fecha de creación"` becomes
/// `"Fecha De Creación"` and `"e-mail"` becomes `"E-Mail"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cliente() -> ModelSchema {
        ModelSchema::new("Cliente")
            .verbose_name("cliente")
            .verbose_name_plural("clientes")
            .field(FieldDescriptor::new("uuid").identifier())
            .field(FieldDescriptor::new("owner").relation())
            .field(FieldDescriptor::new("id").primary_key())
            .field(FieldDescriptor::new("nombre"))
            .field(FieldDescriptor::new("fecha_alta").label("fecha de alta"))
            .field(FieldDescriptor::new("ciudad").relation())
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fields_without_relations() {
        let fields = resolve_fields(&cliente(), None, false).unwrap();
        assert_eq!(fields, strings(&["id", "nombre", "fecha_alta"]));
    }

    #[test]
    fn test_fields_with_relations_start_at_primary_key() {
        let fields = resolve_fields(&cliente(), None, true).unwrap();
        assert_eq!(fields, strings(&["id", "nombre", "fecha_alta", "ciudad"]));
    }

    #[test]
    fn test_primary_key_falls_back_to_id() {
        let schema = ModelSchema::new("Nota")
            .field(FieldDescriptor::new("autor").relation())
            .field(FieldDescriptor::new("id"))
            .field(FieldDescriptor::new("texto"));
        let fields = resolve_fields(&schema, None, true).unwrap();
        assert_eq!(fields, strings(&["id", "texto"]));
    }

    #[test]
    fn test_missing_primary_key_is_config_error() {
        let schema = ModelSchema::new("Nota").field(FieldDescriptor::new("texto"));
        let err = resolve_fields(&schema, None, true).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }

    #[test]
    fn test_explicit_fields_are_verbatim() {
        let explicit = strings(&["nombre", "does_not_exist"]);
        let fields = resolve_fields(&cliente(), Some(&explicit), true).unwrap();
        assert_eq!(fields, explicit);
    }

    #[test]
    fn test_header_from_labels_and_extra() {
        let schema = cliente();
        let fields = strings(&["id", "nombre", "fecha_alta"]);
        let extra = strings(&["Fecha de creación"]);
        let header = resolve_header(&schema, &fields, None, Some(&extra));
        assert_eq!(
            header,
            strings(&["Id", "Nombre", "Fecha De Alta", "Fecha de creación"])
        );
    }

    #[test]
    fn test_explicit_header_is_kept() {
        let fields = strings(&["id", "nombre"]);
        let explicit = strings(&["ID", "Name"]);
        let header = resolve_header(&cliente(), &fields, Some(&explicit), None);
        assert_eq!(header, explicit);
    }

    #[test]
    fn test_validate_header_counts() {
        let fields = strings(&["id", "nombre", "ciudad"]);
        assert!(validate_header(&fields, &strings(&["ID", "Nombre"]), 0).is_err());
        assert!(validate_header(&fields, &strings(&["ID", "Nombre", "Ciudad"]), 0).is_ok());
        assert!(validate_header(&fields, &strings(&["ID", "Nombre", "Ciudad", "X"]), 1).is_ok());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("clientes"), "Clientes");
        assert_eq!(title_case("fecha de creación"), "Fecha De Creación");
        assert_eq!(title_case("E-MAIL address2x"), "E-Mail Address2X");
    }

    #[test]
    fn test_display_title_fallbacks() {
        assert_eq!(cliente().display_title(), "Clientes");
        let singular = ModelSchema::new("Pedido").verbose_name("pedido de venta");
        assert_eq!(singular.display_title(), "Pedido De Venta");
        assert_eq!(ModelSchema::new("Pedido").display_title(), "Pedido");
    }
}
