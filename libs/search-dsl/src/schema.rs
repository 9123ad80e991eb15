//! Dynamic metadata field definitions
//!
//! Metadata fields are configured as data (label, type, flags) rather than as a
//! fixed index mapping, so the set of facetable labels is only known at request time.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Value type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataDataType {
    String,
    Number,
    Select,
    Multiselect,
    Date,
    Url,
}

/// Entity a metadata field is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataModel {
    Dataset,
    Resource,
    Usecase,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized metadata value '{0}'")]
pub struct ParseMetadataEnumError(pub String);

impl FromStr for MetadataDataType {
    type Err = ParseMetadataEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STRING" => Ok(Self::String),
            "NUMBER" => Ok(Self::Number),
            "SELECT" => Ok(Self::Select),
            "MULTISELECT" => Ok(Self::Multiselect),
            "DATE" => Ok(Self::Date),
            "URL" => Ok(Self::Url),
            _ => Err(ParseMetadataEnumError(s.to_string())),
        }
    }
}

impl FromStr for MetadataModel {
    type Err = ParseMetadataEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DATASET" => Ok(Self::Dataset),
            "RESOURCE" => Ok(Self::Resource),
            "USECASE" => Ok(Self::Usecase),
            _ => Err(ParseMetadataEnumError(s.to_string())),
        }
    }
}

impl MetadataModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "DATASET",
            Self::Resource => "RESOURCE",
            Self::Usecase => "USECASE",
        }
    }
}

/// A metadata field row as configured by catalog administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub id: i64,
    pub label: String,
    pub data_type: MetadataDataType,
    pub model: MetadataModel,
    pub enabled: bool,
    pub filterable: bool,
}

impl MetadataField {
    /// Facets and filters only consider fields that are both switched on and filterable.
    pub fn is_facetable(&self) -> bool {
        self.enabled && self.filterable
    }
}

/// Snapshot of the metadata fields of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSchema {
    fields: Vec<MetadataField>,
}

impl MetadataSchema {
    pub fn new(fields: Vec<MetadataField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[MetadataField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Labels to aggregate and filter on, in discovery order without duplicates.
    pub fn facet_labels(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for field in self.fields.iter().filter(|f| f.is_facetable()) {
            if !out.contains(&field.label) {
                out.push(field.label.clone());
            }
        }
        out
    }

    /// Labels that exist but must not be filtered on.
    ///
    /// A label shared by a facetable and a non-facetable row counts as facetable.
    pub fn excluded_labels(&self) -> Vec<String> {
        let facetable = self.facet_labels();
        let mut out: Vec<String> = Vec::new();
        for field in &self.fields {
            if !facetable.contains(&field.label) && !out.contains(&field.label) {
                out.push(field.label.clone());
            }
        }
        out
    }

    pub fn is_facetable(&self, label: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.label == label && f.is_facetable())
    }

    pub fn knows(&self, label: &str) -> bool {
        self.fields.iter().any(|f| f.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i64, label: &str, enabled: bool, filterable: bool) -> MetadataField {
        MetadataField {
            id,
            label: label.to_string(),
            data_type: MetadataDataType::Select,
            model: MetadataModel::Dataset,
            enabled,
            filterable,
        }
    }

    #[test]
    fn facet_labels_require_enabled_and_filterable() {
        let schema = MetadataSchema::new(vec![
            field(1, "Geography", true, true),
            field(2, "Source", true, false),
            field(3, "Frequency", false, true),
            field(4, "Geography", true, true),
        ]);
        assert_eq!(schema.facet_labels(), vec!["Geography"]);
        assert_eq!(schema.excluded_labels(), vec!["Source", "Frequency"]);
        assert!(schema.is_facetable("Geography"));
        assert!(!schema.is_facetable("Frequency"));
        assert!(schema.knows("Frequency"));
        assert!(!schema.knows("License"));
    }

    #[test]
    fn enum_parsing_is_case_insensitive() {
        assert_eq!(
            "multiselect".parse::<MetadataDataType>().unwrap(),
            MetadataDataType::Multiselect
        );
        assert_eq!(
            "UseCase".parse::<MetadataModel>().unwrap(),
            MetadataModel::Usecase
        );
        let err = "blob".parse::<MetadataDataType>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized metadata value 'blob'");
    }
}
