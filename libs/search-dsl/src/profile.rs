//! Per-entity search profiles
//!
//! A profile is the declarative description of one searchable entity: which
//! fields the free-text query touches, how each filter key maps onto the index,
//! which static facets are aggregated and which sort options exist. The query
//! and aggregation builders are generic over profiles.

use crate::params::SortOrder;
use crate::schema::MetadataModel;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Searchable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Dataset,
    Usecase,
    Aimodel,
    Publisher,
    Unified,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{0}'")]
pub struct ParseEntityKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dataset" => Ok(Self::Dataset),
            "usecase" => Ok(Self::Usecase),
            "aimodel" => Ok(Self::Aimodel),
            "publisher" => Ok(Self::Publisher),
            "unified" => Ok(Self::Unified),
            _ => Err(ParseEntityKindError(s.to_string())),
        }
    }
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Usecase => "usecase",
            Self::Aimodel => "aimodel",
            Self::Publisher => "publisher",
            Self::Unified => "unified",
        }
    }

    pub fn profile(self) -> &'static SearchProfile {
        match self {
            Self::Dataset => &DATASET,
            Self::Usecase => &USECASE,
            Self::Aimodel => &AIMODEL,
            Self::Publisher => &PUBLISHER,
            Self::Unified => &UNIFIED,
        }
    }

    /// Entity types unified search may span.
    pub const UNIFIED_MEMBERS: [EntityKind; 3] = [Self::Dataset, Self::Usecase, Self::Aimodel];
}

/// One `should` contribution of the free-text query.
#[derive(Debug, Clone, Copy)]
pub enum TextClause {
    /// `fuzzy` on a top-level field.
    Fuzzy { field: &'static str },
    /// `nested` wrapper around `wildcard *q*` OR `fuzzy` on a nested field.
    NestedFuzzy {
        path: &'static str,
        field: &'static str,
    },
    /// `multi_match` with fuzziness over boosted fields (`title^3`).
    MultiMatch { fields: &'static [&'static str] },
    /// `nested` wrapper around a fuzzy `multi_match`.
    NestedMultiMatch {
        path: &'static str,
        fields: &'static [&'static str],
    },
    /// `nested` wrapper around one `wildcard *q*` per field.
    NestedWildcard {
        path: &'static str,
        fields: &'static [&'static str],
    },
}

/// How a filter key maps onto the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    /// Comma list → `terms`.
    Terms { field: &'static str },
    /// One value → `term`, several → `terms`.
    Term { field: &'static str },
    /// `true|1|yes` → `term true`, anything else → `term false`.
    Boolean { field: &'static str },
    /// `nested` wrapper around a `term`/`terms`.
    Nested {
        path: &'static str,
        field: &'static str,
    },
    /// Analyzed `match`; several values match any of them.
    Match { field: &'static str },
}

/// A statically configured terms facet.
#[derive(Debug, Clone, Copy)]
pub struct FacetSpec {
    /// Facet label in responses (and aggregation name in requests).
    pub name: &'static str,
    pub field: &'static str,
    /// Set when `field` lives in a nested document.
    pub nested_path: Option<&'static str>,
    /// Bucket count; `None` uses the configured default.
    pub size: Option<usize>,
}

impl FacetSpec {
    const fn terms(name: &'static str, field: &'static str) -> Self {
        Self {
            name,
            field,
            nested_path: None,
            size: None,
        }
    }

    const fn sized(name: &'static str, field: &'static str, size: usize) -> Self {
        Self {
            name,
            field,
            nested_path: None,
            size: Some(size),
        }
    }

    const fn nested(
        name: &'static str,
        path: &'static str,
        field: &'static str,
        size: usize,
    ) -> Self {
        Self {
            name,
            field,
            nested_path: Some(path),
            size: Some(size),
        }
    }
}

/// One sort key; `fixed` pins the direction regardless of the request.
#[derive(Debug, Clone, Copy)]
pub enum SortClause {
    Field {
        field: &'static str,
        fixed: Option<SortOrder>,
    },
    Script {
        source: &'static str,
        fixed: Option<SortOrder>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct SortOption {
    pub name: &'static str,
    pub clauses: &'static [SortClause],
}

/// Declarative description of one searchable entity.
#[derive(Debug)]
pub struct SearchProfile {
    pub kind: EntityKind,
    /// Index names used when configuration does not override them.
    pub default_indices: &'static [&'static str],
    pub text: &'static [TextClause],
    pub filters: &'static [(&'static str, FilterRule)],
    pub facets: &'static [FacetSpec],
    pub sorts: &'static [SortOption],
    /// Model whose dynamic metadata fields become facets and filters.
    pub metadata_model: Option<MetadataModel>,
    /// Set for multi-index profiles where nested paths or sort fields may be unmapped.
    pub multi_index: bool,
}

impl SearchProfile {
    pub fn filter_rule(&self, key: &str) -> Option<FilterRule> {
        self.filters
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, rule)| *rule)
    }

    pub fn sort_option(&self, name: &str) -> Option<&SortOption> {
        self.sorts.iter().find(|s| s.name == name)
    }
}

const fn by(field: &'static str) -> SortClause {
    SortClause::Field { field, fixed: None }
}

const fn fixed(field: &'static str, order: SortOrder) -> SortClause {
    SortClause::Field {
        field,
        fixed: Some(order),
    }
}

pub static DATASET: SearchProfile = SearchProfile {
    kind: EntityKind::Dataset,
    default_indices: &["dataset"],
    text: &[
        TextClause::Fuzzy { field: "title" },
        TextClause::Fuzzy {
            field: "description",
        },
        TextClause::Fuzzy { field: "tags" },
        TextClause::NestedFuzzy {
            path: "metadata",
            field: "metadata.value",
        },
        TextClause::NestedFuzzy {
            path: "resources",
            field: "resources.name",
        },
        TextClause::NestedFuzzy {
            path: "organization",
            field: "organization.name",
        },
    ],
    filters: &[
        ("tags", FilterRule::Terms { field: "tags.raw" }),
        ("sectors", FilterRule::Terms {
            field: "sectors.raw",
        }),
        ("formats", FilterRule::Terms {
            field: "formats.raw",
        }),
        ("geographies", FilterRule::Terms {
            field: "geographies.raw",
        }),
        ("status", FilterRule::Term { field: "status" }),
        ("is_individual_dataset", FilterRule::Boolean {
            field: "is_individual_dataset",
        }),
        ("organization", FilterRule::Nested {
            path: "organization",
            field: "organization.name",
        }),
    ],
    facets: &[
        FacetSpec::terms("tags", "tags.raw"),
        FacetSpec::terms("sectors", "sectors.raw"),
        FacetSpec::terms("formats", "formats.raw"),
        FacetSpec::terms("geographies", "geographies.raw"),
        FacetSpec::terms("status", "status"),
    ],
    sorts: &[
        SortOption {
            name: "alphabetical",
            clauses: &[by("title.raw")],
        },
        SortOption {
            name: "recent",
            clauses: &[by("modified")],
        },
        SortOption {
            name: "popular",
            clauses: &[by("download_count")],
        },
    ],
    metadata_model: Some(MetadataModel::Dataset),
    multi_index: false,
};

pub static USECASE: SearchProfile = SearchProfile {
    kind: EntityKind::Usecase,
    default_indices: &["usecase"],
    text: &[
        TextClause::Fuzzy { field: "title" },
        TextClause::Fuzzy { field: "summary" },
        TextClause::Fuzzy { field: "tags" },
        TextClause::Fuzzy { field: "sectors" },
        TextClause::NestedFuzzy {
            path: "user",
            field: "user.name",
        },
        TextClause::NestedFuzzy {
            path: "organization",
            field: "organization.name",
        },
        TextClause::NestedFuzzy {
            path: "contributors",
            field: "contributors.name",
        },
        TextClause::NestedFuzzy {
            path: "organizations",
            field: "organizations.name",
        },
        TextClause::NestedFuzzy {
            path: "datasets",
            field: "datasets.title",
        },
        TextClause::NestedFuzzy {
            path: "datasets",
            field: "datasets.description",
        },
        TextClause::NestedFuzzy {
            path: "metadata",
            field: "metadata.value",
        },
    ],
    filters: &[
        ("tags", FilterRule::Terms { field: "tags.raw" }),
        ("sectors", FilterRule::Terms {
            field: "sectors.raw",
        }),
        ("status", FilterRule::Term { field: "status" }),
        ("running_status", FilterRule::Term {
            field: "running_status",
        }),
        ("is_individual_usecase", FilterRule::Boolean {
            field: "is_individual_usecase",
        }),
        ("user.name", FilterRule::Nested {
            path: "user",
            field: "user.name",
        }),
        ("organization.name", FilterRule::Nested {
            path: "organization",
            field: "organization.name",
        }),
    ],
    facets: &[
        FacetSpec::sized("tags", "tags.raw", 100),
        FacetSpec::sized("sectors", "sectors.raw", 100),
        FacetSpec::sized("status", "status", 100),
        FacetSpec::sized("running_status", "running_status", 100),
        FacetSpec::sized("is_individual_usecase", "is_individual_usecase", 100),
        FacetSpec::nested("user.name", "user", "user.name", 100),
        FacetSpec::nested("organization.name", "organization", "organization.name", 100),
    ],
    sorts: &[
        SortOption {
            name: "alphabetical",
            clauses: &[by("title.raw")],
        },
        SortOption {
            name: "recent",
            clauses: &[by("modified")],
        },
        SortOption {
            name: "started",
            clauses: &[by("started_on")],
        },
        SortOption {
            name: "completed",
            clauses: &[by("completed_on")],
        },
    ],
    metadata_model: Some(MetadataModel::Usecase),
    multi_index: false,
};

pub static AIMODEL: SearchProfile = SearchProfile {
    kind: EntityKind::Aimodel,
    default_indices: &["aimodel"],
    text: &[
        TextClause::Fuzzy { field: "name" },
        TextClause::Fuzzy {
            field: "display_name",
        },
        TextClause::Fuzzy {
            field: "description",
        },
        TextClause::Fuzzy { field: "tags" },
        TextClause::Fuzzy {
            field: "provider_model_id",
        },
    ],
    filters: &[
        ("tags", FilterRule::Terms { field: "tags.raw" }),
        ("model_type", FilterRule::Term {
            field: "model_type",
        }),
        ("provider", FilterRule::Term { field: "provider" }),
        ("status", FilterRule::Term { field: "status" }),
        ("supported_languages", FilterRule::Term {
            field: "supported_languages",
        }),
        ("is_public", FilterRule::Boolean { field: "is_public" }),
        ("is_active", FilterRule::Boolean { field: "is_active" }),
        ("supports_streaming", FilterRule::Boolean {
            field: "supports_streaming",
        }),
        ("organization", FilterRule::Nested {
            path: "organization",
            field: "organization.name",
        }),
        ("user", FilterRule::Nested {
            path: "user",
            field: "user.name",
        }),
    ],
    facets: &[
        FacetSpec::terms("model_type", "model_type"),
        FacetSpec::terms("provider", "provider"),
        FacetSpec::terms("status", "status"),
        FacetSpec::terms("tags", "tags.raw"),
        FacetSpec::terms("supported_languages", "supported_languages"),
        FacetSpec::terms("is_public", "is_public"),
        FacetSpec::terms("is_active", "is_active"),
        FacetSpec::terms("supports_streaming", "supports_streaming"),
    ],
    sorts: &[
        SortOption {
            name: "alphabetical",
            clauses: &[by("name.raw")],
        },
        SortOption {
            name: "recent",
            clauses: &[by("updated_at")],
        },
        SortOption {
            name: "created",
            clauses: &[by("created_at")],
        },
        SortOption {
            name: "performance",
            clauses: &[
                fixed("success_rate", SortOrder::Desc),
                fixed("average_latency_ms", SortOrder::Asc),
            ],
        },
        SortOption {
            name: "audit_score",
            clauses: &[by("last_audit_score")],
        },
        SortOption {
            name: "popular",
            clauses: &[by("audit_count")],
        },
    ],
    metadata_model: None,
    multi_index: false,
};

pub static PUBLISHER: SearchProfile = SearchProfile {
    kind: EntityKind::Publisher,
    default_indices: &["organization_publisher", "user_publisher"],
    text: &[
        TextClause::MultiMatch {
            fields: &["name^3", "full_name^3"],
        },
        TextClause::MultiMatch {
            fields: &["description^2", "bio^2"],
        },
        TextClause::MultiMatch {
            fields: &["sectors^2"],
        },
        TextClause::MultiMatch {
            fields: &[
                "username",
                "email",
                "location",
                "organization_types",
                "first_name",
                "last_name",
            ],
        },
    ],
    filters: &[
        ("publisher_type", FilterRule::Term {
            field: "publisher_type",
        }),
        ("sectors", FilterRule::Terms {
            field: "sectors.raw",
        }),
        ("organization_types", FilterRule::Term {
            field: "organization_types",
        }),
        ("location", FilterRule::Match { field: "location" }),
    ],
    facets: &[
        FacetSpec::terms("publisher_type", "publisher_type"),
        FacetSpec::sized("sectors", "sectors.raw", 50),
        FacetSpec::sized("organization_types", "organization_types", 20),
        FacetSpec::sized("locations", "location.raw", 20),
    ],
    sorts: &[
        SortOption {
            name: "alphabetical",
            clauses: &[fixed("name.raw", SortOrder::Asc)],
        },
        SortOption {
            name: "datasets_count",
            clauses: &[fixed("published_datasets_count", SortOrder::Desc)],
        },
        SortOption {
            name: "usecases_count",
            clauses: &[fixed("published_usecases_count", SortOrder::Desc)],
        },
        SortOption {
            name: "total_contributions",
            clauses: &[SortClause::Script {
                source: "doc['published_datasets_count'].value + doc['published_usecases_count'].value",
                fixed: Some(SortOrder::Desc),
            }],
        },
        SortOption {
            name: "members_count",
            clauses: &[fixed("members_count", SortOrder::Desc)],
        },
        SortOption {
            name: "recent",
            clauses: &[fixed("created", SortOrder::Desc)],
        },
    ],
    metadata_model: None,
    multi_index: true,
};

pub static UNIFIED: SearchProfile = SearchProfile {
    kind: EntityKind::Unified,
    default_indices: &["dataset", "usecase", "aimodel"],
    text: &[
        TextClause::MultiMatch {
            fields: &["title^3", "name^3", "display_name^3"],
        },
        TextClause::MultiMatch {
            fields: &["description^2", "summary^2"],
        },
        TextClause::MultiMatch {
            fields: &["tags^2"],
        },
        TextClause::NestedWildcard {
            path: "resources",
            fields: &["resources.name", "resources.description"],
        },
        TextClause::NestedMultiMatch {
            path: "datasets",
            fields: &["datasets.title", "datasets.description"],
        },
        TextClause::NestedMultiMatch {
            path: "contributors",
            fields: &["contributors.name"],
        },
        TextClause::NestedMultiMatch {
            path: "organization",
            fields: &["organization.name"],
        },
        TextClause::NestedMultiMatch {
            path: "user",
            fields: &["user.name"],
        },
    ],
    filters: &[
        ("tags", FilterRule::Terms { field: "tags.raw" }),
        ("sectors", FilterRule::Terms {
            field: "sectors.raw",
        }),
        ("geographies", FilterRule::Terms {
            field: "geographies.raw",
        }),
        ("status", FilterRule::Term { field: "status" }),
    ],
    facets: &[
        FacetSpec::terms("types", "_index"),
        FacetSpec::sized("tags", "tags.raw", 50),
        FacetSpec::sized("sectors", "sectors.raw", 50),
        FacetSpec::sized("geographies", "geographies.raw", 50),
        FacetSpec::terms("status", "status"),
    ],
    sorts: &[
        SortOption {
            name: "alphabetical",
            clauses: &[by("title.raw")],
        },
        SortOption {
            name: "recent",
            clauses: &[by("modified")],
        },
    ],
    metadata_model: None,
    multi_index: true,
};
