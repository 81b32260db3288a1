//! Plain records produced by the project scanner and source summarizer.
//!
//! The model-interaction core treats these as opaque prompt inputs.

use serde::{Deserialize, Serialize};

/// What a scan of the source project found. All paths are relative to the
/// source root and use `/` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScan {
    pub files: Vec<String>,
    pub java_files: Vec<String>,
    pub directories: Vec<String>,
    pub build_files: Vec<String>,
    pub config_files: Vec<String>,
    pub src_main_java_exists: bool,
    /// Leading bytes of the first `pom.xml` found, possibly truncated.
    pub pom_xml_head: Option<String>,
}

/// One top-level type declared in a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// `class`, `interface`, `enum`, `record` or `@interface`.
    pub kind: String,
    pub name: String,
    pub annotations: Vec<String>,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
}

/// Header-level summary of a Java source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub types: Vec<TypeInfo>,
}

impl SourceSummary {
    /// Every annotation on every declared type.
    pub fn annotations(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .flat_map(|t| t.annotations.iter().map(String::as_str))
    }
}

/// Translation batch a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    Model,
    Service,
    Rest,
    Other,
    Unknown,
}

impl FileCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Service => "service",
            Self::Rest => "rest",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
