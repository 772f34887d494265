use super::schema::{PropertyInfo, ResourceSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Paginator flavours Laravel produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationKind {
    /// `paginate()` / `LengthAwarePaginator`
    LengthAware,
    /// `simplePaginate()` / `Paginator`
    Simple,
    /// `cursorPaginate()` / `CursorPaginator`
    Cursor,
}

impl PaginationKind {
    /// Keys of the paginator's serialised envelope
    pub fn meta_fields(&self) -> &'static [&'static str] {
        match self {
            PaginationKind::LengthAware => &[
                "current_page",
                "from",
                "last_page",
                "per_page",
                "to",
                "total",
                "path",
                "first_page_url",
                "last_page_url",
                "next_page_url",
                "prev_page_url",
            ],
            PaginationKind::Simple => &[
                "current_page",
                "from",
                "per_page",
                "to",
                "path",
                "first_page_url",
                "next_page_url",
                "prev_page_url",
            ],
            PaginationKind::Cursor => &["per_page", "path", "next_cursor", "prev_cursor", "next_page_url", "prev_page_url"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub kind: PaginationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Model being paginated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Resource wrapping the paginator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// `call` or `return_type`
    pub source: String,
}

/// Response shape of one controller action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseInfo {
    Void {
        status: u16,
    },
    Object {
        status: u16,
        properties: BTreeMap<String, PropertyInfo>,
    },
    Resource {
        status: u16,
        class: String,
        #[serde(default)]
        is_collection: bool,
    },
    Collection {
        status: u16,
        /// Model or resource class of the elements
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_class: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<ResourceSchema>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pagination: Option<PaginationInfo>,
    },
    BinaryFile {
        content_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        /// Sent as an attachment rather than inline
        #[serde(default)]
        attachment: bool,
    },
    Streamed {
        content_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Custom {
        status: u16,
        content_type: String,
    },
    Unknown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ResponseInfo {
    pub fn unknown() -> Self {
        ResponseInfo::Unknown { error: None }
    }

    pub fn unknown_because(error: impl Into<String>) -> Self {
        ResponseInfo::Unknown {
            error: Some(error.into()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ResponseInfo::Unknown { .. })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ResponseInfo::Void { .. } => "void",
            ResponseInfo::Object { .. } => "object",
            ResponseInfo::Resource { .. } => "resource",
            ResponseInfo::Collection { .. } => "collection",
            ResponseInfo::BinaryFile { .. } => "binary_file",
            ResponseInfo::Streamed { .. } => "streamed",
            ResponseInfo::Custom { .. } => "custom",
            ResponseInfo::Unknown { .. } => "unknown",
        }
    }

    /// HTTP status, when the shape carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            ResponseInfo::Void { status }
            | ResponseInfo::Object { status, .. }
            | ResponseInfo::Resource { status, .. }
            | ResponseInfo::Collection { status, .. }
            | ResponseInfo::Custom { status, .. } => Some(*status),
            ResponseInfo::BinaryFile { .. } | ResponseInfo::Streamed { .. } => Some(200),
            ResponseInfo::Unknown { .. } => None,
        }
    }
}

impl Default for ResponseInfo {
    fn default() -> Self {
        ResponseInfo::unknown()
    }
}
