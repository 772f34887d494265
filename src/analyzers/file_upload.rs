//! Upload constraints from file rule tokens.

use super::mime::{mime_for_extension, IMAGE_MIME_TYPES};
use crate::model::{FileUploadInfo, RuleToken};

const FILE_RULES: &[&str] = &["file", "image", "mimes", "mimetypes", "extensions"];

/// Laravel sizes file rules in kilobytes
const KILOBYTE: u64 = 1024;

pub struct FileUploadAnalyzer;

impl FileUploadAnalyzer {
    /// Whether any token marks the field as a file upload
    pub fn is_file_field(tokens: &[RuleToken]) -> bool {
        tokens.iter().any(|token| {
            token
                .name()
                .is_some_and(|name| FILE_RULES.contains(&name.as_str()))
        })
    }

    /// Structured upload constraints, or `None` when the field is not a file
    pub fn analyze(field: &str, tokens: &[RuleToken]) -> Option<FileUploadInfo> {
        if !Self::is_file_field(tokens) {
            return None;
        }

        let mut info = FileUploadInfo {
            multiple: field.split('.').any(|segment| segment == "*"),
            ..FileUploadInfo::default()
        };

        for token in tokens {
            let Some(name) = token.name() else { continue };
            let args = token.arguments();
            match name.as_str() {
                "image" => info.is_image = true,
                "mimes" | "extensions" => {
                    for extension in &args {
                        let extension = extension.to_ascii_lowercase();
                        let mime = mime_for_extension(&extension).to_string();
                        if !info.mime_types.contains(&mime) {
                            info.mime_types.push(mime);
                        }
                        if !info.extensions.contains(&extension) {
                            info.extensions.push(extension);
                        }
                    }
                }
                "mimetypes" => {
                    for mime in &args {
                        let mime = mime.to_ascii_lowercase();
                        if !info.mime_types.contains(&mime) {
                            info.mime_types.push(mime);
                        }
                    }
                }
                "max" => info.max_size = kilobytes(args.first()),
                "min" => info.min_size = kilobytes(args.first()),
                "size" => {
                    info.min_size = kilobytes(args.first());
                    info.max_size = info.min_size;
                }
                "between" if args.len() == 2 => {
                    info.min_size = kilobytes(args.first());
                    info.max_size = kilobytes(args.get(1));
                }
                "dimensions" => {
                    for pair in &args {
                        if let Some((key, value)) = pair.split_once('=') {
                            info.dimensions
                                .insert(key.trim().to_string(), value.trim().to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        if info.is_image && info.mime_types.is_empty() {
            info.mime_types = IMAGE_MIME_TYPES.iter().map(|m| m.to_string()).collect();
        }
        if info.mime_types.iter().all(|m| m.starts_with("image/")) && !info.mime_types.is_empty() {
            info.is_image = true;
        }
        Some(info)
    }
}

/// `None` when the byte count does not fit a `u64`
fn kilobytes(arg: Option<&&str>) -> Option<u64> {
    arg.and_then(|a| a.trim().parse::<u64>().ok())
        .and_then(|kb| kb.checked_mul(KILOBYTE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rules::split_rule_string;

    #[test]
    fn test_max_kilobytes_become_bytes() {
        let info = FileUploadAnalyzer::analyze("document", &split_rule_string("required|file|max:5120")).unwrap();
        assert_eq!(info.max_size, Some(5120 * 1024));
        assert_eq!(info.max_size, Some(5_242_880));
        assert!(!info.multiple);
    }

    #[test]
    fn test_oversized_limit_is_dropped() {
        let info = FileUploadAnalyzer::analyze("f", &split_rule_string("file|min:1|max:18014398509481984")).unwrap();
        assert_eq!(info.max_size, None);
        assert_eq!(info.min_size, Some(1024));
    }

    #[test]
    fn test_image_defaults_and_dimensions() {
        let info = FileUploadAnalyzer::analyze(
            "photos.*",
            &split_rule_string("image|dimensions:min_width=100,max_height=500"),
        )
        .unwrap();
        assert!(info.is_image);
        assert!(info.multiple);
        assert_eq!(info.mime_types.len(), IMAGE_MIME_TYPES.len());
        assert_eq!(info.dimensions.get("min_width").map(String::as_str), Some("100"));
        assert_eq!(info.dimensions.get("max_height").map(String::as_str), Some("500"));
    }

    #[test]
    fn test_mimes_map_to_mime_types() {
        let info = FileUploadAnalyzer::analyze("cv", &split_rule_string("file|mimes:pdf,docx|min:10")).unwrap();
        assert_eq!(info.extensions, vec!["pdf", "docx"]);
        assert_eq!(info.mime_types[0], "application/pdf");
        assert_eq!(info.min_size, Some(10 * 1024));
        assert!(!info.is_image);
    }

    #[test]
    fn test_non_file_field() {
        assert!(FileUploadAnalyzer::analyze("name", &split_rule_string("required|max:255")).is_none());
    }
}
