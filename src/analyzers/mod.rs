//! Leaf analyzers and the per-action orchestrator.
//!
//! Every analyzer borrows the run's [`AnalysisContext`](crate::context::AnalysisContext)
//! and reports recoverable failures to its warning sink instead of returning
//! errors.

pub mod authentication;
pub mod callbacks;
pub mod conditional;
pub mod controller;
pub mod custom_rule;
pub mod enums;
pub mod file_upload;
pub mod form_request;
pub mod fractal;
pub mod header_params;
pub mod inline_validation;
pub mod literal;
pub mod mime;
pub mod model;
pub mod pagination;
pub mod parameters;
pub mod password_rule;
pub mod query_params;
pub mod resource;
pub mod response;
pub mod response_links;
pub mod rule_extraction;

pub use authentication::AuthenticationAnalyzer;
pub use controller::ControllerAnalyzer;
pub use form_request::FormRequestAnalyzer;
pub use fractal::FractalAnalyzer;
pub use resource::ResourceAnalyzer;
pub use response::ResponseAnalyzer;
