//! Analysis result types.
//!
//! Every value here is produced fresh by one analysis run and is not mutated
//! once returned. Class names are the only cross-references between them.

pub mod action;
pub mod auth;
pub mod params;
pub mod response;
pub mod route;
pub mod rules;
pub mod schema;

pub use action::{
    CallbackInfo, ControllerActionResult, EnumParameter, FractalInfo, ResponseLinkInfo,
};
pub use auth::{AuthenticationInfo, SchemeRegistry, SecurityRequirement, SecurityScheme};
pub use params::{
    Constraints, CustomRuleInfo, EnumInfo, FileUploadInfo, ParameterInfo, ParameterLocation,
    PasswordRequirements,
};
pub use response::{PaginationInfo, PaginationKind, ResponseInfo};
pub use route::{HttpMethod, PathParameter, RouteDescriptor};
pub use rules::{
    ConditionalRuleSet, RuleBranch, RuleCondition, RuleObject, RuleToken, ValidationRuleSet,
};
pub use schema::{IncludeInfo, IncludeKind, InferredType, PropertyInfo, ResourceSchema, SchemaType};
