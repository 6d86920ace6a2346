mod detector;
mod model;
mod variables;

pub use detector::analyze;
pub use model::{AnalysisSummary, EnvironmentData, TokenData, VariableAnalysis};
pub use variables::{
    host_variable, is_auth_header, origin_key, placeholder, shared_host_variable, substitute_header,
    token_key,
};
