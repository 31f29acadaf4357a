//! Reserved names shared by the operator and its configuration surface.

/// Implicit target name used when no `emits` list is supplied
pub const DEFAULT_EMIT: &str = "__out__";

/// Public operator name in single-output mode
pub const SINGLE_OUTPUT_OPERATOR: &str = "merge";

/// Public operator name in multi-output mode
pub const MULTI_OUTPUT_OPERATOR: &str = "multi_merge";

/// Operator name as reported in configuration errors
pub fn operator_name(emits_supplied: bool) -> &'static str {
    if emits_supplied {
        MULTI_OUTPUT_OPERATOR
    } else {
        SINGLE_OUTPUT_OPERATOR
    }
}
