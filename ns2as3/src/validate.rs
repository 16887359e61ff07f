//! Seam for an external declaration validation service.
//!
//! Schema validation and dry runs happen outside this crate; callers plug in
//! a client implementing [`DeclarationService`].

use serde::Serialize;
use serde_json::Value;

use crate::as3::{declaration_for, AppDeclaration, BuildOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

pub trait DeclarationService {
    type Error: std::error::Error;

    fn validate(&self, declaration: &Value) -> Result<ValidationOutcome, Self::Error>;

    fn dry_run(&self, declaration: &Value) -> Result<DryRunOutcome, Self::Error>;
}

/// Per-application validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppValidation {
    pub app: String,
    pub tenant: String,
    pub valid: bool,
    /// `None` when the dry run was not attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    pub errors: Vec<String>,
}

/// Validate each fragment on its own; dry-run only the valid ones.
///
/// Service failures are recorded against the application and do not stop
/// the batch.
pub fn validate_bulk<S: DeclarationService>(
    service: &S,
    fragments: &[AppDeclaration],
    opts: &BuildOptions,
) -> Vec<AppValidation> {
    fragments
        .iter()
        .map(|fragment| {
            let declaration = declaration_for(fragment, opts);
            let mut result = AppValidation {
                app: fragment.app.clone(),
                tenant: fragment.tenant.clone(),
                valid: false,
                dry_run: None,
                errors: Vec::new(),
            };

            match service.validate(&declaration) {
                Ok(outcome) => {
                    result.valid = outcome.valid;
                    result.errors.extend(outcome.errors);
                }
                Err(err) => {
                    log::warn!("validation call failed for {}: {err}", fragment.app);
                    result.errors.push(format!("validation call failed: {err}"));
                    return result;
                }
            }
            if !result.valid {
                return result;
            }

            match service.dry_run(&declaration) {
                Ok(outcome) => {
                    result.dry_run = Some(outcome.success);
                    result.errors.extend(outcome.errors);
                }
                Err(err) => {
                    log::warn!("dry run failed for {}: {err}", fragment.app);
                    result.dry_run = Some(false);
                    result.errors.push(format!("dry run call failed: {err}"));
                }
            }
            result
        })
        .collect()
}
