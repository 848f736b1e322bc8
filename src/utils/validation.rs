//! Input validation utilities

use validator::{ValidationErrors, ValidationErrorsKind};

/// Flatten validator output into a single user-facing sentence.
///
/// Field errors use their custom message when one is declared, otherwise the
/// validator code (`length`, `range`, ...). Fields are reported in name order.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut parts = Vec::new();
    for (field, kind) in fields {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    parts.push(format!("{}: {}", field, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                parts.push(format!("{}: {}", field, describe_validation_errors(nested)));
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    parts.push(format!(
                        "{}[{}]: {}",
                        field,
                        index,
                        describe_validation_errors(nested)
                    ));
                }
            }
        }
    }

    parts.join("; ")
}
