use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("`{field}` {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("unknown {kind} `{name}`")]
    Unknown { kind: &'static str, name: String },
}

impl DomainError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Unknown {
            kind,
            name: name.into(),
        }
    }
}

/// Trim a required text field, rejecting missing or blank values.
pub fn require_text(value: Option<String>, field: &'static str) -> Result<String, DomainError> {
    let value = value.ok_or_else(|| DomainError::validation(field, "is required"))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims_surrounding_whitespace() {
        let value = require_text(Some("  Hello  ".to_string()), "title").expect("valid");
        assert_eq!(value, "Hello");
    }

    #[test]
    fn require_text_rejects_missing_and_blank() {
        assert!(matches!(
            require_text(None, "title"),
            Err(DomainError::Validation { field: "title", .. })
        ));
        assert!(matches!(
            require_text(Some("   ".to_string()), "content"),
            Err(DomainError::Validation {
                field: "content",
                ..
            })
        ));
    }
}
