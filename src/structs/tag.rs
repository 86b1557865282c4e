//! Field tag grammar
//!
//! | Tag                  | Meaning                                   |
//! |----------------------|-------------------------------------------|
//! | `<type>`             | mask with the desensitizer for `<type>`   |
//! | `<type>,recursive`   | mask string leaves and descend into structs |
//! | `<type>,skip` / `-`  | leave the field alone                     |
//! | `custom:<name>`      | apply a registered custom strategy        |
//! | `recursive`          | descend only                              |
//!
//! Anything else, including an empty tag, leaves the field untouched.

/// Parsed field tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Mask with a desensitization type
    Type { kind: String, recursive: bool },
    /// Apply a named custom strategy
    Custom(String),
    /// Descend into nested structs without masking
    Recurse,
    /// Explicitly skipped
    Skip,
    /// Empty or unrecognized tag
    Untouched,
}

impl FieldPolicy {
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        match tag {
            "" => return Self::Untouched,
            "-" => return Self::Skip,
            "recursive" => return Self::Recurse,
            _ => {}
        }

        if let Some(name) = tag.strip_prefix("custom:") {
            let name = name.trim();
            return if name.is_empty() || name.contains(',') {
                Self::Untouched
            } else {
                Self::Custom(name.to_string())
            };
        }

        let mut parts = tag.split(',').map(str::trim);
        let kind = match parts.next() {
            Some(kind) if is_type_name(kind) => kind.to_string(),
            _ => return Self::Untouched,
        };
        let mut recursive = false;
        for flag in parts {
            match flag {
                "skip" => return Self::Skip,
                "recursive" => recursive = true,
                _ => return Self::Untouched,
            }
        }
        Self::Type { kind, recursive }
    }

    /// What the walker does with the field, if anything.
    pub fn action(&self) -> Option<FieldAction> {
        match self {
            Self::Type { kind, recursive } => Some(FieldAction::Mask {
                kind: kind.clone(),
                recursive: *recursive,
            }),
            Self::Custom(name) => Some(FieldAction::Custom(name.clone())),
            Self::Recurse => Some(FieldAction::Recurse),
            Self::Skip | Self::Untouched => None,
        }
    }
}

fn is_type_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Action applied to a field value and everything inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAction {
    /// Mask string leaves with `kind`; descend into structs if `recursive`
    Mask { kind: String, recursive: bool },
    /// Apply a custom strategy to string leaves
    Custom(String),
    /// Descend into structs only
    Recurse,
}

impl FieldAction {
    /// Whether nested structs are walked.
    pub fn recurses(&self) -> bool {
        matches!(
            self,
            Self::Recurse | Self::Mask { recursive: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grammar() {
        assert_eq!(
            FieldPolicy::parse("phone"),
            FieldPolicy::Type {
                kind: "phone".into(),
                recursive: false
            }
        );
        assert_eq!(
            FieldPolicy::parse("email, recursive"),
            FieldPolicy::Type {
                kind: "email".into(),
                recursive: true
            }
        );
        assert_eq!(FieldPolicy::parse("phone,skip"), FieldPolicy::Skip);
        assert_eq!(FieldPolicy::parse("-"), FieldPolicy::Skip);
        assert_eq!(FieldPolicy::parse("recursive"), FieldPolicy::Recurse);
        assert_eq!(
            FieldPolicy::parse("custom:last4"),
            FieldPolicy::Custom("last4".into())
        );
    }

    #[test]
    fn test_unknown_tags_untouched() {
        for tag in ["", "  ", "custom:", "phone,weird", "not a type", "a,b,c"] {
            assert_eq!(FieldPolicy::parse(tag), FieldPolicy::Untouched, "{tag:?}");
        }
    }

    #[test]
    fn test_actions() {
        assert!(FieldPolicy::parse("recursive").action().unwrap().recurses());
        assert!(FieldPolicy::parse("phone,recursive").action().unwrap().recurses());
        assert!(!FieldPolicy::parse("phone").action().unwrap().recurses());
        assert!(FieldPolicy::parse("-").action().is_none());
    }
}
