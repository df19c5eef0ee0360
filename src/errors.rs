use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Injection error: {0}")]
    Inject(#[from] InjectError),
    #[error("Application error: {0}")]
    Generic(String), // For simple string-based errors
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Failed to parse JSON from file '{0}': {1}")]
    JsonParse(String, #[source] serde_json::Error),
    #[error("Failed to parse YAML from file '{0}': {1}")]
    YamlParse(String, #[source] serde_yaml::Error),
    #[error("Unsupported configuration format for file '{0}'")]
    UnsupportedFormat(String),
}

/// Errors raised while wiring an object graph.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The build target is not a registered structure.
    #[error("Invalid injection target: {0}")]
    InvalidTarget(String),
    /// A literal default attached to a field could not be parsed.
    #[error("Invalid literal default {literal:?} for field '{field}': {reason}")]
    InvalidDefault {
        field: String,
        literal: String,
        reason: String,
    },
    #[error("Cannot coerce {found} into {expected}")]
    Coercion { expected: &'static str, found: String },
    #[error("Unknown or read-only field '{0}'")]
    UnknownField(String),
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Failed to set field '{field}' of {component}: {source}")]
    Field {
        component: String,
        field: String,
        #[source]
        source: Box<InjectError>,
    },
}

impl InjectError {
    /// Shorthand used by `Component::set_field` implementations for names they do not own.
    pub fn unknown_field(name: &str) -> Self {
        InjectError::UnknownField(name.to_string())
    }

    pub(crate) fn coercion(expected: &'static str, found: impl std::fmt::Debug) -> Self {
        InjectError::Coercion {
            expected,
            found: format!("{:?}", found),
        }
    }

    pub(crate) fn in_field(self, component: &str, field: &str) -> Self {
        match self {
            // Keep the innermost location
            e @ InjectError::Field { .. } => e,
            e => InjectError::Field {
                component: component.to_string(),
                field: field.to_string(),
                source: Box::new(e),
            },
        }
    }

    pub fn is_unknown_field(&self) -> bool {
        matches!(self, InjectError::UnknownField(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_toml_error() -> toml::de::Error {
        toml::from_str::<toml::Value>("invalid_toml").err().unwrap()
    }

    #[test]
    fn test_config_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err_file_read = ConfigError::FileRead("inject.toml".to_string(), io_err);
        assert_eq!(
            format!("{}", err_file_read),
            "Failed to read file 'inject.toml': file not found"
        );

        let err_toml_parse = ConfigError::TomlParse("inject.toml".to_string(), mock_toml_error());
        assert!(format!("{}", err_toml_parse)
            .starts_with("Failed to parse TOML from file 'inject.toml': "));

        let err_format = ConfigError::UnsupportedFormat("inject.ini".to_string());
        assert_eq!(
            format!("{}", err_format),
            "Unsupported configuration format for file 'inject.ini'"
        );
    }

    #[test]
    fn test_inject_error_display() {
        let err = InjectError::InvalidDefault {
            field: "count".to_string(),
            literal: "twelve".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid literal default \"twelve\" for field 'count': invalid digit found in string"
        );

        let err = InjectError::coercion("bool", vec![1, 2]);
        assert_eq!(format!("{}", err), "Cannot coerce [1, 2] into bool");
    }

    #[test]
    fn test_in_field_keeps_innermost_location() {
        let inner = InjectError::unknown_field("x").in_field("Inner", "x");
        let outer = inner.in_field("Outer", "inner");
        match outer {
            InjectError::Field {
                component, field, ..
            } => {
                assert_eq!(component, "Inner");
                assert_eq!(field, "x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_app_error_from_conversions() {
        let app: AppError = InjectError::InvalidTarget("Nope".to_string()).into();
        assert_eq!(
            format!("{}", app),
            "Injection error: Invalid injection target: Nope"
        );

        let app: AppError = ConfigError::UnsupportedFormat("a.ini".to_string()).into();
        assert!(matches!(app, AppError::Config(_)));
    }
}
