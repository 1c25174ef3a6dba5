//! Turns schema names into identifiers that can be emitted as Rust.

use heck::{ToSnakeCase, ToUpperCamelCase};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Types the generated code refers to by name.
const PRELUDE_TYPES: &[&str] = &["Box", "Option", "Result", "String", "Vec"];

fn sanitize(name: String, fallback: &str, digit_prefix: &str) -> String {
    let mut identifier: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if identifier.is_empty() || identifier == "_" {
        identifier = fallback.to_owned();
    }

    if identifier.starts_with(|c: char| c.is_ascii_digit()) {
        identifier.insert_str(0, digit_prefix);
    }

    if KEYWORDS.contains(&identifier.as_str()) {
        identifier.push('_');
    }

    identifier
}

/// Type names, `UpperCamelCase`.
pub fn validate_class(name: &str) -> String {
    let mut identifier = sanitize(name.to_upper_camel_case(), "Type", "Type");

    if PRELUDE_TYPES.contains(&identifier.as_str()) {
        identifier.push('_');
    }

    identifier
}

/// Enumeration variants, `UpperCamelCase`.
pub fn validate_constant(name: &str) -> String {
    sanitize(name.to_upper_camel_case(), "Value", "Value")
}

/// Fields and parameters, `snake_case`.
pub fn validate_attribute(name: &str) -> String {
    sanitize(name.to_snake_case(), "field", "_")
}

/// Methods generated for service operations, `snake_case`.
pub fn validate_operation(name: &str) -> String {
    sanitize(name.to_snake_case(), "operation", "_")
}

/// Returns `name`, or `name` with the first numeric suffix for which `is_free` holds.
pub fn validate_unique(name: &str, is_free: impl Fn(&str) -> bool) -> String {
    if is_free(name) {
        return name.to_owned();
    }

    let mut suffix = 1;

    loop {
        let candidate = format!("{}{}", name, suffix);

        if is_free(&candidate) {
            return candidate;
        }

        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_names() {
        assert_eq!(validate_class("ArrayOfForecast"), "ArrayOfForecast");
        assert_eq!(validate_class("get-weather_info"), "GetWeatherInfo");
        assert_eq!(validate_class("3d"), "Type3d");
        assert_eq!(validate_class("Self"), "Self_");
        assert_eq!(validate_class("---"), "Type");
        assert_eq!(validate_class("string"), "String_");
    }

    #[test]
    fn constant_names() {
        assert_eq!(validate_constant("celsius"), "Celsius");
        assert_eq!(validate_constant("2"), "Value2");
        assert_eq!(validate_constant("in stock"), "InStock");
        assert_eq!(validate_constant(""), "Value");
    }

    #[test]
    fn attribute_names() {
        assert_eq!(validate_attribute("ElevationMeters"), "elevation_meters");
        assert_eq!(validate_attribute("type"), "type_");
        assert_eq!(validate_attribute("9lives"), "_9lives");
        assert_eq!(validate_operation("GetForecast"), "get_forecast");
    }

    #[test]
    fn unique_names() {
        let taken = ["A", "A1", "A2"];

        assert_eq!(validate_unique("B", |name| !taken.contains(&name)), "B");
        assert_eq!(validate_unique("A", |name| !taken.contains(&name)), "A3");
    }
}
