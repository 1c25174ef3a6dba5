use std::fmt;

/// How the client is told to cache the WSDL, named after the `WSDL_CACHE_*` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    None,
    Disk,
    Memory,
    Both,
}

impl CacheMode {
    pub fn token(&self) -> &'static str {
        match self {
            Self::None => "WSDL_CACHE_NONE",
            Self::Disk => "WSDL_CACHE_DISK",
            Self::Memory => "WSDL_CACHE_MEMORY",
            Self::Both => "WSDL_CACHE_BOTH",
        }
    }
}

/// Unknown tokens mean no caching. The `WSDL_CACHE_` prefix may be left out.
impl From<&str> for CacheMode {
    fn from(token: &str) -> Self {
        let token = token.trim().to_ascii_uppercase();

        match token.strip_prefix("WSDL_CACHE_").unwrap_or(&token) {
            "DISK" => Self::Disk,
            "MEMORY" => Self::Memory,
            "BOTH" => Self::Both,
            _ => Self::None,
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Module the generated code is placed in.
    pub namespace: Option<String>,
    /// Client features recorded on the service.
    pub features: Vec<String>,
    pub cache: CacheMode,
    pub compression: Option<String>,
    /// Emit everything into a single file instead of one file per class.
    pub one_file: bool,
    /// Leave files that already exist untouched.
    pub class_exists: bool,
    /// Drop types with invalid enumeration values instead of failing.
    pub skip_invalid_types: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cache_tokens() {
        assert_eq!(CacheMode::from("WSDL_CACHE_MEMORY"), CacheMode::Memory);
        assert_eq!(CacheMode::from("both"), CacheMode::Both);
        assert_eq!(CacheMode::from(" wsdl_cache_disk "), CacheMode::Disk);
        assert_eq!(CacheMode::from("WSDL_CACHE_SOMETIMES"), CacheMode::None);
        assert_eq!(CacheMode::default().token(), "WSDL_CACHE_NONE");
    }
}
