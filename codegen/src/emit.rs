use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::{collections::HashSet, path::PathBuf};
use tracing::debug;

use super::{
    codegen::Codegen,
    config::Config,
    error::Error,
    model::{Class, Model},
    validator,
};

const HEADER: &str = "// Generated by wsdlgen. Do not edit.\n\n";
const DEFAULT_FILE: &str = "generated";

/// A generated source file, with a path relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

fn render(tokens: TokenStream, identifier: &str) -> Result<String, Error> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|source| Error::SyntaxError {
        identifier: identifier.to_owned(),
        source,
    })?;

    Ok(format!("{}{}", HEADER, prettyplease::unparse(&file)))
}

/// Lays the model out as files.
///
/// With `one_file` everything goes to `<namespace>.rs`, or `generated.rs` without a
/// namespace. Otherwise every class gets its own module next to a `mod.rs`
/// re-exporting them, inside a `<namespace>` directory when there is one.
pub fn emit(model: &Model, config: &Config) -> Result<Vec<OutputFile>, Error> {
    let namespace = config
        .namespace
        .as_deref()
        .map(validator::validate_attribute);
    let classes: Vec<&Class> = model.classes.iter().chain(&model.service).collect();

    if config.one_file {
        let name = namespace.as_deref().unwrap_or(DEFAULT_FILE);

        return Ok(vec![OutputFile {
            path: PathBuf::from(format!("{}.rs", name)),
            contents: render(model.codegen(), name)?,
        }]);
    }

    let directory = namespace.map(PathBuf::from).unwrap_or_default();
    let mut modules: Vec<String> = Vec::new();
    let mut files = Vec::new();

    for class in classes {
        let module = validator::validate_unique(
            &validator::validate_attribute(&class.identifier),
            |candidate| candidate != "mod" && !modules.iter().any(|module| module == candidate),
        );

        let tokens = class.codegen();
        let contents = render(
            quote! {
                #[allow(unused_imports)]
                use super::*;

                #tokens
            },
            &class.identifier,
        )?;

        debug!("{} in module {}", class.identifier, module);
        files.push(OutputFile {
            path: directory.join(format!("{}.rs", module)),
            contents,
        });
        modules.push(module);
    }

    let idents: Vec<_> = modules.iter().map(|module| format_ident!("{}", module)).collect();
    files.push(OutputFile {
        path: directory.join("mod.rs"),
        contents: render(
            quote! {
                #(
                    mod #idents;
                    pub use #idents::*;
                )*
            },
            "mod",
        )?,
    });

    Ok(files)
}

/// Paths of `files` that are new, keeping the first file for any repeated path.
pub fn pending<'a>(files: &'a [OutputFile], exists: impl Fn(&PathBuf) -> bool) -> Vec<&'a OutputFile> {
    let mut seen = HashSet::new();

    files
        .iter()
        .filter(|file| seen.insert(&file.path) && !exists(&file.path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassKind, Primitive, TypeRef};
    use pretty_assertions::assert_eq;

    fn model() -> Model {
        let alias = |identifier: &str| {
            Class::new(
                identifier,
                identifier,
                ClassKind::Alias(TypeRef::Primitive(Primitive::String)),
            )
        };

        Model {
            classes: vec![alias("Code"), alias("Mod"), alias("CODE")],
            service: None,
        }
    }

    fn paths(files: &[OutputFile]) -> Vec<String> {
        files
            .iter()
            .map(|file| file.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn one_module_per_class() {
        let files = emit(&model(), &Config::default()).unwrap();

        assert_eq!(paths(&files), ["code.rs", "mod_.rs", "code1.rs", "mod.rs"]);
        assert!(files[0].contents.starts_with(HEADER));
        assert!(files[0].contents.contains("pub type Code = String;"));
        assert!(files[3].contents.contains("mod mod_;"));
        assert!(files[3].contents.contains("pub use mod_::*;"));
    }

    #[test]
    fn namespaces_name_the_directory_or_file() {
        let config = Config {
            namespace: Some("Weather".into()),
            ..Config::default()
        };
        assert_eq!(
            paths(&emit(&model(), &config).unwrap())[3],
            "weather/mod.rs"
        );

        let config = Config {
            one_file: true,
            ..config
        };
        let files = emit(&model(), &config).unwrap();
        assert_eq!(paths(&files), ["weather.rs"]);
        assert!(files[0].contents.contains("pub type CODE = String;"));
    }

    #[test]
    fn existing_files_are_not_pending() {
        let files = emit(&model(), &Config::default()).unwrap();

        let pending = pending(&files, |path| path == &PathBuf::from("mod.rs"));
        assert_eq!(pending.len(), 3);
        assert!(pending.iter().all(|file| file.path != PathBuf::from("mod.rs")));
    }
}
