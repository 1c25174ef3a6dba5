use std::collections::HashSet;
use wsdlgen_wsdl::TypeDescriptor;

use super::{
    assembler::Registry,
    error::Error,
    model::{BuildState, Class, ClassKind, Field, Method, MethodBody, Param, Visibility},
    validator,
};

/// Field holding the parent structure of an extension.
pub const BASE_FIELD: &str = "base";

const RESERVED: &[&str] = &["new"];

/// A complex type with named elements, generated as a struct.
#[derive(Debug, Clone)]
pub struct ComplexType {
    identifier: String,
    descriptor: TypeDescriptor,
    state: BuildState<Class>,
}

impl ComplexType {
    pub fn new(identifier: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            identifier: identifier.into(),
            descriptor,
            state: BuildState::Unbuilt,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn class(&self) -> Option<&Class> {
        self.state.built()
    }

    pub fn into_class(self) -> Option<Class> {
        self.state.into_built()
    }

    /// Builds the struct: one field per element, a constructor taking the elements
    /// that are neither optional nor repeated, and a getter per field.
    pub fn build(&mut self, registry: &Registry) -> Result<&Class, Error> {
        let descriptor = &self.descriptor;

        self.state.build(&self.identifier, || {
            let mut class = Class::new(self.identifier.clone(), descriptor.name(), ClassKind::Struct);
            class.namespace = descriptor.namespace().to_owned();
            class.is_abstract = descriptor.is_abstract();
            class.docs = descriptor.documentation().map(ToOwned::to_owned);
            class.extends = descriptor.base().map(|base| registry.resolve(base));

            let mut taken: HashSet<String> = RESERVED.iter().map(|name| (*name).to_owned()).collect();
            let mut params = Vec::new();

            if let Some(base) = &class.extends {
                taken.insert(BASE_FIELD.to_owned());
                params.push(Param {
                    name: BASE_FIELD.to_owned(),
                    ty: base.clone(),
                    default: None,
                });
            }

            let mut fields = Vec::new();

            for (xml_name, ty) in descriptor.elements() {
                let name = validator::validate_unique(
                    &validator::validate_attribute(xml_name),
                    |candidate| !taken.contains(candidate),
                );
                taken.insert(name.clone());

                let item = registry.resolve(&ty.name);

                let ty = if ty.array {
                    item.array()
                } else if descriptor.is_element_nillable(xml_name)
                    || descriptor.element_min_occurs(xml_name) == Some(0)
                {
                    item.optional()
                } else {
                    params.push(Param {
                        name: name.clone(),
                        ty: item.clone(),
                        default: None,
                    });
                    item
                };

                fields.push(Field {
                    visibility: Visibility::Public,
                    name,
                    xml_name: xml_name.clone(),
                    ty,
                    docs: None,
                });
            }

            class.add_method(Method {
                visibility: Visibility::Public,
                name: "new".to_owned(),
                params,
                returns: None,
                body: MethodBody::Construct,
                docs: None,
            })?;

            for field in fields {
                class.add_method(Method {
                    visibility: Visibility::Public,
                    name: field.name.clone(),
                    params: Vec::new(),
                    returns: Some(field.ty.clone()),
                    body: MethodBody::Get {
                        field: field.name.clone(),
                    },
                    docs: None,
                })?;

                class.add_field(field)?;
            }

            Ok(class)
        })
    }
}
