use proc_macro2::{Ident, Literal as Lit, TokenStream};
use quote::{format_ident, quote};
use std::collections::HashSet;

use super::model::{
    Class, ClassKind, Constant, ConstantValue, Datatype, Field, Literal, Method, MethodBody,
    Model, Primitive, TypeRef, Visibility,
};

pub trait Codegen {
    fn codegen(&self) -> TokenStream;
}

fn ident(name: &str) -> Ident {
    format_ident!("{}", name)
}

fn docs(text: Option<&str>) -> TokenStream {
    let lines = text
        .into_iter()
        .flat_map(str::lines)
        .map(|line| format!(" {}", line.trim()));

    quote! { #(#[doc = #lines])* }
}

fn integer(value: i64) -> TokenStream {
    let digits = Lit::u64_unsuffixed(value.unsigned_abs());

    if value < 0 {
        quote! { -#digits }
    } else {
        quote! { #digits }
    }
}

impl Codegen for Primitive {
    fn codegen(&self) -> TokenStream {
        match self {
            Self::String | Self::DateTime | Self::Any => quote! { String },
            Self::Boolean => quote! { bool },
            Self::Byte => quote! { i8 },
            Self::Short => quote! { i16 },
            Self::Int => quote! { i32 },
            Self::Long | Self::Integer => quote! { i64 },
            Self::UnsignedByte => quote! { u8 },
            Self::UnsignedShort => quote! { u16 },
            Self::UnsignedInt => quote! { u32 },
            Self::UnsignedLong => quote! { u64 },
            Self::Float => quote! { f32 },
            Self::Double | Self::Decimal => quote! { f64 },
            Self::Binary => quote! { Vec<u8> },
        }
    }
}

impl Codegen for TypeRef {
    fn codegen(&self) -> TokenStream {
        match self {
            Self::Primitive(primitive) => primitive.codegen(),
            Self::Class(identifier) => {
                let identifier = ident(identifier);
                quote! { #identifier }
            }
            Self::Array(item) => {
                let item = item.codegen();
                quote! { Vec<#item> }
            }
            Self::Optional(inner) => {
                let inner = inner.codegen();
                quote! { Option<#inner> }
            }
            Self::Tuple(parts) => {
                let parts = parts.iter().map(Codegen::codegen);
                quote! { (#(#parts),*) }
            }
        }
    }
}

/// Type of a member of `owner`, boxing the classes that lead back to it.
fn member_type(ty: &TypeRef, owner: &Class) -> TokenStream {
    match ty {
        TypeRef::Class(identifier)
            if identifier == &owner.identifier || owner.cyclic.contains(identifier) =>
        {
            let identifier = ident(identifier);
            quote! { Box<#identifier> }
        }
        TypeRef::Optional(inner) => {
            let inner = member_type(inner, owner);
            quote! { Option<#inner> }
        }
        other => other.codegen(),
    }
}

fn visibility(visibility: Visibility) -> TokenStream {
    match visibility {
        Visibility::Public => quote! { pub },
        Visibility::Private => quote! {},
    }
}

fn constant(constant: &Constant, vis: &TokenStream) -> TokenStream {
    let name = ident(&constant.name);

    match &constant.value {
        ConstantValue::Literal(Literal::Text(text)) => {
            quote! { #vis const #name: &'static str = #text; }
        }
        ConstantValue::Literal(Literal::Integer(value)) => {
            let value = integer(*value);
            quote! { #vis const #name: i64 = #value; }
        }
        ConstantValue::Literal(Literal::Null) => quote! {},
        ConstantValue::List(items) => {
            quote! { #vis const #name: &'static [&'static str] = &[#(#items),*]; }
        }
        ConstantValue::Alias(target) => {
            let target = ident(target);
            quote! { #vis const #name: Self = Self::#target; }
        }
    }
}

impl Codegen for Class {
    fn codegen(&self) -> TokenStream {
        match &self.kind {
            ClassKind::Struct => codegen_struct(self),
            ClassKind::Enum(datatype) => codegen_enum(self, datatype),
            ClassKind::Alias(target) => {
                let name = ident(&self.identifier);
                let docs = docs(self.docs.as_deref());
                let target = target.codegen();

                quote! {
                    #docs
                    pub type #name = #target;
                }
            }
            ClassKind::Service => codegen_service(self),
        }
    }
}

fn codegen_field(field: &Field, owner: &Class) -> TokenStream {
    let vis = visibility(field.visibility);
    let name = ident(&field.name);
    let ty = member_type(&field.ty, owner);
    let docs = docs(field.docs.as_deref());

    quote! {
        #docs
        #vis #name: #ty,
    }
}

fn codegen_struct(class: &Class) -> TokenStream {
    let name = ident(&class.identifier);

    let mut text = class.docs.clone().unwrap_or_default();
    if class.is_abstract {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str("Abstract, only used as the base of other types.");
    }
    let docs = docs(Some(&text).filter(|text| !text.is_empty()).map(String::as_str));

    let base = class.extends.as_ref().map(|base| {
        let base = member_type(base, class);
        quote! { pub base: #base, }
    });
    let fields = class
        .fields()
        .map(|field| codegen_field(field, class));

    let vis = quote! { pub };
    let constants = class.constants().map(|item| constant(item, &vis));
    let methods = class
        .methods()
        .map(|method| codegen_struct_method(class, method));
    let display = codegen_display(class);

    quote! {
        #docs
        #[derive(Debug, Clone, PartialEq)]
        pub struct #name {
            #base
            #(#fields)*
        }

        impl #name {
            #(#constants)*
            #(#methods)*
        }

        #display
    }
}

fn codegen_struct_method(class: &Class, method: &Method) -> TokenStream {
    let vis = visibility(method.visibility);
    let name = ident(&method.name);
    let docs = docs(method.docs.as_deref());

    match &method.body {
        MethodBody::Construct => {
            let params: HashSet<&str> = method.params.iter().map(|param| param.name.as_str()).collect();

            let arguments = method.params.iter().map(|param| {
                let name = ident(&param.name);
                let ty = match class.field(&param.name) {
                    Some(field) => member_type(&field.ty, class),
                    None => member_type(&param.ty, class),
                };
                quote! { #name: #ty }
            });

            let base = class.extends.as_ref().map(|_| quote! { base, });
            let initializers = class.fields().map(|field| {
                let name = ident(&field.name);

                if params.contains(field.name.as_str()) {
                    quote! { #name, }
                } else {
                    match field.ty {
                        TypeRef::Optional(_) => quote! { #name: None, },
                        TypeRef::Array(_) => quote! { #name: Vec::new(), },
                        _ => quote! { #name: Default::default(), },
                    }
                }
            });

            quote! {
                #docs
                #vis fn #name(#(#arguments),*) -> Self {
                    Self {
                        #base
                        #(#initializers)*
                    }
                }
            }
        }

        MethodBody::Get { field } => {
            let field_ident = ident(field);
            let ty = member_type(
                method.returns.as_ref().unwrap_or(&TypeRef::Primitive(Primitive::Any)),
                class,
            );

            quote! {
                #docs
                #vis fn #name(&self) -> &#ty {
                    &self.#field_ident
                }
            }
        }

        MethodBody::ToString { .. } | MethodBody::Operation { .. } => quote! {},
    }
}

fn codegen_display(class: &Class) -> Option<TokenStream> {
    let name = ident(&class.identifier);

    class.methods().find_map(|method| match &method.body {
        MethodBody::ToString { field } => {
            let value = match class.kind {
                ClassKind::Enum(_) => quote! { self.value() },
                _ => {
                    let field = ident(field);
                    quote! { self.#field }
                }
            };

            Some(quote! {
                impl std::fmt::Display for #name {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{}", #value)
                    }
                }
            })
        }
        _ => None,
    })
}

fn codegen_enum(class: &Class, datatype: &Datatype) -> TokenStream {
    let name = ident(&class.identifier);
    let docs = docs(class.docs.as_deref());

    let default = class.constants().find_map(|constant| match &constant.value {
        ConstantValue::Alias(target) => Some(target.as_str()),
        _ => None,
    });

    let entries: Vec<(Ident, &Literal)> = class
        .constants()
        .filter_map(|constant| match &constant.value {
            ConstantValue::Literal(value) => Some((ident(&constant.name), value)),
            _ => None,
        })
        .collect();

    let variants = entries.iter().map(|(variant, _)| {
        if default == Some(variant.to_string().as_str()) {
            quote! { #[default] #variant }
        } else {
            quote! { #variant }
        }
    });

    let (value_ty, values): (TokenStream, Vec<TokenStream>) = match datatype {
        Datatype::Integer => (
            quote! { i64 },
            entries
                .iter()
                .map(|(_, value)| match value {
                    Literal::Integer(value) => integer(*value),
                    other => {
                        let text = other.to_string();
                        quote! { #text }
                    }
                })
                .collect(),
        ),
        _ => (
            quote! { &'static str },
            entries
                .iter()
                .map(|(_, value)| {
                    let text = value.to_string();
                    quote! { #text }
                })
                .collect(),
        ),
    };

    let idents: Vec<&Ident> = entries.iter().map(|(variant, _)| variant).collect();

    let value_fn = class.methods().find_map(|method| match &method.body {
        MethodBody::Get { .. } => {
            let method = ident(&method.name);
            Some(quote! {
                pub fn #method(&self) -> #value_ty {
                    match self {
                        #(Self::#idents => #values,)*
                    }
                }
            })
        }
        _ => None,
    });

    let display = codegen_display(class);

    quote! {
        #docs
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum #name {
            #(#variants),*
        }

        impl #name {
            pub const VALUES: &'static [Self] = &[#(Self::#idents),*];

            #value_fn
        }

        #display
    }
}

fn codegen_service(class: &Class) -> TokenStream {
    let name = ident(&class.identifier);
    let service_docs = docs(class.docs.as_deref());

    let vis = quote! {};
    let constants = class.constants().map(|item| constant(item, &vis));

    let methods = class.methods().filter_map(|method| match &method.body {
        MethodBody::Operation { name: operation } => {
            let name = ident(&method.name);

            let mut text = method.docs.clone().unwrap_or_default();
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&format!("Calls the `{}` operation.", operation));
            let docs = docs(Some(&text));

            let params = method.params.iter().map(|param| {
                let name = ident(&param.name);
                let ty = param.ty.codegen();
                quote! { #name: #ty }
            });

            let returns = method.returns.as_ref().map(|ty| {
                let ty = ty.codegen();
                quote! { -> #ty }
            });

            Some(quote! {
                #docs
                fn #name(&self, #(#params),*) #returns;
            })
        }
        _ => None,
    });

    quote! {
        #service_docs
        pub trait #name {
            #(#constants)*
            #(#methods)*
        }
    }
}

impl Codegen for Model {
    fn codegen(&self) -> TokenStream {
        let classes = self.classes.iter().chain(&self.service).map(Codegen::codegen);
        quote! { #(#classes)* }
    }
}
