//! Event derive macro implementation.
//!
//! # Overview
//!
//! `#[derive(BotEvent)]` generates:
//!
//! 1. `impl Event`, including `ancestor` and `lineage` for the parent chain
//! 2. `impl Deref[Mut]` to the parent, for child events
//!
//! # Root events: `#[root_event(...)]`
//!
//! The top-level event of a platform. It has no parent.
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `platform` | `"onebot"` | **Yes** | Platform name; also used as event name |
//! | `type` | `"meta"` | No | `EventType` variant (default `Other`) |
//!
//! # Child events: `#[event(...)]`
//!
//! The parent is the field marked `#[event(parent)]`.
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `name` | `"message.private"` | No | Event name suffix (prefixed with `{platform}.`) |
//! | `type` | `"message"` | No | `EventType` variant (default: inherited from parent) |
//!
//! # Field-level attributes `#[event(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `parent` | Marks the parent field (child events only) |
//! | `meta` | The `EventMeta` field (root events only, required) |
//! | `self_id` | Field holding the receiving bot's id; anything `ToString` |
//! | `raw_json` | Field of type `Option<String>` or `Option<Arc<str>>` |
//! | `message` | Field implementing `Messageable` |

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

enum EventKind {
    /// `#[root_event(platform = "…", type = "…")]`
    Root {
        platform: String,
        event_type: Option<String>,
    },
    /// `#[event(name = "…", type = "…")]`
    Child {
        name: Option<String>,
        event_type: Option<String>,
    },
}

#[derive(Default)]
struct FieldAttrs {
    is_parent: bool,
    is_meta: bool,
    is_self_id: bool,
    is_raw_json: bool,
    is_message: bool,
}

/// Fields picked out by their markers.
#[derive(Default)]
struct MarkedFields {
    parent: Option<(Ident, Type)>,
    meta: Option<Ident>,
    self_id: Option<Ident>,
    raw_json: Option<Ident>,
    message: Option<Ident>,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_bot_event(input: &DeriveInput) -> syn::Result<TokenStream> {
    let kind = parse_struct_attrs(&input.attrs, input.ident.span())?;
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "BotEvent cannot be derived for generic types",
        ));
    }

    match &input.data {
        Data::Struct(data) => {
            let marked = scan_fields(&data.fields)?;
            generate_struct_impl(name, &kind, marked)
        }
        Data::Enum(_) => Err(syn::Error::new(
            input.span(),
            "BotEvent does not support enums. Use structs with a parent field instead.",
        )),
        Data::Union(_) => Err(syn::Error::new(
            input.span(),
            "BotEvent cannot be derived for unions",
        )),
    }
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_struct_attrs(attrs: &[Attribute], span: Span) -> syn::Result<EventKind> {
    for attr in attrs {
        if attr.path().is_ident("root_event") {
            let mut platform: Option<String> = None;
            let mut event_type: Option<String> = None;

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("platform") {
                    platform = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("type") {
                    event_type = Some(meta.value()?.parse::<LitStr>()?.value());
                } else {
                    return Err(meta.error("unknown #[root_event] key"));
                }
                Ok(())
            })?;

            let platform = platform.ok_or_else(|| {
                syn::Error::new(span, "#[root_event] requires `platform = \"…\"`")
            })?;

            return Ok(EventKind::Root {
                platform,
                event_type,
            });
        }
    }

    for attr in attrs {
        if attr.path().is_ident("event") {
            let mut name: Option<String> = None;
            let mut event_type: Option<String> = None;

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("type") {
                    event_type = Some(meta.value()?.parse::<LitStr>()?.value());
                } else {
                    return Err(meta.error("unknown #[event] key"));
                }
                Ok(())
            })?;

            return Ok(EventKind::Child { name, event_type });
        }
    }

    Err(syn::Error::new(
        span,
        "BotEvent requires either #[root_event(...)] or #[event(...)] attribute",
    ))
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                result.is_parent = true;
            } else if meta.path.is_ident("meta") {
                result.is_meta = true;
            } else if meta.path.is_ident("self_id") {
                result.is_self_id = true;
            } else if meta.path.is_ident("raw_json") {
                result.is_raw_json = true;
            } else if meta.path.is_ident("message") {
                result.is_message = true;
            } else {
                return Err(meta.error("unknown #[event] field marker"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn scan_fields(fields: &Fields) -> syn::Result<MarkedFields> {
    let mut marked = MarkedFields::default();

    let Fields::Named(named) = fields else {
        return Err(syn::Error::new(
            fields.span(),
            "BotEvent requires a struct with named fields",
        ));
    };

    for f in &named.named {
        let fa = parse_field_attrs(&f.attrs)?;
        let Some(ident) = f.ident.clone() else {
            continue;
        };
        let slots = [
            (fa.is_parent, "parent"),
            (fa.is_meta, "meta"),
            (fa.is_self_id, "self_id"),
            (fa.is_raw_json, "raw_json"),
            (fa.is_message, "message"),
        ];
        for (set, marker) in slots {
            if !set {
                continue;
            }
            let taken = match marker {
                "parent" => marked.parent.replace((ident.clone(), f.ty.clone())).is_some(),
                "meta" => marked.meta.replace(ident.clone()).is_some(),
                "self_id" => marked.self_id.replace(ident.clone()).is_some(),
                "raw_json" => marked.raw_json.replace(ident.clone()).is_some(),
                _ => marked.message.replace(ident.clone()).is_some(),
            };
            if taken {
                return Err(syn::Error::new(
                    f.span(),
                    format!("only one field may be marked #[event({marker})]"),
                ));
            }
        }
    }

    Ok(marked)
}

fn event_type_variant(t: &str) -> TokenStream {
    match t.to_lowercase().as_str() {
        "message" => quote! { ::sakiko_core::EventType::Message },
        "notice" => quote! { ::sakiko_core::EventType::Notice },
        "request" => quote! { ::sakiko_core::EventType::Request },
        "meta" | "meta_event" => quote! { ::sakiko_core::EventType::Meta },
        _ => quote! { ::sakiko_core::EventType::Other },
    }
}

// ============================================================================
// Code generation
// ============================================================================

fn generate_struct_impl(
    name: &Ident,
    kind: &EventKind,
    marked: MarkedFields,
) -> syn::Result<TokenStream> {
    match kind {
        EventKind::Root {
            platform,
            event_type,
        } => {
            if marked.parent.is_some() {
                return Err(syn::Error::new(
                    name.span(),
                    "#[root_event] must not have a #[event(parent)] field",
                ));
            }
            let meta = marked.meta.clone().ok_or_else(|| {
                syn::Error::new(
                    name.span(),
                    "#[root_event] requires a field marked with #[event(meta)]",
                )
            })?;
            Ok(generate_root_event(
                name,
                platform,
                event_type.as_deref(),
                &meta,
                &marked,
            ))
        }
        EventKind::Child {
            name: event_name,
            event_type,
        } => {
            if marked.meta.is_some() || marked.self_id.is_some() || marked.raw_json.is_some() {
                return Err(syn::Error::new(
                    name.span(),
                    "meta, self_id and raw_json belong to the root event",
                ));
            }
            let (pf_ident, pf_ty) = marked.parent.clone().ok_or_else(|| {
                syn::Error::new(
                    name.span(),
                    "#[event] requires a field marked with #[event(parent)]",
                )
            })?;
            Ok(generate_child_event(
                name,
                event_name.as_deref(),
                event_type.as_deref(),
                &pf_ident,
                &pf_ty,
                marked.message.as_ref(),
            ))
        }
    }
}

// ============================================================================
// Root event generation
// ============================================================================

fn generate_root_event(
    name: &Ident,
    platform: &str,
    event_type: Option<&str>,
    meta: &Ident,
    marked: &MarkedFields,
) -> TokenStream {
    let platform_lit = LitStr::new(platform, name.span());

    let event_type_impl = match event_type {
        Some(t) => {
            let variant = event_type_variant(t);
            quote! { fn event_type(&self) -> ::sakiko_core::EventType { #variant } }
        }
        None => quote! {},
    };

    let self_id_impl = match &marked.self_id {
        Some(f) => quote! {
            fn self_id(&self) -> Option<String> {
                Some(::std::string::ToString::to_string(&self.#f))
            }
        },
        None => quote! {},
    };

    let raw_json_impl = match &marked.raw_json {
        Some(f) => quote! {
            fn raw_json(&self) -> Option<&str> {
                self.#f.as_deref()
            }
        },
        None => quote! {},
    };

    let message_impl = match &marked.message {
        Some(f) => quote! {
            fn message(&self) -> Option<&dyn ::sakiko_core::Messageable> {
                Some(&self.#f)
            }
        },
        None => quote! {},
    };

    quote! {
        impl ::sakiko_core::Event for #name {
            fn event_name(&self) -> &'static str {
                #platform_lit
            }

            fn platform(&self) -> &'static str {
                #platform_lit
            }

            #event_type_impl

            fn meta(&self) -> &::sakiko_core::EventMeta {
                &self.#meta
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn ancestor(&self, type_id: ::std::any::TypeId) -> Option<&dyn ::std::any::Any> {
                // Root event: only matches self
                (type_id == ::std::any::TypeId::of::<Self>()).then_some(self as &dyn ::std::any::Any)
            }

            fn lineage(&self) -> Vec<::std::any::TypeId> {
                vec![::std::any::TypeId::of::<Self>()]
            }

            #self_id_impl
            #raw_json_impl
            #message_impl
        }
    }
}

// ============================================================================
// Child event generation
// ============================================================================

fn generate_child_event(
    name: &Ident,
    event_name: Option<&str>,
    event_type: Option<&str>,
    parent_field_ident: &Ident,
    parent_ty: &Type,
    message_field: Option<&Ident>,
) -> TokenStream {
    let parent = quote! { <#parent_ty as ::sakiko_core::Event> };

    let event_type_impl = match event_type {
        Some(t) => {
            let variant = event_type_variant(t);
            quote! { fn event_type(&self) -> ::sakiko_core::EventType { #variant } }
        }
        None => quote! {
            fn event_type(&self) -> ::sakiko_core::EventType {
                #parent::event_type(&self.#parent_field_ident)
            }
        },
    };

    // "{platform}.{suffix}" is built once per type and kept for 'static.
    let event_name_impl = match event_name {
        Some(suffix) => {
            let suffix_lit = LitStr::new(suffix, name.span());
            quote! {
                fn event_name(&self) -> &'static str {
                    static FULL_NAME: ::std::sync::OnceLock<String> = ::std::sync::OnceLock::new();
                    FULL_NAME.get_or_init(|| {
                        let platform = #parent::platform(&self.#parent_field_ident);
                        format!("{}.{}", platform, #suffix_lit)
                    })
                }
            }
        }
        None => quote! {
            fn event_name(&self) -> &'static str {
                #parent::event_name(&self.#parent_field_ident)
            }
        },
    };

    let message_impl = match message_field {
        Some(mf) => quote! {
            fn message(&self) -> Option<&dyn ::sakiko_core::Messageable> {
                Some(&self.#mf)
            }
        },
        None => quote! {
            fn message(&self) -> Option<&dyn ::sakiko_core::Messageable> {
                #parent::message(&self.#parent_field_ident)
            }
        },
    };

    let deref_impls = quote! {
        impl ::std::ops::Deref for #name {
            type Target = #parent_ty;
            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.#parent_field_ident
            }
        }

        impl ::std::ops::DerefMut for #name {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.#parent_field_ident
            }
        }
    };

    let event_impl = quote! {
        impl ::sakiko_core::Event for #name {
            #event_name_impl
            #event_type_impl

            fn platform(&self) -> &'static str {
                #parent::platform(&self.#parent_field_ident)
            }

            fn meta(&self) -> &::sakiko_core::EventMeta {
                #parent::meta(&self.#parent_field_ident)
            }

            fn self_id(&self) -> Option<String> {
                #parent::self_id(&self.#parent_field_ident)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn ancestor(&self, type_id: ::std::any::TypeId) -> Option<&dyn ::std::any::Any> {
                if type_id == ::std::any::TypeId::of::<Self>() {
                    return Some(self);
                }
                #parent::ancestor(&self.#parent_field_ident, type_id)
            }

            fn lineage(&self) -> Vec<::std::any::TypeId> {
                let mut lineage = #parent::lineage(&self.#parent_field_ident);
                lineage.insert(0, ::std::any::TypeId::of::<Self>());
                lineage
            }

            fn raw_json(&self) -> Option<&str> {
                #parent::raw_json(&self.#parent_field_ident)
            }

            #message_impl
        }
    };

    quote! {
        #deref_impls
        #event_impl
    }
}
