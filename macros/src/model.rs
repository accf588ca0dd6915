use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Meta, Token};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Whether `attr` is a list attribute named `name` containing the bare word `word`.
fn has_word(attr: &syn::Attribute, name: &str, words: &[&str]) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	if !list.path.is_ident(name) {
		return false;
	}

	list.tokens.to_token_stream().into_iter().any(|token| {
		matches!(token, TokenTree::Ident(ref ident) if words.iter().any(|word| ident == word))
	})
}

/// Attributes that only make sense on the database row, not on the input structs.
fn is_row_only(attr: &syn::Attribute) -> bool {
	attr.path().is_ident("sqlx") || attr.path().is_ident("model")
}

/// Removes `FromRow` from a `#[derive(..)]` attribute, leaving other attributes untouched.
fn without_from_row(attr: &syn::Attribute) -> Option<syn::Attribute> {
	if !attr.path().is_ident("derive") {
		return Some(attr.clone());
	}

	let Ok(paths) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) else {
		return Some(attr.clone());
	};

	let paths = paths
		.into_iter()
		.filter(|path| path.segments.last().map_or(true, |segment| segment.ident != "FromRow"))
		.collect::<Vec<_>>();

	if paths.is_empty() {
		return None;
	}

	Some(syn::parse_quote!(#[derive(#(#paths),*)]))
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let mut input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	// The row struct keeps everything except the helper attributes of this macro.
	if let syn::Data::Struct(ref mut data) = input.data {
		for field in &mut data.fields {
			field.attrs.retain(|attr| !attr.path().is_ident("model"));
		}
	}

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}Input", ident);
	let update_ident = format_ident!("Update{}Input", ident);

	let attrs = receiver
		.attrs
		.iter()
		.filter(|attr| !is_row_only(attr))
		.filter_map(without_from_row)
		.collect::<Vec<_>>();

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "expected a struct with named fields")
			.into_compile_error()
			.into();
	};

	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			// Skip fields with #[serde(skip_deserializing)] or #[serde(skip)]
			if field
				.attrs
				.iter()
				.any(|attr| has_word(attr, "serde", &["skip_deserializing", "skip"]))
			{
				return None;
			}

			let create_only = field
				.attrs
				.iter()
				.any(|attr| has_word(attr, "model", &["create_only"]));
			let attrs = field
				.attrs
				.iter()
				.filter(|attr| !is_row_only(attr))
				.collect::<Vec<_>>();

			Some((attrs, ident, &field.ty, &field.vis, create_only))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis, _)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields
		.iter()
		.filter(|(.., create_only)| !create_only)
		.map(|(attrs, ident, ty, vis, _)| {
			quote! {
				#(#attrs)*
				#vis #ident: Option<#ty>,
			}
		});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident #generics {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#vis struct #update_ident #generics {
			#(
				#update_fields
			)*
		}
	}
	.into()
}
