#![deny(missing_docs)]

//! Entry-point attribute for the hello Lambda function.
//!
//! An asynchronous `main` annotated with `#[lambda]` must accept an event
//! argument of a type implementing `serde::Deserialize` and a `Context`, and
//! return a `Result<B, E>` where `B` implements `serde::Serialize` and `E`
//! implements `Display`. With `#[lambda(http)]` the event is an HTTP
//! `Request` and `B` implements `IntoResponse` instead.
//!
//! The generated `main` installs the default log subscriber, runs the
//! function in the runtime loop and returns the runtime's error, if any.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote_spanned;
use syn::{spanned::Spanned, AttributeArgs, FnArg, ItemFn, Meta, NestedMeta, PatType};

/// Return true if attribute macro args declares http flavor in the form `#[lambda(http)]`
fn is_http(args: &AttributeArgs) -> bool {
    args.iter().any(|arg| match arg {
        NestedMeta::Meta(Meta::Path(path)) => path.is_ident("http"),
        _ => false,
    })
}

fn typed_arg<'a>(arg: Option<&'a FnArg>, position: &str) -> Result<&'a PatType, String> {
    match arg {
        Some(FnArg::Typed(arg)) => Ok(arg),
        _ => Err(format!("fn main's {} argument must be fully formed", position)),
    }
}

#[proc_macro_attribute]
/// Wrap an async function into the lambda constructs
pub fn lambda(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemFn);
    let args = syn::parse_macro_input!(attr as AttributeArgs);
    let ret = &input.sig.output;
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let asyncness = &input.sig.asyncness;
    let inputs = &input.sig.inputs;

    if name != "main" {
        let tokens = quote_spanned! { name.span() =>
            compile_error!("only the main function can be tagged with #[lambda]");
        };
        return TokenStream::from(tokens);
    }

    if asyncness.is_none() {
        let tokens = quote_spanned! { input.span() =>
          compile_error!("the async keyword is missing from the function declaration");
        };
        return TokenStream::from(tokens);
    }

    if inputs.len() != 2 {
        let tokens = quote_spanned! { inputs.span() =>
            compile_error!("the #[lambda] macro expects two arguments: a triggered event and lambda context");
        };
        return TokenStream::from(tokens);
    }

    let (event, context) = match (
        typed_arg(inputs.first(), "first"),
        typed_arg(inputs.iter().nth(1), "second"),
    ) {
        (Ok(event), Ok(context)) => (event, context),
        (Err(message), _) | (_, Err(message)) => {
            let tokens = quote_spanned! { inputs.span() =>
                compile_error!(#message);
            };
            return TokenStream::from(tokens);
        }
    };
    let event_name = &event.pat;
    let event_type = &event.ty;
    let context_name = &context.pat;
    let context_type = &context.ty;

    let result = if is_http(&args) {
        quote_spanned! { input.span() =>

            #(#attrs)*
            #asyncness fn main() -> ::std::result::Result<(), hello_lambda_http::lambda::Error> {
                async fn actual(#event_name: #event_type, #context_name: #context_type) #ret #body

                hello_lambda_http::lambda::logging::init_default_subscriber();
                let f = hello_lambda_http::handler(actual);
                hello_lambda_http::lambda::run(f).await
            }
        }
    } else {
        quote_spanned! { input.span() =>

            #(#attrs)*
            #asyncness fn main() -> ::std::result::Result<(), hello_lambda_runtime::Error> {
                async fn actual(#event_name: #event_type, #context_name: #context_type) #ret #body

                hello_lambda_runtime::logging::init_default_subscriber();
                let f = hello_lambda_runtime::handler_fn(actual);
                hello_lambda_runtime::run(f).await
            }
        }
    };

    result.into()
}
