use proc_macro::TokenStream;
use quote::quote;
use syn::{Ident, ItemFn, ReturnType, parse_macro_input, parse_quote};

/// Adapt an async server handler to the wire response enum.
///
/// `#[rpc_handler(Variant)]` rewrites the annotated function in place:
/// its original fallible body becomes an inner async block, and the
/// function now returns `ResponseKind`, packing `Ok` replies into
/// `ResponseKind::Variant` and mapping `Err` to a structured
/// `ResponseKind::Error` with `Internal` status. Early `return`s inside
/// the handler keep working; they leave the inner block.
#[proc_macro_attribute]
pub fn rpc_handler(args: TokenStream, input: TokenStream) -> TokenStream {
    let variant = parse_macro_input!(args as Ident);
    let mut handler = parse_macro_input!(input as ItemFn);

    // The declared return type (some `Result<Reply>`) moves onto the
    // inner block; the function itself returns the response enum.
    let fallible_ty = match &handler.sig.output {
        ReturnType::Type(_, ty) => ty.clone(),
        ReturnType::Default => {
            return syn::Error::new_spanned(
                &handler.sig,
                "rpc_handler expects a handler returning a Result reply",
            )
            .to_compile_error()
            .into();
        }
    };
    let body = handler.block.clone();

    let kind = quote! { api_model::protocol::message::response_message::ResponseKind };
    let error_reply = quote! { api_model::protocol::models::error::ErrorReply };

    handler.sig.output = parse_quote! { -> #kind };
    handler.block = Box::new(parse_quote!({
        let outcome: #fallible_ty = async move #body.await;
        match outcome {
            Ok(reply) => #kind::#variant(reply),
            Err(e) => #kind::Error(#error_reply::internal(e.to_string())),
        }
    }));

    TokenStream::from(quote! { #handler })
}
