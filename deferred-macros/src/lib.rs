//! Entry-point macros for `deferred`.
//!
//! - `#[deferred::main]` turns `async fn main` into a synchronous `main`
//!   that drives the body on a freshly built scheduler.
//! - `#[deferred::test]` does the same for `#[test]` functions.
//!
//! Inside the body, `Scheduler::current()` returns the scheduler the
//! attribute built, sized by `worker_threads = N` when given.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let worker_threads = match utils::parse_worker_threads(&attr.to_string()) {
        Ok(n) => n,
        Err(msg) => return utils::compile_error(&msg),
    };

    let mut builder = String::from("::deferred::Scheduler::builder()");

    if let Some(n) = worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    builder.push_str(".build()");

    wrap_body(item, &builder, "main")
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let worker_threads = match utils::parse_worker_threads(&attr.to_string()) {
        Ok(n) => n,
        Err(msg) => return utils::compile_error(&msg),
    };

    let builder = format!(
        "::deferred::Scheduler::builder().worker_threads({}).build()",
        worker_threads.unwrap_or(2)
    );

    let wrapped = wrap_body(item, &builder, "test");

    let test_attr: TokenStream = "#[::core::prelude::v1::test]".parse().unwrap();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(wrapped);

    result.into_iter().collect()
}

/// Removes `async` from the signature and replaces the body with a
/// `block_on` call on the scheduler built by `builder`.
fn wrap_body(item: TokenStream, builder: &str, what: &str) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return utils::compile_error(&format!("#[deferred::{what}] requires an `async fn`"));
    };

    tokens.remove(async_pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return utils::compile_error(&format!("#[deferred::{what}] expects a function body"));
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_block = format!(
        "{{
            let __deferred_scheduler = {builder};
            __deferred_scheduler
                .block_on(async move {{ {block} }})
                .unwrap_or_else(|error| ::core::panic!(\"{what} task failed: {{}}\", error))
        }}"
    );

    match new_block.parse::<TokenStream>() {
        Ok(stream) => {
            tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));
            tokens.into_iter().collect()
        }
        Err(err) => utils::compile_error(&format!("#[deferred::{what}] expansion error: {err}")),
    }
}
