use proc_macro::TokenStream;

/// Parses the `worker_threads = N` argument of the entry-point macros.
///
/// Returns `Ok(None)` when the attribute is empty.
pub(crate) fn parse_worker_threads(attr: &str) -> Result<Option<usize>, String> {
    let mut worker_threads = None;

    for part in attr.split(',') {
        let part = part.trim();

        if part.is_empty() {
            continue;
        }

        let Some(value) = part.strip_prefix("worker_threads") else {
            return Err(format!("unknown argument `{part}`"));
        };

        let value = value.trim_start().trim_start_matches('=').trim();

        match value.parse::<usize>() {
            Ok(n) if n > 0 => worker_threads = Some(n),
            _ => return Err(format!("worker_threads must be a positive integer, got `{value}`")),
        }
    }

    Ok(worker_threads)
}

/// Builds a `compile_error!` invocation carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("::core::compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
