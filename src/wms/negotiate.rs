//! Request-time format negotiation.

use tracing::debug;

use crate::format::{PNG_MIME, TIFF_MIME};

use super::context::RequestContext;

/// Rewrite a `GetMap` request for `image/tiff` into one for `image/png`.
///
/// Returns `true` and marks the context's pending conversion when the
/// request matched; otherwise the context is left untouched. `SERVICE`,
/// `REQUEST` and `FORMAT` are compared case-insensitively, and absent values
/// simply fail to match.
pub fn negotiate_format(ctx: &mut RequestContext) -> bool {
    let matches = ctx.param("SERVICE").eq_ignore_ascii_case("WMS")
        && ctx.param("REQUEST").eq_ignore_ascii_case("GETMAP")
        && ctx.param("FORMAT").eq_ignore_ascii_case(TIFF_MIME);

    if !matches {
        return false;
    }

    ctx.params.set("FORMAT", PNG_MIME);
    ctx.pending.mark();
    debug!(
        bbox = ctx.param("BBOX"),
        "GetMap for {} rewritten to {}", TIFF_MIME, PNG_MIME
    );
    true
}
