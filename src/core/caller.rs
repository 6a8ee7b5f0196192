//! Call-site resolution for the caller meta field
//!
//! The entry points of [`Logger`](crate::Logger) are `#[track_caller]`, so the
//! call site is known without walking the stack. Extra skip frames (for
//! wrappers around the logger that are not themselves `#[track_caller]`)
//! are resolved from a captured backtrace.
//!
//! The rendered form of [`Backtrace`] is not a stable format. A trace that
//! does not have the `N: symbol` / `at file:line:col` shape (unsupported
//! platform, stripped symbols, a changed layout) falls back to the
//! `#[track_caller]` site. A readable trace without the requested frame
//! leaves the field out.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::panic::Location;

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: Cow<'static, str>,
    pub line: u32,
}

impl Caller {
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }
}

/// Resolves the caller `skip` frames above `location`.
pub fn resolve(location: &'static Location<'static>, skip: usize) -> Option<Caller> {
    if skip == 0 {
        return Some(Caller::from_location(location));
    }
    let trace = Backtrace::force_capture().to_string();
    resolve_in(location, &trace, skip)
}

fn resolve_in(location: &'static Location<'static>, trace: &str, skip: usize) -> Option<Caller> {
    if !is_readable(trace) {
        return Some(Caller::from_location(location));
    }
    caller_from_backtrace(trace, skip)
}

/// Whether `trace` has numbered frames and at least one parsable location.
fn is_readable(trace: &str) -> bool {
    let mut frames = false;
    let mut locations = false;
    for line in trace.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            locations |= parse_location(location).is_some();
        } else if let Some((index, _)) = line.split_once(": ") {
            frames |= index.parse::<usize>().is_ok();
        }
    }
    frames && locations
}

const INTERNAL_PREFIXES: [&str; 6] = ["std::", "core::", "alloc::", "<std::", "<core::", "<alloc::"];

fn is_internal(symbol: &str) -> bool {
    let crate_prefix = concat!(env!("CARGO_CRATE_NAME"), "::");
    symbol.starts_with(crate_prefix)
        || symbol
            .strip_prefix('<')
            .is_some_and(|s| s.starts_with(crate_prefix))
        || INTERNAL_PREFIXES.iter().any(|p| symbol.starts_with(p))
        || symbol.starts_with("__rust")
        || symbol.starts_with("rust_begin_unwind")
}

/// Picks the `skip`-th frame above the logging call site out of a rendered
/// backtrace. Frame 0 is the first frame after the logging machinery, i.e.
/// the function that finalized the record.
pub(crate) fn caller_from_backtrace(trace: &str, skip: usize) -> Option<Caller> {
    let mut seen_internal = false;
    let mut remaining = skip;
    let mut selected = false;

    for line in trace.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if selected {
                return parse_location(location);
            }
            continue;
        }
        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.parse::<usize>().is_err() {
            continue;
        }
        if selected {
            // selected frame has no location
            return None;
        }
        if is_internal(symbol) {
            seen_internal = true;
            continue;
        }
        if !seen_internal {
            continue;
        }
        if remaining == 0 {
            selected = true;
        } else {
            remaining -= 1;
        }
    }
    None
}

fn parse_location(location: &str) -> Option<Caller> {
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some(Caller {
        file: Cow::Owned(file.to_string()),
        line,
    })
}
