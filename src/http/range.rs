//! HTTP Range request parsing module
//!
//! Single `bytes=` ranges only (RFC 7233). Multi-range requests and other
//! units are answered with the full body.

/// Inclusive byte range resolved against a known body length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn content_length(self) -> usize {
        self.end - self.start + 1
    }
}

/// What to do with a request's Range header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable Range header, send everything
    Full,
    /// Send this slice with 206
    Partial(ByteRange),
    /// Answer 416
    Unsatisfiable,
}

/// Resolve a Range header against a body of `len` bytes
///
/// Supported forms are `bytes=start-end`, `bytes=start-` and `bytes=-suffix`.
pub fn resolve_range(range_header: Option<&str>, len: usize) -> RangeOutcome {
    let Some(spec) = range_header
        .map(str::trim)
        .and_then(|h| h.strip_prefix("bytes="))
    else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let Ok(suffix) = last.parse::<usize>() else {
            return RangeOutcome::Full;
        };
        if suffix == 0 || len == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        return RangeOutcome::Partial(ByteRange {
            start: len.saturating_sub(suffix),
            end: len - 1,
        });
    }

    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= len {
        return RangeOutcome::Unsatisfiable;
    }
    let end = if last.is_empty() {
        len - 1
    } else {
        match last.parse::<usize>() {
            Ok(e) if e < start => return RangeOutcome::Unsatisfiable,
            Ok(e) => e.min(len - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };
    RangeOutcome::Partial(ByteRange { start, end })
}
