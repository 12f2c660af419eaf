//! Closing of partially streamed Markdown.
//!
//! A reply that is still arriving routinely ends inside a code fence, an
//! inline code span, or an emphasis run. Rendering such text verbatim makes
//! the rest of the transcript flicker between styles, so every snapshot is
//! passed through [`repair`] first. Repair only ever appends closers; the
//! streamed text itself is never altered.

use std::ops::Range;

use memchr::{memchr_iter, memmem};

/// Marker shown after the text of a reply that is still streaming.
pub const STREAMING_CURSOR: &str = "\n▍";

const FENCE: &[u8] = b"```";
const FENCE_CLOSER: &str = "\n```";

/// An unclosed construct and the byte offset where it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenConstruct {
    opened_at: usize,
    closer: String,
}

/// Append the closers needed for `text` to render as balanced Markdown.
///
/// Closers are emitted innermost first. The result is a fixed point:
/// `repair(&repair(s)) == repair(s)`.
pub fn repair(text: &str) -> String {
    let bytes = text.as_bytes();
    let fences: Vec<usize> = memmem::find_iter(bytes, FENCE).collect();
    let fence = unclosed_fence(&fences);
    let inline = unclosed_inline_code(bytes);

    // Emphasis opened inside unclosed code is closed separately from the
    // emphasis around it.
    let code_opener = match (&fence, &inline) {
        (Some(open), _) => Some(open.opened_at..open.opened_at + FENCE.len()),
        (None, Some(open)) => Some(open.opened_at..open.opened_at + 1),
        (None, None) => None,
    };
    let emphasis = unclosed_emphasis(bytes, &fences, code_opener);

    let mut open: Vec<OpenConstruct> = fence.into_iter().chain(inline).chain(emphasis).collect();
    if open.is_empty() {
        return text.to_string();
    }

    open.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
    let extra: usize = open.iter().map(|construct| construct.closer.len()).sum();
    let mut repaired = String::with_capacity(text.len() + extra);
    repaired.push_str(text);
    for construct in open {
        repaired.push_str(&construct.closer);
    }
    repaired
}

/// [`repair`], plus the streaming cursor while the reply is in flight.
pub fn repair_for_display(text: &str, streaming: bool) -> String {
    let mut display = repair(text);
    if streaming {
        display.push_str(STREAMING_CURSOR);
    }
    display
}

fn unclosed_fence(fences: &[usize]) -> Option<OpenConstruct> {
    if fences.len() % 2 == 0 {
        return None;
    }
    fences.last().map(|&last| OpenConstruct {
        opened_at: last,
        closer: FENCE_CLOSER.to_string(),
    })
}

fn unclosed_inline_code(bytes: &[u8]) -> Option<OpenConstruct> {
    let mut backticks = memchr_iter(b'`', bytes);
    let position = backticks.next()?;
    if backticks.next().is_some() || position + 1 >= bytes.len() {
        return None;
    }
    Some(OpenConstruct {
        opened_at: position,
        closer: "`".to_string(),
    })
}

/// Marks the bytes inside closed code, where `*` and `_` are literal.
///
/// Fences pair up first. The remaining backticks pair up in order on each
/// side of an unclosed fence; an unpaired backtick masks nothing.
fn closed_code_mask(bytes: &[u8], fences: &[usize]) -> Vec<bool> {
    let mut masked = vec![false; bytes.len()];
    let mut fence_bytes = vec![false; bytes.len()];
    for &start in fences {
        fence_bytes[start..start + FENCE.len()].fill(true);
    }
    for pair in fences.chunks_exact(2) {
        masked[pair[0]..pair[1] + FENCE.len()].fill(true);
    }

    let segments = match fences.len() % 2 {
        1 => {
            let open = fences[fences.len() - 1];
            [0..open, open + FENCE.len()..bytes.len()]
        }
        _ => [0..bytes.len(), bytes.len()..bytes.len()],
    };
    for segment in segments {
        let offset = segment.start;
        let backticks: Vec<usize> = memchr_iter(b'`', &bytes[segment])
            .map(|index| offset + index)
            .filter(|&index| !fence_bytes[index] && !masked[index])
            .collect();
        for pair in backticks.chunks_exact(2) {
            masked[pair[0]..=pair[1]].fill(true);
        }
    }
    masked
}

fn unclosed_emphasis(
    bytes: &[u8],
    fences: &[usize],
    code_opener: Option<Range<usize>>,
) -> Vec<OpenConstruct> {
    // A lone trailing backtick may still become a code span.
    if code_opener.is_none() && memchr_iter(b'`', bytes).count() == 1 {
        return Vec::new();
    }

    let masked = closed_code_mask(bytes, fences);
    let scopes = match code_opener {
        Some(opener) => vec![0..opener.start, opener.end..bytes.len()],
        None => vec![0..bytes.len()],
    };
    scopes
        .into_iter()
        .filter_map(|scope| unclosed_emphasis_in(bytes, &masked, scope))
        .collect()
}

fn unclosed_emphasis_in(
    bytes: &[u8],
    masked: &[bool],
    scope: Range<usize>,
) -> Option<OpenConstruct> {
    let last = scope
        .clone()
        .rev()
        .find(|&index| matches!(bytes[index], b'*' | b'_') && !masked[index])?;
    // Nothing emphasised yet.
    if bytes[last + 1..].iter().all(|&b| matches!(b, b'`' | b' ' | b'\n')) {
        return None;
    }

    let marker = bytes[last];
    let in_run = |index: usize| bytes[index] == marker && !masked[index];
    let run_start = (scope.start..last)
        .rev()
        .find(|&index| !in_run(index))
        .map_or(scope.start, |index| index + 1);
    let run_len = last + 1 - run_start;

    // An even number of runs means this one closes an earlier opener.
    let runs = scope
        .clone()
        .filter(|&index| in_run(index) && (index == scope.start || !in_run(index - 1)))
        .count();
    if runs % 2 == 0 {
        return None;
    }

    let closer = String::from_utf8(vec![marker; run_len.min(3)]).ok()?;
    Some(OpenConstruct {
        opened_at: run_start,
        closer,
    })
}
