//! Digit-aware ("natural") string ordering, so that `v2` sorts before `v10`.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("static pattern is valid"))
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(&'a str),
    Number(&'a str),
}

/// Split `s` into alternating text and digit-run chunks. The first chunk is
/// always text (possibly empty), mirroring how a split on digit runs works.
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in digit_runs().find_iter(s) {
        out.push(Chunk::Text(&s[last..m.start()]));
        out.push(Chunk::Number(m.as_str()));
        last = m.end();
    }
    out.push(Chunk::Text(&s[last..]));
    out
}

/// Compare two digit runs by numeric value without parsing them, so that
/// arbitrarily long runs cannot overflow.
fn cmp_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ordering of two strings.
///
/// Digit runs compare by value, everything else compares as text. Strings
/// that differ only in leading zeros compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Chunk::Text(l), Chunk::Text(r)) => l.cmp(r),
            (Chunk::Number(l), Chunk::Number(r)) => cmp_numbers(l, r),
            // Chunks alternate from the same starting kind, so kinds line up.
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

/// Stable natural sort by a string key.
pub fn natsort_by_key<T, F>(items: &mut [T], mut key: F)
where
    F: FnMut(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}
