// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Whole-label domain glob matching (spec.md §9 design notes).
//!
//! `*` matches any byte sequence, including the empty one. The matcher is a
//! recursive two-state walk over `(pattern, text)`; it is deliberately not
//! label-aware (it does not special-case `.` the way shell globs special-case
//! `/`) — a pattern like `*.example.com` will also match `a.b.example.com`.
//! Matching is ASCII-case-insensitive; non-ASCII bytes are compared as-is.

pub fn glob_match(pattern: &str, text: &str) -> bool {
    match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => {
            match_bytes(&pattern[1..], text)
                || (!text.is_empty() && match_bytes(pattern, &text[1..]))
        },
        Some(&p) => match text.first() {
            Some(&t) if p.eq_ignore_ascii_case(&t) => match_bytes(&pattern[1..], &text[1..]),
            _ => false,
        },
    }
}
