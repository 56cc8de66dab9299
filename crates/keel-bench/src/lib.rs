//! Benchmark inputs for the Keel native-interop workspace.
//!
//! - [`mixed_text`]: deterministic strings mixing ASCII, Latin-1 and CJK
//! - [`stack_config`]: the arena configuration the stack benchmarks use

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use keel_stack::StackConfig;

const ALPHABET: &[&str] = &["a", "Z", "0", " ", "é", "ß", "漢", "字", "\u{1F600}"];

/// `count` strings of `chars` characters each, cycling through a fixed
/// alphabet with a per-string offset.
pub fn mixed_text(count: usize, chars: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            (0..chars)
                .map(|j| ALPHABET[(i * 7 + j * 3) % ALPHABET.len()])
                .collect()
        })
        .collect()
}

/// `count` ASCII-only strings of `chars` characters each.
pub fn ascii_text(count: usize, chars: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            (0..chars)
                .map(|j| char::from(b'a' + ((i + j) % 26) as u8))
                .collect()
        })
        .collect()
}

/// A 1 MiB arena.
pub fn stack_config() -> StackConfig {
    StackConfig::new(1 << 20)
}
