//! Fuzz target: `split_text` over escaped script text
//!
//! The first byte picks the line payload size; the rest is escaped and
//! split. Chunks must be bounded, rejoin to the input, and never end on
//! an unpaired escape.
//!
//! cargo fuzz run fuzz_split_text

#![no_main]

use framelink::link::{escape_script_string, split_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&size, rest)) = data.split_first() else {
        return;
    };
    let max = 4 + usize::from(size);
    let escaped = escape_script_string(&String::from_utf8_lossy(rest));

    let chunks = split_text(&escaped, max).expect("max >= 4 always splits escaped text");
    assert_eq!(chunks.concat(), escaped);

    for chunk in chunks {
        assert!(chunk.len() <= max);
        let trailing = chunk.bytes().rev().take_while(|&b| b == b'\\').count();
        assert_eq!(trailing % 2, 0, "unpaired escape at chunk end");
    }
});
