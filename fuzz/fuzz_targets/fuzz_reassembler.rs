//! Fuzz target: `Reassembler::feed`
//!
//! Splits arbitrary input into chunks at 0xFF bytes and feeds them to the
//! streaming reassembler. It must never panic, and any completed message
//! must carry exactly its declared length.
//!
//! cargo fuzz run fuzz_reassembler

#![no_main]

use framelink::link::Reassembler;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reassembler = Reassembler::new();

    for chunk in data.split(|&b| b == 0xFF) {
        if let Ok(Some(message)) = reassembler.feed(chunk) {
            assert_eq!(message.payload.len(), message.declared_len as usize);
        }
    }

    // After a reset the reassembler must accept bytes cleanly again.
    reassembler.reset();
    assert!(!reassembler.is_active());
    let _ = reassembler.feed(data);
});
