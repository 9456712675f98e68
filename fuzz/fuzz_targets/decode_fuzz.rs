#![no_main]
use std::io::Cursor;

use dsvcodec::dsv::{CodecConfig, ReaderSource, RowDecoder, StandardStrategy};
use libfuzzer_sys::fuzz_target;

const DELIMITERS: [&str; 4] = [",", "\t", "##", "<|>"];

fuzz_target!(|data: &[u8]| {
    // First byte picks the delimiter; the rest is the document.
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let delimiter = DELIMITERS[selector as usize % DELIMITERS.len()];
    let config = CodecConfig::builder().delimiter(delimiter).build().unwrap();
    let strategy = StandardStrategy::new(config);

    // Arbitrary bytes: decoding must end in rows or an error, never a panic.
    let source = ReaderSource::with_capacity(7, Cursor::new(body));
    let mut decoder = RowDecoder::new(source, &strategy).unwrap();
    if selector & 0x80 != 0 {
        let _ = decoder.mark(body.len());
    }
    while let Ok(Some(_)) = decoder.next_row() {}
    let _ = decoder.reset();
    while let Ok(Some(_)) = decoder.next_row() {}

    // Valid UTF-8 input must always decode.
    if let Ok(text) = std::str::from_utf8(body) {
        assert!(dsvcodec::dsv::decode_str(text, &strategy).is_ok());
    }
});
