#![no_main]
use dsvcodec::dsv::{self, CodecConfig, Row, RowEncoder, StandardStrategy, escape_field, unescape_field};
use libfuzzer_sys::fuzz_target;

const DELIMITERS: [&str; 4] = [",", "\t", ";", "|"];

fuzz_target!(|data: &[u8]| {
    let Some((&flags, body)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(body) else {
        return;
    };

    let config = CodecConfig::builder()
        .delimiter(DELIMITERS[(flags & 0x03) as usize])
        .line_separator(if flags & 0x04 != 0 { "\r\n" } else { "\n" })
        .always_quote(flags & 0x08 != 0)
        .build()
        .unwrap();

    // Every string survives a single-field round trip.
    let escaped = escape_field(&config, Some(text));
    assert_eq!(unescape_field(&escaped), text);

    // Split the input into rows of fields on control bytes, then encode and
    // decode them. Rows made of one empty field read back as empty rows.
    let rows: Vec<Row> = text
        .split('\u{1}')
        .map(|r| r.split('\u{2}').map(str::to_string).collect::<Row>())
        .map(|r| if r.len() == 1 && r[0].is_empty() { Vec::new() } else { r })
        .collect();
    let strategy = StandardStrategy::new(config);
    let encoder = RowEncoder::new(&strategy);
    let mut encoded = String::new();
    for row in &rows {
        encoder.encode_row(row, &mut encoded);
    }
    let decoded = dsv::decode_str(&encoded, &strategy).unwrap();
    assert_eq!(decoded, rows);
});
