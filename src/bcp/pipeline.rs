// src/bcp/pipeline.rs
//
// Re-delimits BCP text into CSV text. Each stage is a whole-string
// substitution and the stages only compose correctly in `STAGES` order:
// backslashes must be doubled before quotes gain their backslash prefix,
// and both escapes must run before the delimiters introduce new quotes.

use std::borrow::Cow;

pub const ESCAPE_CHAR: &str = "\\";
pub const QUOTE: &str = "\"";
pub const FIELD_DELIMITER: &str = "@**@";
pub const RECORD_DELIMITER: &str = "*@@*";

/// A single text transform in the decode pipeline.
pub type Stage = fn(&str) -> String;

/// The decode pipeline, in application order.
pub const STAGES: [(&str, Stage); 5] = [
    ("escape_backslashes", escape_backslashes),
    ("escape_quotes", escape_quotes),
    ("split_fields", split_fields),
    ("split_records", split_records),
    ("wrap_quotes", wrap_quotes),
];

/// Decode raw member bytes as UTF-8, substituting U+FFFD for invalid
/// sequences. The flag reports whether any substitution happened.
pub fn decode_lossy(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    let text = String::from_utf8_lossy(bytes);
    let replaced = matches!(text, Cow::Owned(_));
    (text, replaced)
}

/// `\` → `\\`
pub fn escape_backslashes(text: &str) -> String {
    text.replace(ESCAPE_CHAR, "\\\\")
}

/// `"` → `\"`
pub fn escape_quotes(text: &str) -> String {
    text.replace(QUOTE, "\\\"")
}

/// `@**@` → `","`
pub fn split_fields(text: &str) -> String {
    text.replace(FIELD_DELIMITER, "\",\"")
}

/// `*@@*` → `"` newline `"`
pub fn split_records(text: &str) -> String {
    text.replace(RECORD_DELIMITER, "\"\n\"")
}

/// Surround the whole blob with quotes; the delimiter stages only quote
/// interior boundaries.
pub fn wrap_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    out.push_str(text);
    out.push('"');
    out
}

/// Run every stage over already-decoded text.
pub fn transcode(text: &str) -> String {
    STAGES
        .iter()
        .fold(text.to_owned(), |acc, (_, stage)| stage(&acc))
}
