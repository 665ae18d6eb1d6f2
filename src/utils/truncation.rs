/// Byte cap applied to every stored response sample.
pub const MAX_SAMPLE_BYTES: usize = 2_048;
const MAX_ERROR_LENGTH: usize = 2_000;

/// Cut `text` to at most `max_bytes` bytes without splitting a UTF-8 sequence.
pub fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn truncate_sample(body: &str) -> String {
    truncate_bytes(body, MAX_SAMPLE_BYTES).to_string()
}

pub fn truncate_error(error: &str) -> String {
    if error.len() <= MAX_ERROR_LENGTH {
        error.to_string()
    } else {
        format!("{}...", truncate_bytes(error, MAX_ERROR_LENGTH))
    }
}
