pub mod bins;
pub mod snapshot;
pub mod spades;

/// Parses a single-byte delimiter; accepts `\t` and `tab` for tabs.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "\t" | "tab" => Ok(b'\t'),
        _ if raw.len() == 1 => Ok(raw.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single byte, got '{raw}'")),
    }
}
