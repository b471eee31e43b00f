//! Error-code to message decoding

use std::collections::HashMap;

/// Turns a raw device error code into a human-readable message
pub trait ErrorDecoder {
    fn decode(&self, code: u8) -> String;
}

/// Decoder backed by a lookup table, usually loaded from configuration.
/// Codes missing from the table render as their hex value.
#[derive(Debug, Clone, Default)]
pub struct TableErrorDecoder {
    table: HashMap<u8, String>,
}

impl TableErrorDecoder {
    pub fn new(table: HashMap<u8, String>) -> Self {
        Self { table }
    }

    pub fn with_message(mut self, code: u8, message: impl Into<String>) -> Self {
        self.table.insert(code, message.into());
        self
    }
}

impl ErrorDecoder for TableErrorDecoder {
    fn decode(&self, code: u8) -> String {
        match self.table.get(&code) {
            Some(message) => message.clone(),
            None => format!("unknown error 0x{:02x}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        let decoder = TableErrorDecoder::default().with_message(0x0b, "anchor not found");
        assert_eq!(decoder.decode(0x0b), "anchor not found");
        assert_eq!(decoder.decode(0x3f), "unknown error 0x3f");
    }
}
