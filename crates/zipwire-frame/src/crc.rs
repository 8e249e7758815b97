//! CRC-16/CCITT-FALSE checksum.
//!
//! Polynomial `0x1021`, initial register `0xFFFF`, MSB-first, no reflection
//! and no final XOR. The check value for `b"123456789"` is `0x29B1`.

/// Generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Initial register value.
pub const INITIAL: u16 = 0xFFFF;

/// Lookup table indexed by `(register >> 8) ^ byte`, built at compile time.
pub const CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Table-driven checksum over `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}

/// Bit-at-a-time checksum over `data`.
///
/// Produces the same value as [`crc16`]; kept as the reference
/// implementation the table is checked against.
pub fn crc16_bitwise(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Incremental checksum state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    register: u16,
}

impl Crc16 {
    /// Start a new checksum.
    pub const fn new() -> Self {
        Self { register: INITIAL }
    }

    /// Fold one byte into the register.
    pub fn update_byte(&mut self, byte: u8) {
        let index = ((self.register >> 8) as u8 ^ byte) as usize;
        self.register = (self.register << 8) ^ CRC16_TABLE[index];
    }

    /// Fold a span of bytes into the register.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Current checksum value.
    pub fn finish(&self) -> u16 {
        self.register
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
