#![allow(dead_code)]

/// Little-endian byte writer for synthetic archives.
#[derive(Default)]
pub struct ArchiveBuilder {
    pub bytes: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i16(mut self, value: i16) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u16s(mut self, values: &[u16]) -> Self {
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn raw(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn zeros(mut self, count: usize) -> Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    pub fn pad_to(mut self, position: usize) -> Self {
        assert!(self.bytes.len() <= position, "already past {:#x}", position);
        self.bytes.resize(position, 0);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// 32-byte 4bpp tile whose pixel at (x, y) has the nibble `f(x, y)`.
pub fn tile_4bpp(f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    for y in 0..8 {
        for x in (0..8).step_by(2) {
            out.push((f(x, y) & 0x0F) | ((f(x + 1, y) & 0x0F) << 4));
        }
    }
    out
}

/// 64-byte 8bpp tile filled with one index.
pub fn tile_8bpp_solid(index: u8) -> Vec<u8> {
    vec![index; 64]
}

/// RGB555 palette block where colour `i` is `f(i)`.
pub fn palette_block(f: impl Fn(usize) -> u16) -> Vec<u8> {
    (0..256).flat_map(|i| f(i).to_le_bytes()).collect()
}
