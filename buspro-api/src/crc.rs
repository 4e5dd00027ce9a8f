/// CRC-16/XMODEM implementation using polynomial 0x1021, initial value 0
pub struct Crc16 {
    table: [u16; 256],
}

impl Crc16 {
    const POLYNOMIAL: u16 = 0x1021;

    /// Creates a new CRC-16 instance with pre-computed lookup table
    pub fn new() -> Self {
        let mut table = [0u16; 256];

        for (i, slot) in table.iter_mut().enumerate() {
            let mut crc = (i as u16) << 8;
            for _ in 0..8 {
                if crc & 0x8000 != 0 {
                    crc = (crc << 1) ^ Self::POLYNOMIAL;
                } else {
                    crc <<= 1;
                }
            }
            *slot = crc;
        }

        Self { table }
    }

    /// Computes CRC-16 checksum for the given data
    pub fn checksum(&self, data: &[u8]) -> u16 {
        self.update(0, data)
    }

    /// Updates CRC value with additional data (for streaming computation)
    pub fn update(&self, mut crc: u16, data: &[u8]) -> u16 {
        for &byte in data {
            let index = ((crc >> 8) ^ byte as u16) & 0xFF;
            crc = (crc << 8) ^ self.table[index as usize];
        }
        crc
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Global CRC-16 instance with compile-time computed lookup table
static CRC16: Crc16 = {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ Crc16::POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    Crc16 { table }
};

/// Computes CRC-16 checksum using the global instance
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
