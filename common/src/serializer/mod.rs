mod defaults;
mod reader;
mod writer;

pub use reader::{Reader, ReaderError};
pub use writer::Writer;

// Binary wire convention for every value crossing the contract boundary.
// All integers are big-endian, options carry a presence byte, sequences a
// length prefix. Decoding must never substitute a default for bad input.
pub trait Serializer {
    fn write(&self, writer: &mut Writer);

    fn read(reader: &mut Reader) -> Result<Self, ReaderError>
    where
        Self: Sized;

    fn size(&self) -> usize;

    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.size());
        let mut writer = Writer::new(&mut buffer);
        self.write(&mut writer);
        buffer
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // Reject trailing bytes: a valid encoding is consumed exactly
    fn from_bytes(bytes: &[u8]) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let mut reader = Reader::new(bytes);
        let value = Self::read(&mut reader)?;
        if reader.size() != 0 {
            return Err(ReaderError::InvalidSize);
        }
        Ok(value)
    }

    fn from_hex(hex: &str) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let bytes = hex::decode(hex).map_err(|_| ReaderError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }
}
