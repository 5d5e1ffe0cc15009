use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Invalid size")]
    InvalidSize,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Invalid hex")]
    InvalidHex,
    #[error("Invalid string")]
    InvalidString,
    #[error("sequence of {actual} elements exceeds maximum of {max}")]
    ExceedsMaxSequenceSize { max: usize, actual: usize },
    #[error("byte string of {actual} bytes exceeds maximum of {max}")]
    ExceedsMaxBytesSize { max: usize, actual: usize },
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

// Cursor over a borrowed byte slice
// Every read is bounds-checked and fails with InvalidSize on truncated input
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, total: 0 }
    }

    // How many bytes are left to read
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    // How many bytes have been consumed so far
    pub fn total_read(&self) -> usize {
        self.total
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if n > self.bytes.len() {
            return Err(ReaderError::InvalidSize);
        }
        let (taken, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        self.total += n;
        Ok(taken)
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let bytes = self.take(2)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u16::from_be_bytes(array))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes = self.take(4)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u32::from_be_bytes(array))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let bytes = self.take(8)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u64::from_be_bytes(array))
    }

    pub fn read_u128(&mut self) -> Result<u128, ReaderError> {
        let bytes = self.take(16)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u128::from_be_bytes(array))
    }

    pub fn read_bytes<T: From<Vec<u8>>>(&mut self, n: usize) -> Result<T, ReaderError> {
        let bytes = self.take(n)?;
        Ok(T::from(bytes.to_vec()))
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        self.take(n)
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        let bytes = self.take(32)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidSize)
    }

    pub fn read_bytes_64(&mut self) -> Result<[u8; 64], ReaderError> {
        let bytes = self.take(64)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidSize)
    }

    pub fn read_string_with_size(&mut self, n: usize) -> Result<String, ReaderError> {
        let bytes = self.take(n)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReaderError::InvalidString)
    }

    // u16 length prefix followed by UTF-8 bytes
    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let len = self.read_u16()? as usize;
        self.read_string_with_size(len)
    }
}
