use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// Which deployment of the ledger a call is bound to
// A descriptor built for one network is never valid on another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Network::Mainnet => "Mainnet",
            Network::Testnet => "Testnet",
            Network::Devnet => "Devnet",
        };
        write!(f, "{}", name)
    }
}

impl Serializer for Network {
    fn write(&self, writer: &mut Writer) {
        let id = match self {
            Network::Mainnet => 0,
            Network::Testnet => 1,
            Network::Devnet => 2,
        };
        writer.write_u8(id);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(match reader.read_u8()? {
            0 => Network::Mainnet,
            1 => Network::Testnet,
            2 => Network::Devnet,
            _ => return Err(ReaderError::InvalidValue),
        })
    }

    fn size(&self) -> usize {
        1
    }
}
