use serde_json::Error as SerdeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Invalid JSON response")]
    InvalidResponse,
    #[error("Expected json_rpc set to '2.0'")]
    InvalidVersion,
    #[error("Invalid params: {}", _0)]
    InvalidParams(#[from] SerdeError),
    #[error("Server returned error {code}: {message}")]
    Server { code: i16, message: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl RpcError {
    pub fn get_code(&self) -> i16 {
        match self {
            // JSON RPC errors
            Self::InvalidResponse | Self::InvalidVersion => -32600,
            Self::InvalidParams(_) => -32602,
            // Server errors keep the code the server chose
            Self::Server { code, .. } => *code,
            // Transport failures never reached the server
            Self::Transport(_) => -32000,
        }
    }
}
