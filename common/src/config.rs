pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Record field limits
// Enforced client-side before a call is built so malformed input fails
// fast instead of burning a simulation round-trip
pub const MAX_NAME_LENGTH: usize = 120;
pub const MAX_CONTENT_SIZE: usize = 1024 * 1024; // 1 MiB of ciphertext
pub const MAX_METADATA_SIZE: usize = 64 * 1024;
pub const MAX_TAGS_PER_RECORD: usize = 32;
pub const MAX_TAG_LENGTH: usize = 64;

// Decode bounds for schema-driven values
// A hostile length prefix must never drive an allocation
pub const MAX_SEQUENCE_LENGTH: usize = 10_000;
pub const MAX_BYTES_LENGTH: usize = 1024 * 1024;
