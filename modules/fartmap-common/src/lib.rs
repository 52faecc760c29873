pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use codec::CodecError;
pub use config::Config;
pub use error::FartMapError;
pub use identity::LocalIdentity;
pub use types::*;
