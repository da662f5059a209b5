pub mod codec;
pub mod error;
pub mod traits;
pub mod types;

pub use codec::ByteCodec;
pub use error::{ChatError, EngineFailure};
pub use traits::{CompletionEngine, TokenCodec};
pub use types::{GenerationParams, GenerationRequest, SessionId, TokenId, DEFAULT_SESSION_ID};
