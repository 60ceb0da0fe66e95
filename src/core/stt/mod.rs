pub mod assemblyai;
mod base;

// Re-export public types and traits
pub use base::{
    BaseSTT, STTConfig, STTConnectionState, STTError, STTErrorCallback, STTResult,
    STTResultCallback,
};

// Re-export AssemblyAI implementation
pub use assemblyai::{
    AssemblyAIEncoding, AssemblyAIMessage, AssemblyAIRegion, AssemblyAISTT, AssemblyAISTTConfig,
    AssemblyAISpeechModel,
};
