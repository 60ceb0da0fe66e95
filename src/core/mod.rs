pub mod llm;
pub mod router;
pub mod search;
pub mod sentences;
pub mod stt;
pub mod tts;
pub mod web;

// Re-export commonly used types for convenience
pub use stt::{
    AssemblyAISTT, AssemblyAISTTConfig, BaseSTT, STTConfig, STTConnectionState, STTError,
    STTErrorCallback, STTResult, STTResultCallback,
};

pub use tts::{AudioData, BaseTTS, MurfTTS, SpeechSynthesizer, TTSConfig, TTSError, TTSResult};

pub use llm::{
    ChatRole, ChatTurn, ConversationHistory, ConversationModel, GeminiClient, GeminiConfig,
    LLMError, LLMResult,
};

pub use search::{SearchError, SearchHit, SerpApiClient, SerpApiConfig, WebSearch};

pub use web::{FetchConfig, FetchError, HttpPageFetcher, PageFetcher};

pub use router::{FallbackReason, ResponseRouter, Route, RouterReply};
pub use sentences::split_sentences;
