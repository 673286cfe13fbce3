pub mod accumulator;
pub mod attachment_service;
pub mod llm_service;
pub mod ollama_client;
pub mod stream_decoder;
pub mod title_generator;

pub use accumulator::ResponseAccumulator;
pub use attachment_service::{AttachmentError, attachment_block, extract_attachment};
pub use llm_service::{ByteStream, ChatBackend, ChatOptions, ChatRequest, LlmError};
pub use ollama_client::{DEFAULT_OLLAMA_URL, OllamaClient};
pub use stream_decoder::{DecodedLine, StreamDecoder, StreamEvent, decode_line, decode_stream};
pub use title_generator::conversation_name;
