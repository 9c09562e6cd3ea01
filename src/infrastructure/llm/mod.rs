mod mock_structured_generator;
pub mod partial_json;
mod structured_llm_client;

pub use mock_structured_generator::MockStructuredGenerator;
pub use partial_json::{PartialObjectAccumulator, parse_partial};
pub use structured_llm_client::{
    LlmAuthScheme, SseDecoder, StructuredLlmClient, StructuredLlmConfig, request_body,
};
