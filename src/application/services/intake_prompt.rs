use serde::Deserialize;
use serde_json::{Value, json};

use crate::application::ports::{GenerationMessage, GenerationRequest, MessagePart};
use crate::domain::TextChunk;

pub const DOCUMENT_METADATA_SCHEMA_NAME: &str = "board_document_metadata";
pub const CHUNK_INSIGHT_SCHEMA_NAME: &str = "board_document_preliminary_answers";

const METADATA_PROMPT: &str = "You catalogue board documents. \
Read the extracted document text and describe it: a short title, a two or three sentence summary, \
the key topics discussed, the date the document refers to if one is stated, and the parties involved. \
Use only what the text says.";

const CHUNK_INSIGHT_PROMPT: &str = "You prepare board documents for later review. \
For the excerpt below write two short preliminary answers to the most important questions a director \
would ask about it, a handful of lowercase topic tags, and two questions the excerpt could answer. \
Keep every answer grounded in the excerpt.";

pub fn document_metadata_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "summary": { "type": "string" },
            "keyTopics": { "type": "array", "items": { "type": "string" } },
            "documentDate": { "type": "string" },
            "parties": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["title", "summary", "keyTopics"]
    })
}

pub fn chunk_insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "preliminary_answer_1": { "type": "string" },
            "preliminary_answer_2": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } },
            "hypothetical_question_1": { "type": "string" },
            "hypothetical_question_2": { "type": "string" }
        },
        "required": [
            "preliminary_answer_1",
            "preliminary_answer_2",
            "tags",
            "hypothetical_question_1",
            "hypothetical_question_2"
        ]
    })
}

/// Request describing the whole document from its formatted text.
pub fn document_metadata_request(formatted_text: &str) -> GenerationRequest {
    GenerationRequest {
        schema_name: DOCUMENT_METADATA_SCHEMA_NAME.to_string(),
        schema: document_metadata_schema(),
        messages: vec![
            GenerationMessage::system(METADATA_PROMPT),
            GenerationMessage::user(vec![MessagePart::Text(formatted_text.to_string())]),
        ],
    }
}

pub fn chunk_insight_request(chunk: &TextChunk) -> GenerationRequest {
    GenerationRequest {
        schema_name: CHUNK_INSIGHT_SCHEMA_NAME.to_string(),
        schema: chunk_insight_schema(),
        messages: vec![
            GenerationMessage::system(CHUNK_INSIGHT_PROMPT),
            GenerationMessage::user(vec![MessagePart::Text(chunk.text.clone())]),
        ],
    }
}

/// Preliminary answers, tags and questions generated for one chunk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkInsight {
    pub preliminary_answer_1: String,
    pub preliminary_answer_2: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub hypothetical_question_1: String,
    pub hypothetical_question_2: String,
}

impl ChunkInsight {
    /// Shape stored under the record's `analysis` metadata.
    pub fn to_json(&self) -> Value {
        json!({
            "preliminary_answers": [self.preliminary_answer_1, self.preliminary_answer_2],
            "tags": self.tags,
            "hypothetical_questions": [self.hypothetical_question_1, self.hypothetical_question_2],
        })
    }
}
