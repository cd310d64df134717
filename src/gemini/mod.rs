//! Client for the Gemini `generateContent` endpoint.

mod core;
pub use self::core::{
    AiGateway, Candidate, Content, GeminiClient, GenerateContentRequest,
    GenerateContentResponse, GroundingAttribution, GroundingMetadata, INCOMPLETE_REPLY, Part,
    Reply, Source, UNAVAILABLE_REPLY, WebSource, generate_content,
};
