//! Core MCP types for tools, resources, and prompts.

pub mod prompts;
pub mod resources;
pub mod tools;

pub use prompts::{
    GetPromptRequest, GetPromptResponse, ListPromptsRequest, ListPromptsResponse, Prompt,
    PromptArgument, PromptContent, PromptMessage, PromptRole,
};
pub use resources::{
    ListResourcesRequest, ListResourcesResponse, ReadResourceRequest, ReadResourceResponse,
    Resource, ResourceContent, ResourceHit, ResourceMetadata, SubscribeRequest,
};
pub use tools::{
    ListToolsRequest, ListToolsResponse, Tool, ToolCallRequest, ToolCallResponse, ToolContent,
    ToolParameter,
};
