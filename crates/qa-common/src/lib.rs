pub mod corpus;
pub mod error;
pub mod matcher;
pub mod mcp_api;
pub mod normalize;
pub mod topics;
