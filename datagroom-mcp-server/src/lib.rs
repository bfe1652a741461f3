//! MCP server exposing the Datagroom Gateway as five markdown-producing tools.

pub mod aggregate;
pub mod format;
pub mod server;
pub mod tools;
pub mod transport;

pub use server::{DatagroomMcpServer, ServerError};
pub use tools::{DatagroomTools, ToolError};
