pub mod call_tool;
pub mod chat;
pub mod resource;
pub mod serve;
pub mod tool_server;
