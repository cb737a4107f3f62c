pub mod chat;
pub mod core;
pub mod faq;
pub mod llm;
pub mod router;
pub mod server;
pub mod sql;
pub mod state;
pub mod vector_math;

#[cfg(test)]
mod test_support;
