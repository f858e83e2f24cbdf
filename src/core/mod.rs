//! Line processing that happens before any process is created: tokenizing,
//! variable expansion, chain splitting and pipeline construction.

pub mod chain;
pub mod lexer;
pub mod pipeline;
pub mod variables;
