pub mod dev;
pub mod repl;
