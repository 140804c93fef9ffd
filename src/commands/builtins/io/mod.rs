pub mod cat;
pub mod echo;
pub mod lines;
pub mod seq;
pub mod yes;
