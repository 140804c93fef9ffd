pub mod sleep;
pub mod status;
