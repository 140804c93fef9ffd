pub mod cd;
pub mod exit;
pub mod printenv;
pub mod pwd;
pub mod which;
