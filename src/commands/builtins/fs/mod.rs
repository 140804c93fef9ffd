pub mod cp;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod path;
pub mod rm;
pub mod touch;
