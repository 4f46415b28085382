pub mod admin;
pub mod renders;
