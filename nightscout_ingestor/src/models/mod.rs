pub mod glucose;
pub mod profile;
pub mod treatment;
pub mod window;
