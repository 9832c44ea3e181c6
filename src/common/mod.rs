pub mod error;
pub mod pdf_protect;
pub mod response;
pub mod security;
pub mod upload;
