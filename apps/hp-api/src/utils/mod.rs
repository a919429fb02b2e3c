pub mod response;
pub mod validation;
