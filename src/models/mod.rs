pub mod dead_letter;
pub mod notification;
pub mod response;
pub mod retry;
pub mod template;
