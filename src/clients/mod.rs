pub mod database;
pub mod mailer;
pub mod rbmq;
