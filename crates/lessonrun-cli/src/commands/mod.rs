pub mod delete;
pub mod init;
pub mod modules;
pub mod publish;
pub mod reset;
pub mod submissions;
pub mod take;
