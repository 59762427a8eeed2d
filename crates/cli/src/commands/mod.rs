//! CLI Commands

pub mod init_config;
pub mod inspect;
pub mod locate;
pub mod run;
