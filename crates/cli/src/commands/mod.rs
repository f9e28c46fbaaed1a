pub mod config_cmd;
pub mod generate;
pub mod init;
pub mod serve;
