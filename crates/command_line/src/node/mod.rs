pub mod generate_keypair;
pub mod get_results;
pub mod init;
pub mod start;
