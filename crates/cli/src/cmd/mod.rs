mod build;
mod files;
mod init;

pub use build::cmd_build;
pub use files::cmd_files;
pub use init::cmd_init;
