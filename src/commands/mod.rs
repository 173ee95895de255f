pub mod bitforge;
pub mod build;
pub mod build_deploy;
pub mod deploy;
pub mod helps;
