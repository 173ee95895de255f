pub mod archive;
pub mod builder;
pub mod context;
pub mod deployer;
pub mod extgit;
pub mod manifest;
pub mod toolchain;
pub mod version;
