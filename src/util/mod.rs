pub mod anyerror;
pub mod filesystem;
pub mod prompt;
pub mod subprocess;
