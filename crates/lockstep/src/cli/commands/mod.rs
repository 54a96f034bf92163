//! CLI commands

mod bump;
mod bump_deps;
mod info;
mod init;
mod release;
mod release_bump;
mod versions;

pub use bump::BumpCommand;
pub use bump_deps::BumpDepsCommand;
pub use info::InfoCommand;
pub use init::InitCommand;
pub use release::ReleaseCommand;
pub use release_bump::ReleaseBumpCommand;
pub use versions::VersionsCommand;
