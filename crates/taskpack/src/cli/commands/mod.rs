//! CLI commands

mod build;
mod bump;
mod clean;
mod completions;
mod doctor;
mod extensions;
mod generate;
mod package;
mod publish;
mod test_legacy;

pub use build::BuildCommand;
pub use bump::BumpCommand;
pub use clean::CleanCommand;
pub use completions::CompletionsCommand;
pub use doctor::DoctorCommand;
pub use extensions::ExtensionsCommand;
pub use generate::GenerateCommand;
pub use package::PackageCommand;
pub use publish::PublishCommand;
pub use test::TestCommand;
pub use test_legacy::LegacyTestCommand;
