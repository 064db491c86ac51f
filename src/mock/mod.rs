mod builder;
mod instance;

pub use builder::SchmockBuilder;
pub use instance::Schmock;
