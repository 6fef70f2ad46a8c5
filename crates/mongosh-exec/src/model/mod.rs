pub mod config;
pub mod ids;
pub mod invocation;
pub mod outcome;
pub mod payload;

pub use config::*;
pub use ids::InvocationId;
pub use invocation::*;
pub use outcome::*;
pub use payload::*;

/// Name of the interpreter binary looked up on `PATH` when no override is set.
pub const DEFAULT_EXECUTABLE: &str = "mongosh";

/// Project configuration file searched for next to the changelog.
pub const PROJECT_CONF_FILE: &str = "liquibase.mongosh.conf";

/// Key prefix used inside the project configuration file.
pub const PROJECT_CONF_NAMESPACE: &str = "liquibase.mongosh";
