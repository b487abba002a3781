// Everything that talks to the engine process.

pub mod channel;
pub mod command;
pub mod driver;
pub mod error;
pub mod options;
pub mod process;
pub mod session;

pub use error::EngineError;
pub use options::EngineOption;
pub use process::{EngineConfig, EngineProcess};
pub use session::EngineSession;
