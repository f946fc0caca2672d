pub mod account_tools;
pub mod config;
pub mod directory;
pub mod engine;
pub mod escalation;
pub mod evidence;
pub mod frustration;
pub mod knowledge;
pub mod knowledge_tools;
pub mod routing;
pub mod session;
pub mod solution_tool;
pub mod solutions;
pub mod ticket_tools;
pub mod tickets;
pub mod tool;

pub use account_tools::*;
pub use config::*;
pub use directory::*;
pub use engine::*;
pub use escalation::*;
pub use evidence::*;
pub use knowledge::*;
pub use knowledge_tools::*;
pub use routing::*;
pub use session::*;
pub use solution_tool::*;
pub use solutions::*;
pub use ticket_tools::*;
pub use tickets::*;
pub use tool::*;
