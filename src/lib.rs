pub mod completion;
pub mod core;
pub mod documents;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod state;
pub mod warehouse;
