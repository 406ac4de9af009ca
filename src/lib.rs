pub mod engine;     // agent, stream, retrier
pub mod errors;     // error handling
pub mod models;     // record + asset payloads
pub mod observability;
pub mod plugins;    // built-in extractors, processors, sinks
pub mod recipe;     // recipe loading + validation
pub mod registry;   // plugin factories
pub mod traits;     // plugin contracts
pub mod utils;
