mod agent;
mod retrier;
mod stream;


pub use agent::{Agent, AgentConfig, Run, TimerFn};
pub use retrier::Retrier;
pub use stream::Stream;
