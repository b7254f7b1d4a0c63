pub mod aggregate;
pub mod correlation;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod stats;
pub mod time;
