pub mod fanout;
pub mod marshaller;
pub mod pipeline;
pub mod pool;
pub mod scheduler;
