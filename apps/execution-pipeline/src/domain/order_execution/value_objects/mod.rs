//! Order Execution Value Objects

mod duration_type;
mod execution_status;
mod order_side;
mod order_type;

pub use duration_type::DurationType;
pub use execution_status::ExecutionStatus;
pub use order_side::OrderSide;
pub use order_type::OrderType;
