pub mod assets;
pub mod checkout;
pub mod frame_orders;
pub mod gateway;
pub mod order_status;
pub mod orders;
