pub mod cart_item;
pub mod checkout_intent;
pub mod frame_order;
pub mod frame_order_item;
pub mod order;

pub use cart_item::Entity as CartItem;
pub use checkout_intent::Entity as CheckoutIntent;
pub use frame_order::Entity as FrameOrder;
pub use frame_order_item::Entity as FrameOrderItem;
pub use order::Entity as Order;
