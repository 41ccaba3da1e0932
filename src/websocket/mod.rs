pub mod handler;
pub mod msg_join_handler;
pub mod msg_update_handler;
pub mod msg_user_info_handler;
pub mod registry;

pub use handler::websocket_handler;
