//! WebSocket Session Management
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Runs one `SessionController` per connection and bridges it to the socket.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
