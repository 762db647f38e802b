//! # localwire
//!
//! Duplex, message-oriented IPC over Unix domain sockets.
//!
//! A [`LocalSocket`] carries a sequence of typed, length-prefixed [`Value`]s
//! and can hand live file descriptors to its peer through `SCM_RIGHTS`.
//! Descriptors are delivered in the same position of the stream they were
//! sent in, even when the kernel hands them over later than the frame bytes.
//!
//! ## Architecture
//!
//! - **Value**: tagged payload plus a correlation id for an RPC layer above
//! - **Protocol**: 9-byte header, frame accumulator, outbound write cursor
//! - **Engine**: read/write pumps, descriptor staging, blocking waits
//! - **Reactor**: optional caller-driven readiness dispatch
//!
//! ## Example
//!
//! ```ignore
//! use localwire::{LocalListener, LocalSocket, Value};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> localwire::Result<()> {
//!     let listener = LocalListener::bind("/tmp/echo.sock").await?;
//!     let server = LocalSocket::new();
//!     server.set_descriptor(listener.accept().await?)?;
//!
//!     while server.wait_for_ready_read(None).is_ok() {
//!         while let Some(value) = server.read() {
//!             server.write(value)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;
pub mod value;

mod engine;
mod reactor;
mod socket;

pub use config::SocketConfig;
pub use error::{LocalwireError, Result};
pub use events::SocketEvent;
pub use reactor::Reactor;
pub use socket::LocalSocket;
pub use transport::{generate_socket_path, LocalListener, Transport, UnixTransport};
pub use value::{Kind, Value};
