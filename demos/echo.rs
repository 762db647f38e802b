//! Echo server - request/response over a local socket.
//!
//! This example demonstrates:
//! - Binding a listener and adopting the accepted descriptor
//! - Driving the server side with a `Reactor` on its own thread
//! - Pairing replies with calls through the correlation id
//! - Passing an open file to the peer
//!
//! # Running
//!
//! ```text
//! RUST_LOG=localwire=trace cargo run --example echo
//! ```

use std::io::{Read, Seek, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use localwire::{generate_socket_path, Kind, LocalListener, LocalSocket, Reactor, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,localwire=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let path = generate_socket_path();
    let listener = LocalListener::bind(&path).await?;
    info!(path = %path.display(), "echo server listening");

    let client_path = path.clone();
    let client = thread::spawn(move || run_client(&client_path));

    let server = Arc::new(LocalSocket::new());
    server.set_descriptor(listener.accept().await?)?;

    let reactor = Arc::new(Reactor::new());
    reactor.register(&server);
    let driver = {
        let reactor = reactor.clone();
        thread::spawn(move || reactor.run())
    };

    // Echo until the client hangs up.
    while server.wait_for_ready_read(None).is_ok() {
        while let Some(value) = server.read() {
            info!(kind = ?value.kind(), id = value.correlation_id(), "echoing");
            let received = value.to_descriptor();
            server.write(value)?;
            if let Some(fd) = received {
                // The kernel duplicates on send; our copy is done once written.
                server.wait_for_data_written(WAIT)?;
                drop(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }
    }
    info!("client disconnected");

    reactor.stop();
    driver.join().map_err(|_| "reactor thread panicked")??;
    client.join().map_err(|_| "client thread panicked")??;
    Ok(())
}

fn run_client(path: &std::path::Path) -> localwire::Result<()> {
    let socket = LocalSocket::new();
    socket.connect(path)?;

    for (id, text) in ["hello", "world"].into_iter().enumerate() {
        socket.write(Value::from(text).with_correlation_id(id as u32))?;
        socket.wait_for_ready_read(WAIT)?;
        if let Some(reply) = socket.read() {
            info!(id = reply.correlation_id(), text = ?reply.to_text(), "reply");
        }
    }

    let mut file = tempfile::tempfile()?;
    file.write_all(b"sent through SCM_RIGHTS")?;
    socket.write(Value::from_descriptor(file.as_raw_fd()))?;
    socket.wait_for_ready_read(WAIT)?;

    if let Some(reply) = socket.read().filter(|v| v.kind() == Kind::SocketDescriptor) {
        if let Some(fd) = reply.to_descriptor() {
            // The echoed descriptor is a fresh copy owned by this process.
            let mut echoed = unsafe { std::fs::File::from_raw_fd(fd) };
            echoed.rewind()?;
            let mut contents = String::new();
            echoed.read_to_string(&mut contents)?;
            info!(fd, %contents, "descriptor came back");
        }
    }

    socket.disconnect();
    Ok(())
}
