//! Emulated serial link over TCP.

use std::{io, time::Duration};

use doorlock_core::{Environment, StreamLink};
use tokio::net::{
    TcpListener, TcpStream, ToSocketAddrs,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

/// Link to the peer over a TCP connection.
pub type TcpLink = StreamLink<OwnedReadHalf, OwnedWriteHalf>;

fn into_link(stream: TcpStream) -> io::Result<TcpLink> {
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();
    Ok(StreamLink::new(reader, writer))
}

/// Accept exactly one peer on `addr`.
pub async fn listen(addr: impl ToSocketAddrs) -> io::Result<TcpLink> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("waiting for peer on {}", listener.local_addr()?);
    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "peer connected");
    into_link(stream)
}

/// Connect to a peer, retrying every `retry` until it is up.
///
/// The two nodes power up in any order; the first to start waits here for
/// the other, the way the serial rendezvous does.
pub async fn connect<E: Environment>(env: &E, addr: &str, retry: Duration) -> io::Result<TcpLink> {
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                tracing::info!(peer = addr, "connected");
                return into_link(stream);
            },
            Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                tracing::debug!(peer = addr, "peer not up, retrying");
                env.sleep(retry).await;
            },
            Err(err) => return Err(err),
        }
    }
}
