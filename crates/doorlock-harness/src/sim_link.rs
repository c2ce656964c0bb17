//! Emulated serial link over a turmoil TCP connection.

use std::{io, time::Duration};

use doorlock_core::{Environment, StreamLink};
use turmoil::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

/// Link to the peer host inside a simulation.
pub type SimLink = StreamLink<OwnedReadHalf, OwnedWriteHalf>;

/// Accept exactly one peer on `addr`.
pub async fn accept(addr: &str) -> io::Result<SimLink> {
    let listener = TcpListener::bind(addr).await?;
    let (stream, _) = listener.accept().await?;
    let (reader, writer) = stream.into_split();
    Ok(StreamLink::new(reader, writer))
}

/// Connect to `addr` (a `host:port` known to the simulation), retrying every
/// `retry` until the peer host is listening.
pub async fn connect<E: Environment>(env: &E, addr: &str, retry: Duration) -> io::Result<SimLink> {
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let (reader, writer) = stream.into_split();
                return Ok(StreamLink::new(reader, writer));
            },
            Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => env.sleep(retry).await,
            Err(err) => return Err(err),
        }
    }
}
