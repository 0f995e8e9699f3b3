//! # Vote Transport
//!
//! Votifier v1 has no framing beyond the RSA block itself: the sender writes
//! exactly one [`VOTE_BLOCK_SIZE`]-byte ciphertext and closes its side, the
//! listener reads exactly that many bytes. Nothing is read back by the sender.
//!
//! ```text
//! sender                          listener
//!   | ---- TCP connect ------------> |
//!   | <--- "VOTIFIER 1.9\n" (opt.) - |   (never read by the sender)
//!   | ---- [256 bytes ciphertext] -> |
//!   | ---- FIN --------------------> |
//! ```
//!
//! Outbound connections go through the [`Connector`] trait so the relay can
//! run over any byte stream; [`TcpConnector`] is the production one.

use std::future::Future;
use std::io;

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::crypto::VOTE_BLOCK_SIZE;

/// Opens one outbound byte stream to a vote listener.
pub trait Connector: Send + Sync {
    type Stream: AsyncWrite + Unpin + Send;

    fn connect(&self, host: &str, port: u16) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP, resolving `host` through the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        debug!("🔗 Connected to vote listener {}:{}", host, port);
        Ok(stream)
    }
}

/// Write one encrypted vote block and shut down the write half.
///
/// A failure at any point, including after some bytes went out, is an error:
/// there is no acknowledgment that would make a partial write good enough.
pub async fn write_block<S>(stream: &mut S, block: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(block).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read one encrypted vote block.
///
/// # Returns
/// - `Ok(Some(block))`: a full block was read
/// - `Ok(None)`: the peer closed before sending a full block
/// - `Err`: I/O error
pub async fn read_block<S>(stream: &mut S) -> io::Result<Option<Vec<u8>>>
where
    S: AsyncRead + Unpin,
{
    let mut block = vec![0u8; VOTE_BLOCK_SIZE];
    match stream.read_exact(&mut block).await {
        Ok(_) => Ok(Some(block)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_block_framing() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let block: Vec<u8> = (0..VOTE_BLOCK_SIZE).map(|i| i as u8).collect();

        write_block(&mut client, &block).await.unwrap();
        assert_eq!(read_block(&mut server).await.unwrap(), Some(block));

        // Write half is shut down, nothing follows the block
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_short_block_reads_as_none() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_block(&mut client, &[1, 2, 3]).await.unwrap();
        drop(client);

        assert_eq!(read_block(&mut server).await.unwrap(), None);
    }
}
