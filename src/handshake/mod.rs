mod state;
mod c0c1;
mod s0s1s2;

pub use state::*;
pub use c0c1::*;
pub use s0s1s2::*;

use crate::{Error, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Run the client side of the simple RTMP handshake.
///
/// ```text
/// C0 C1  ----------------->
///        <-----------------  S0 S1
/// C2     ----------------->
///        <-----------------  S2
/// ```
///
/// All-or-nothing: any short read, closed socket or I/O error fails the
/// whole handshake with the I/O error attached. There is no retry.
pub async fn perform_handshake<S>(stream: &mut S, params: HandshakeParameters) -> Result<RtmpVersion>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(
        "performHandshake: started, requested version = {} epochTime = {}",
        params.version, params.epoch_time
    );

    let mut state = HandshakeState::new();
    match run_handshake(stream, params, &mut state).await {
        Ok(version) => {
            info!("performHandshake: completed, server selected version {}", version.value());
            Ok(version)
        }
        Err(e) => {
            warn!("performHandshake: failed in state {:?}: {}", state, e);
            // Error is accepted from every state
            let _ = state.transition(HandshakeEvent::Error);
            Err(e)
        }
    }
}

async fn run_handshake<S>(
    stream: &mut S,
    params: HandshakeParameters,
    state: &mut HandshakeState,
) -> Result<RtmpVersion>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // C0 + C1
    let c0c1 = C0C1::create_client(params).encode()?;
    stream.write_all(&c0c1).await
        .map_err(|e| Error::handshake_io("Failed to write C0+C1", e))?;
    stream.flush().await
        .map_err(|e| Error::handshake_io("Failed to flush C0+C1", e))?;
    state.transition(HandshakeEvent::SentC0C1)?;
    debug!("handshake: wrote C0+C1 ({} bytes)", c0c1.len());

    // S0 + S1
    let mut s0 = [0u8; 1];
    stream.read_exact(&mut s0).await
        .map_err(|e| Error::handshake_io("Failed to read S0", e))?;
    let mut s1 = vec![0u8; HANDSHAKE_SIZE];
    stream.read_exact(&mut s1).await
        .map_err(|e| Error::handshake_io("Failed to read S1", e))?;
    let version = RtmpVersion::from_s0(s0[0], params.version)?;
    let s1 = S1::parse(s1)?;
    state.transition(HandshakeEvent::ReceivedS0S1)?;
    debug!("handshake: read S0 (version {}) and S1 (time {})", version.value(), s1.timestamp());

    // C2 echoes S1
    stream.write_all(s1.echo_as_c2()).await
        .map_err(|e| Error::handshake_io("Failed to write C2", e))?;
    stream.flush().await
        .map_err(|e| Error::handshake_io("Failed to flush C2", e))?;
    state.transition(HandshakeEvent::SentC2)?;

    // S2 is read and discarded
    let mut s2 = vec![0u8; HANDSHAKE_SIZE];
    stream.read_exact(&mut s2).await
        .map_err(|e| Error::handshake_io("Failed to read S2", e))?;
    state.transition(HandshakeEvent::ReceivedS2)?;

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// Plays the server side: reads C0+C1, answers S0+S1, reads C2, sends S2.
    async fn fake_server<S>(mut server: S, s0: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
        server.read_exact(&mut c0c1).await.unwrap();

        let s1: Vec<u8> = (0..HANDSHAKE_SIZE).map(|i| (i % 251) as u8).collect();
        server.write_all(&[s0]).await.unwrap();
        server.write_all(&s1).await.unwrap();

        let mut c2 = vec![0u8; HANDSHAKE_SIZE];
        server.read_exact(&mut c2).await.unwrap();
        server.write_all(&c0c1[1..]).await.unwrap();

        (c0c1, s1, c2)
    }

    #[tokio::test]
    async fn test_handshake_echoes_s1() {
        let (mut client, server) = duplex(16 * 1024);
        let server_task = tokio::spawn(fake_server(server, 3));

        let params = HandshakeParameters::new(3, 1_700_000_000);
        let version = perform_handshake(&mut client, params).await.unwrap();
        assert_eq!(version, RtmpVersion(3));

        let (c0c1, s1, c2) = server_task.await.unwrap();
        assert_eq!(c0c1[0], 3);
        assert_eq!(&c0c1[1..5], &1_700_000_000u32.to_be_bytes());
        assert_eq!(&c0c1[5..9], &[0, 0, 0, 0]);
        assert_eq!(c2, s1);
    }

    #[tokio::test]
    async fn test_short_s1_fails() {
        let (mut client, mut server) = duplex(16 * 1024);
        let server_task = tokio::spawn(async move {
            let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
            server.read_exact(&mut c0c1).await.unwrap();
            server.write_all(&[3]).await.unwrap();
            server.write_all(&[0u8; 100]).await.unwrap();
            // closing mid-S1
        });

        let err = perform_handshake(&mut client, HandshakeParameters::new(3, 0)).await.unwrap_err();
        server_task.await.unwrap();

        assert!(matches!(err, Error::Handshake { source: Some(_), .. }));
        assert!(err.is_unexpected_eof());
    }

    #[tokio::test]
    async fn test_unexpected_version_fails() {
        let (mut client, mut server) = duplex(16 * 1024);
        let server_task = tokio::spawn(async move {
            let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
            server.read_exact(&mut c0c1).await.unwrap();
            // RTMPE version byte, then hang up
            server.write_all(&[6]).await.unwrap();
            server.write_all(&c0c1[1..]).await.unwrap();
        });

        let err = perform_handshake(&mut client, HandshakeParameters::new(3, 0)).await.unwrap_err();
        server_task.await.unwrap();
        assert!(matches!(err, Error::Handshake { source: None, ref message } if message.contains("version 6")));
    }
}
