//! QUIC endpoints and the one-message-per-stream framing used by every
//! control channel in the fleet.

use anyhow::Result;
use quinn::crypto::rustls::QuicClientConfig;
use quinn::{
    ClientConfig as QuinnClientConfig, Connection, Endpoint, IdleTimeout, RecvStream, SendStream,
    ServerConfig, TransportConfig,
};
use rustls::DigitallySignedStruct;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{ClientConfig as RustlsClientConfig, RootCertStore, SignatureScheme};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FleetError;
use crate::protocol::FleetMessage;

/// Upper bound for a single encoded message.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
/// Name the self-signed coordinator certificate is issued for.
pub const SERVER_NAME: &str = "localhost";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);
const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Skip certificate verification
#[derive(Debug)]
pub struct SkipServerVerification;

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}

/// Installs the ring provider once per process. Later calls are no-ops.
pub fn init_crypto() {
    let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());
}

fn transport_config() -> Result<Arc<TransportConfig>> {
    let mut transport = TransportConfig::default();
    transport.keep_alive_interval(Some(KEEP_ALIVE_INTERVAL));
    transport.max_idle_timeout(Some(IdleTimeout::try_from(MAX_IDLE_TIMEOUT)?));
    Ok(Arc::new(transport))
}

/// Client endpoint that trusts any coordinator certificate.
pub fn make_client_endpoint() -> Result<Endpoint> {
    init_crypto();
    let mut tls = RustlsClientConfig::builder()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();
    tls.dangerous()
        .set_certificate_verifier(Arc::new(SkipServerVerification));

    let quic_crypto = QuicClientConfig::try_from(tls)?;
    let mut client_cfg = QuinnClientConfig::new(Arc::new(quic_crypto));
    client_cfg.transport_config(transport_config()?);

    let mut endpoint = Endpoint::client(SocketAddr::from(([0, 0, 0, 0], 0)))?;
    endpoint.set_default_client_config(client_cfg);
    Ok(endpoint)
}

/// set up the QUIC server endpoint with a fresh self-signed certificate.
pub fn make_server_endpoint(bind_addr: SocketAddr) -> Result<Endpoint> {
    init_crypto();
    let server_config = configure_server()?;
    let endpoint = Endpoint::server(server_config, bind_addr)?;
    Ok(endpoint)
}

fn configure_server() -> Result<ServerConfig> {
    let cert = rcgen::generate_simple_self_signed(vec![SERVER_NAME.to_string()])?;
    let cert_der = CertificateDer::from(cert.serialize_der()?);
    let key = PrivatePkcs8KeyDer::from(cert.serialize_private_key_der());
    let mut server_config = ServerConfig::with_single_cert(
        vec![cert_der],
        rustls::pki_types::PrivateKeyDer::Pkcs8(key),
    )?;
    server_config.transport_config(transport_config()?);
    Ok(server_config)
}

/// Write `msg` and finish the send half.
pub async fn send_message(send: &mut SendStream, msg: &FleetMessage) -> Result<(), FleetError> {
    let data = bincode::serialize(msg)?;
    send.write_all(&data).await?;
    send.finish()?;
    Ok(())
}

/// Read one message, up to the peer finishing its send half.
pub async fn recv_message(recv: &mut RecvStream) -> Result<FleetMessage, FleetError> {
    let data = recv.read_to_end(MAX_MESSAGE_SIZE).await?;
    Ok(bincode::deserialize(&data)?)
}

/// Send a request on a fresh bidirectional stream and wait for its response.
///
/// An `Error` response is returned as `Err`.
pub async fn request(conn: &Connection, msg: &FleetMessage) -> Result<FleetMessage, FleetError> {
    let (mut send, mut recv) = conn.open_bi().await?;
    send_message(&mut send, msg).await?;
    recv_message(&mut recv).await?.into_result()
}

/// Like [`request`], bounded by `timeout`.
pub async fn request_with_timeout(
    conn: &Connection,
    msg: &FleetMessage,
    timeout: Duration,
) -> Result<FleetMessage, FleetError> {
    match tokio::time::timeout(timeout, request(conn, msg)).await {
        Ok(res) => res,
        Err(_) => Err(FleetError::Transport(format!(
            "{} timed out after {}s",
            msg.kind(),
            timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::MountSpec;

    #[tokio::test]
    async fn test_request_response_over_loopback() {
        let server = make_server_endpoint("127.0.0.1:0".parse().unwrap()).unwrap();
        let server_addr = server.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let conn = server.accept().await.unwrap().await.unwrap();
            let (mut send, mut recv) = conn.accept_bi().await.unwrap();
            let msg = recv_message(&mut recv).await.unwrap();
            let resp = match msg {
                FleetMessage::Mount(spec) if spec.target.is_empty() => FleetMessage::Error(
                    FleetError::InvalidArgument("target is required".to_string()),
                ),
                _ => FleetMessage::Ack,
            };
            send_message(&mut send, &resp).await.unwrap();
            conn.closed().await;
        });

        let client = make_client_endpoint().unwrap();
        let conn = client
            .connect(server_addr, SERVER_NAME)
            .unwrap()
            .await
            .unwrap();
        let res = request(
            &conn,
            &FleetMessage::Mount(MountSpec {
                source: "10.0.0.1:/srv".to_string(),
                target: String::new(),
            }),
        )
        .await;
        assert_eq!(
            res,
            Err(FleetError::InvalidArgument("target is required".to_string()))
        );
        conn.close(0u32.into(), b"done");
        server_task.await.unwrap();
    }
}
