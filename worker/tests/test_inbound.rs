mod fakes;

use common::quic::{SERVER_NAME, make_client_endpoint, make_server_endpoint, request};
use common::{FleetError, FleetMessage, MountSpec};
use fakes::{ScriptedRunner, share_ops};
use worker::daemon::server::{dispatch, serve};

#[tokio::test]
async fn test_dispatch_rejects_admin_requests() {
    let dir = tempfile::tempdir().unwrap();
    let ops = share_ops(ScriptedRunner::new(), &dir.path().join("fleet.exports"));

    assert_eq!(
        dispatch(FleetMessage::Notify("hello".to_string()), &ops).await,
        FleetMessage::Ack
    );
    assert!(matches!(
        dispatch(FleetMessage::ListShares, &ops).await,
        FleetMessage::Error(FleetError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_coordinator_calls_reach_share_ops() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let ops = share_ops(runner.clone(), &dir.path().join("fleet.exports"));

    let coordinator = make_server_endpoint("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = coordinator.local_addr().unwrap();
    let client = make_client_endpoint().unwrap();
    let (worker_conn, accepted) = tokio::join!(
        async { client.connect(addr, SERVER_NAME).unwrap().await.unwrap() },
        async { coordinator.accept().await.unwrap().await.unwrap() }
    );
    tokio::spawn(serve(worker_conn.clone(), ops.clone()));

    let spec = MountSpec {
        source: "10.0.0.1:/srv/x".to_string(),
        target: dir.path().join("t").to_string_lossy().into_owned(),
    };
    assert_eq!(
        request(&accepted, &FleetMessage::Mount(spec.clone())).await,
        Ok(FleetMessage::Ack)
    );
    assert_eq!(ops.mounts().snapshot().await, vec![spec]);

    let res = request(&accepted, &FleetMessage::CreateExport("relative".to_string())).await;
    assert!(matches!(res, Err(FleetError::InvalidArgument(_))));
    assert_eq!(runner.calls_to("mount").len(), 1);

    accepted.close(0u32.into(), b"done");
    worker_conn.closed().await;
}
