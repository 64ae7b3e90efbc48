//! End-to-end scenarios over real TCP loopback sockets.
//!
//! The in-crate unit tests drive the controllers over in-memory pipes;
//! these exercise the paths only a real socket reaches: resolve, connect,
//! bind, accept, and the full three-tier simulator / proxy / client chain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hlx_core::model::{GroupId, SourceId, ZoneId};
use hlx_core::{
    ClientController, Config, ConnectionEvent, ConnectionStage, Event, HostAddress, MemoryStore,
    NoopEventSink, ProxyController, ServerController, StateChange,
};

fn small_config() -> Config {
    let mut config = Config::default();
    config.capacity.zones = 4;
    config.capacity.sources = 4;
    config.capacity.groups = 2;
    config.capacity.favorites = 2;
    config.capacity.equalizer_presets = 2;
    config.event_channel_capacity = 1024;
    config
}

async fn spawn_server() -> (Arc<ServerController>, SocketAddr) {
    let server = ServerController::new(
        small_config(),
        Arc::new(NoopEventSink),
        Arc::new(MemoryStore::new()),
    );
    let listener = server.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = Arc::clone(&server);
    tokio::spawn(async move { accept.run(listener).await });
    (server, addr)
}

fn z(n: u8) -> ZoneId {
    ZoneId::new(n).unwrap()
}

#[tokio::test]
async fn volume_set_and_observe_over_tcp() {
    let (server, addr) = spawn_server().await;

    let client = ClientController::new(small_config());
    client
        .connect(&HostAddress::new(addr.ip().to_string(), addr.port()))
        .await
        .unwrap();
    let mut events = client.subscribe();

    let confirmed = client.set_zone_volume(z(3), -25).await.unwrap();
    assert_eq!(confirmed, -25);
    server.with_model(|model| {
        assert_eq!(model.zones.zone(z(3)).unwrap().volume().level(), Ok(-25));
    });

    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        Event::State(StateChange::ZoneVolume {
            zone: z(3),
            level: -25
        })
    );
}

#[tokio::test]
async fn peer_changes_surface_as_unsolicited_notifications() {
    let (_server, addr) = spawn_server().await;
    let address = HostAddress::new(addr.ip().to_string(), addr.port());

    let watcher = ClientController::new(small_config());
    watcher.connect(&address).await.unwrap();
    let mut events = watcher.subscribe();

    let actor = ClientController::new(small_config());
    actor.connect(&address).await.unwrap();
    actor.set_zone_mute(z(1), true).await.unwrap();

    // The watcher never asked; the report arrives out of band.
    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no unsolicited notification")
        .unwrap();
    assert_eq!(
        event,
        Event::State(StateChange::ZoneMute {
            zone: z(1),
            mute: true
        })
    );
    watcher.with_model(|mirror| {
        assert_eq!(mirror.zones.zone(z(1)).unwrap().volume().mute(), Ok(true));
    });
}

#[tokio::test]
async fn client_lifecycle_events_fire_in_stage_order() {
    let (_server, addr) = spawn_server().await;

    let client = ClientController::new(small_config());
    let mut events = client.subscribe();
    client
        .connect(&HostAddress::new(addr.ip().to_string(), addr.port()))
        .await
        .unwrap();
    client.disconnect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut stages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::Connection(event) = event {
            stages.push(event);
        }
    }
    assert_eq!(
        stages,
        vec![
            ConnectionEvent::Will {
                stage: ConnectionStage::Resolve
            },
            ConnectionEvent::Did {
                stage: ConnectionStage::Resolve
            },
            ConnectionEvent::Will {
                stage: ConnectionStage::Connect
            },
            ConnectionEvent::Did {
                stage: ConnectionStage::Connect
            },
            ConnectionEvent::Will {
                stage: ConnectionStage::Disconnect
            },
            ConnectionEvent::Did {
                stage: ConnectionStage::Disconnect
            },
        ]
    );
}

#[tokio::test]
async fn resolve_failure_reports_the_stage_that_died() {
    let client = ClientController::new(small_config());
    let mut events = client.subscribe();

    let result = client
        .connect(&HostAddress::new("host.invalid.hlx.test", 23))
        .await;
    assert!(result.is_err());

    let mut saw_did_not_resolve = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Connection(ConnectionEvent::DidNot {
            stage: ConnectionStage::Resolve,
            ..
        }) = event
        {
            saw_did_not_resolve = true;
        }
    }
    assert!(saw_did_not_resolve);
}

#[tokio::test]
async fn three_tier_chain_works_over_loopback() {
    let (server, addr) = spawn_server().await;

    // Proxy: upstream to the simulator, downstream on its own port.
    let proxy = ProxyController::new(small_config());
    proxy
        .connect_upstream(&HostAddress::new(addr.ip().to_string(), addr.port()))
        .await
        .unwrap();
    let listener = proxy.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    {
        let proxy = Arc::clone(&proxy);
        tokio::spawn(async move { proxy.run(listener).await });
    }

    // Downstream client speaks to the proxy as if it were the hardware.
    let client = ClientController::new(small_config());
    client
        .connect(&HostAddress::new(
            proxy_addr.ip().to_string(),
            proxy_addr.port(),
        ))
        .await
        .unwrap();
    client.refresh().await.unwrap();

    client.add_zone_to_group(GroupId::new(1).unwrap(), z(2)).await.unwrap();
    client.add_zone_to_group(GroupId::new(1).unwrap(), z(3)).await.unwrap();
    client
        .set_group_volume(GroupId::new(1).unwrap(), -30)
        .await
        .unwrap();
    client
        .set_zone_source(z(2), SourceId::new(4).unwrap())
        .await
        .unwrap();

    // Truth lands on the real controller at the far end of the chain.
    server.with_model(|model| {
        assert_eq!(model.zones.zone(z(2)).unwrap().volume().level(), Ok(-30));
        assert_eq!(model.zones.zone(z(3)).unwrap().volume().level(), Ok(-30));
        assert_eq!(model.zones.zone(z(2)).unwrap().source().unwrap().get(), 4);
        let group = model.groups.group(GroupId::new(1).unwrap()).unwrap();
        assert_eq!(group.member_count(), 2);
    });

    // And the downstream mirror agrees with it.
    client.with_model(|mirror| {
        server.with_model(|truth| {
            assert_eq!(
                mirror.zones.zone(z(2)).unwrap().volume().level(),
                truth.zones.zone(z(2)).unwrap().volume().level()
            );
        });
    });
}
