//! Control point driven by synthetic discovery events against a real hosted
//! device.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use url::Url;

use ravcontrol::{ControlPoint, ControlPointEvent, DiscoveryEvent, TARGET_ALL};
use ravserver::Server;
use ravupnp::UpnpServerExt;
use ravupnp::devices::{Describable, Device};
use ravupnp::services::Service;
use ravupnp::state_variables::StateVariable;
use ravupnp::values::{Value, VarType};

async fn start_server(udn: &str, name: &str) -> Result<(Server, Url)> {
    let mut service = Service::new("SwitchPower");
    service
        .add_variable(
            StateVariable::new("Status", VarType::Boolean).with_default(Value::Boolean(false)),
        )
        .unwrap();

    let mut device = Device::new(name, "BinaryLight", "Discovered light");
    device.add_service(Arc::new(service));

    let mut server = Server::new("test-discovery", "127.0.0.1", 0);
    let instance = server
        .register_device_with_udn(Arc::new(device), udn.to_string())
        .await?;

    let addr = server.start().await?;
    let url = Url::parse(&format!("http://{}{}", addr, instance.description_route()))?;
    Ok((server, url))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn discovery_events_produce_proxies_in_order() -> Result<()> {
    let udn = "uuid:disco-test-light";
    let (mut server, description_url) = start_server(udn, "DiscoLight").await?;

    let usn = format!("{}::urn:schemas-upnp-org:device:BinaryLight:1", udn);
    let location = description_url.to_string();

    let events = tokio::task::spawn_blocking(move || -> Result<_> {
        let control_point =
            Arc::new(ControlPoint::new("urn:schemas-upnp-org:device:BinaryLight:1")?);
        let rx = control_point.subscribe();

        control_point.handle_discovery_event(DiscoveryEvent::ResourceAvailable {
            usn: usn.clone(),
            locations: vec![location],
        });

        let first = rx.recv_timeout(Duration::from_secs(5))?;
        let second = rx.recv_timeout(Duration::from_secs(5))?;

        // Re-announcing the same USN must not rebuild the proxies
        control_point.handle_discovery_event(DiscoveryEvent::ResourceAvailable {
            usn: usn.clone(),
            locations: vec!["http://127.0.0.1:1/dead.xml".to_string()],
        });
        assert_eq!(control_point.device_proxies().len(), 1);

        control_point
            .handle_discovery_event(DiscoveryEvent::ResourceUnavailable { usn: usn.clone() });
        let third = rx.recv_timeout(Duration::from_secs(5))?;
        let fourth = rx.recv_timeout(Duration::from_secs(5))?;

        assert!(control_point.device_proxies().is_empty());
        Ok((first, second, third, fourth))
    })
    .await??;

    // device-proxy-available strictly before service-proxy-available
    match &events.0 {
        ControlPointEvent::DeviceProxyAvailable(device) => {
            assert_eq!(device.proxy().udn(), udn);
            assert_eq!(device.proxy().friendly_name(), "Discovered light");
        }
        other => panic!("expected DeviceProxyAvailable first, got {:?}", other),
    }
    match &events.1 {
        ControlPointEvent::ServiceProxyAvailable(service) => {
            assert_eq!(
                service.proxy().service_type(),
                "urn:schemas-upnp-org:service:SwitchPower:1"
            );
        }
        other => panic!("expected ServiceProxyAvailable second, got {:?}", other),
    }

    // services go away before the device
    assert!(matches!(
        events.2,
        ControlPointEvent::ServiceProxyUnavailable { .. }
    ));
    assert!(matches!(
        events.3,
        ControlPointEvent::DeviceProxyUnavailable { .. }
    ));

    server.stop();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_matching_target_is_ignored() -> Result<()> {
    let udn = "uuid:disco-test-ignored";
    let (mut server, description_url) = start_server(udn, "IgnoredLight").await?;

    let usn = format!("{}::urn:schemas-upnp-org:device:BinaryLight:1", udn);
    let location = description_url.to_string();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let control_point =
            Arc::new(ControlPoint::new("urn:schemas-upnp-org:device:MediaServer:1")?);
        control_point.handle_discovery_event(DiscoveryEvent::ResourceAvailable {
            usn,
            locations: vec![location],
        });
        assert!(control_point.device_proxies().is_empty());
        Ok(())
    })
    .await??;

    server.stop();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_location_emits_nothing() -> Result<()> {
    let control_point = Arc::new(ControlPoint::new(TARGET_ALL)?);
    let rx = control_point.subscribe();

    tokio::task::spawn_blocking({
        let control_point = Arc::clone(&control_point);
        move || {
            control_point.handle_discovery_event(DiscoveryEvent::ResourceAvailable {
                usn: "uuid:unreachable::upnp:rootdevice".to_string(),
                locations: vec!["http://127.0.0.1:9/desc.xml".to_string()],
            });
        }
    })
    .await?;

    assert!(rx.is_empty());
    assert!(control_point.device_proxies().is_empty());
    Ok(())
}
