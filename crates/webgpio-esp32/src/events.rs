//! Bridges ESP-IDF system events into [`LinkEvent`]s.
//!
//! The callbacks run on the system event task and only forward into the
//! channel. All state changes happen on the dispatcher's thread.

use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    ipv4::Ipv4Addr as EspIpv4Addr,
    netif::IpEvent,
    wifi::WifiEvent,
};
use log::debug;

use webgpio_core::{EventSender, LinkEvent};

/// Keeps the event loop subscriptions alive. Dropping it unsubscribes.
pub struct LinkSubscriptions {
    _wifi: EspSubscription<'static, System>,
    _ip: EspSubscription<'static, System>,
}

/// Forward station and DHCP events from `sysloop` to `events`.
pub fn subscribe(
    sysloop: &EspSystemEventLoop,
    events: EventSender,
) -> anyhow::Result<LinkSubscriptions> {
    let wifi_events = events.clone();
    let wifi = sysloop.subscribe::<WifiEvent, _>(move |event| {
        let link = match event {
            WifiEvent::StaStarted => LinkEvent::LinkStarted,
            WifiEvent::StaConnected(_) => LinkEvent::LinkUp,
            WifiEvent::StaDisconnected(_) => LinkEvent::LinkDown,
            other => {
                debug!("Ignoring Wi-Fi event {:?}", other);
                return;
            }
        };
        wifi_events.send(link);
    })?;

    let ip = sysloop.subscribe::<IpEvent, _>(move |event| {
        if let IpEvent::DhcpIpAssigned(assignment) = event {
            let address: EspIpv4Addr = assignment.ip();
            events.send(LinkEvent::AddressAcquired(address));
        }
    })?;

    Ok(LinkSubscriptions { _wifi: wifi, _ip: ip })
}
