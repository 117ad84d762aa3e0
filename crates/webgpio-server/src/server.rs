//! Control server on tokio + axum.
//!
//! [`AxumControlServer::start`] is called from the event dispatcher, which
//! runs on a blocking thread. The listener is bound synchronously there, so a
//! port conflict is reported as a [`BindError`] straight away. Serving then
//! continues on the tokio runtime captured at construction.

use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use webgpio_core::config::HttpConfig;
use webgpio_core::error::BindError;
use webgpio_core::{ControlServer, HandlerContext, RouteTable};

use crate::routes::build_router;

/// Starts the control router on a tokio runtime.
#[derive(Debug, Clone)]
pub struct AxumControlServer {
    runtime: Handle,
    bind_ip: IpAddr,
}

impl AxumControlServer {
    /// `runtime` hosts the accept loop; `bind_ip` is the interface to listen on.
    pub fn new(runtime: Handle, bind_ip: IpAddr) -> Self {
        Self { runtime, bind_ip }
    }
}

/// A running control server. Dropping it shuts the server down.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl ControlServer for AxumControlServer {
    type Handle = ServerHandle;

    fn start(
        &mut self,
        config: &HttpConfig,
        routes: RouteTable,
        ctx: HandlerContext,
    ) -> Result<ServerHandle, BindError> {
        let addr = SocketAddr::new(self.bind_ip, config.port);
        let bind_error = |e: io::Error| BindError {
            port: config.port,
            reason: e.to_string(),
        };

        // Registering the socket with the reactor needs the runtime context.
        let _guard = self.runtime.enter();
        let listener = bind(addr, config.max_open_sockets).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let app = build_router(&routes, ctx);
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = self.runtime.spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                error!("Control server error: {}", e);
            }
            info!("Control server on {} stopped", local_addr);
        });

        info!("Control server listening on {}", local_addr);
        Ok(ServerHandle {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }
}

fn bind(addr: SocketAddr, backlog: usize) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.bind(addr)?;
    socket.listen(u32::try_from(backlog.max(1)).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::SimulatedPin;
    use std::net::Ipv4Addr;
    use webgpio_core::{Actuator, Method, Polarity};

    fn context() -> HandlerContext {
        let (pin, _) = SimulatedPin::new(4);
        HandlerContext {
            assets_root: std::env::temp_dir(),
            actuator: Actuator::shared(Box::new(pin), Polarity::ActiveLow).unwrap(),
        }
    }

    fn http(port: u16) -> HttpConfig {
        HttpConfig {
            port,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_binds_ephemeral_port() {
        let mut server = AxumControlServer::new(Handle::current(), Ipv4Addr::LOCALHOST.into());

        let handle = server
            .start(&http(0), RouteTable::control(Method::Post), context())
            .unwrap();

        assert_ne!(handle.local_addr().port(), 0);
        assert!(handle.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_port_in_use_is_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut server = AxumControlServer::new(Handle::current(), Ipv4Addr::LOCALHOST.into());

        let err = server
            .start(&http(port), RouteTable::control(Method::Post), context())
            .unwrap_err();

        assert_eq!(err.port, port);
    }
}
