//! Control server contract.

use crate::config::HttpConfig;
use crate::error::BindError;
use crate::handlers::HandlerContext;
use crate::routes::RouteTable;

/// HTTP listener serving a frozen [`RouteTable`].
///
/// Implementations dispatch on method and exact path and leave unmatched
/// requests to the underlying server's not-found response.
pub trait ControlServer {
    /// Keeps the listener alive; dropping it stops the server.
    type Handle;

    /// Bind the listen port and begin serving `routes`.
    fn start(
        &mut self,
        config: &HttpConfig,
        routes: RouteTable,
        ctx: HandlerContext,
    ) -> Result<Self::Handle, BindError>;
}
