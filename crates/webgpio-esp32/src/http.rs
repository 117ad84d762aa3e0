//! Control server on `EspHttpServer`.
//!
//! Every route table entry is registered as an exact-URI handler. The
//! server's own URI matcher answers anything else with 404.

use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method as EspMethod;
use esp_idf_svc::io::Write;
use log::info;

use webgpio_core::config::HttpConfig;
use webgpio_core::error::BindError;
use webgpio_core::handlers::{self, Response};
use webgpio_core::{ControlServer, HandlerContext, Method, RouteTable};

#[derive(Debug, Default)]
pub struct EspControlServer;

impl ControlServer for EspControlServer {
    type Handle = EspHttpServer<'static>;

    fn start(
        &mut self,
        config: &HttpConfig,
        routes: RouteTable,
        ctx: HandlerContext,
    ) -> Result<EspHttpServer<'static>, BindError> {
        let bind_error = |reason: String| BindError {
            port: config.port,
            reason,
        };

        let server_config = Configuration {
            http_port: config.port,
            max_open_sockets: config.max_open_sockets,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&server_config).map_err(|e| bind_error(e.to_string()))?;

        for entry in &routes {
            let handler = entry.handler;
            let ctx = ctx.clone();
            server
                .fn_handler(entry.path, esp_method(entry.method), move |req| {
                    let response = handlers::handle(&handler, &ctx);
                    send(req, response)
                })
                .map_err(|e| bind_error(format!("registering {}: {}", entry.path, e)))?;
            info!("Registered {} {}", entry.method, entry.path);
        }

        Ok(server)
    }
}

fn esp_method(method: Method) -> EspMethod {
    match method {
        Method::Get => EspMethod::Get,
        Method::Post => EspMethod::Post,
    }
}

fn send(
    req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection<'_>>,
    response: Response,
) -> anyhow::Result<()> {
    let content_type;
    let headers: &[(&str, &str)] = match response.content_type {
        Some(value) => {
            content_type = [("Content-Type", value)];
            &content_type
        }
        None => &[],
    };
    let mut resp = req.into_response(response.status, None, headers)?;
    resp.write_all(&response.body)?;
    Ok(())
}
