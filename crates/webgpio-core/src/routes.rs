//! Control route table.
//!
//! Routes are registered on a [`RouteTableBuilder`] before the server starts
//! and frozen into a [`RouteTable`], which has no mutation API. The server
//! matches on method and exact path; anything else falls through to the
//! server's own not-found behaviour.
//!
//! # Endpoints
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/` | index page (`/index.html`, `text/html`) |
//! | GET | `/styling.css` | stylesheet (`text/css`) |
//! | GET | `/index.js` | script (`application/javascript`) |
//! | POST or GET | `/gpio/on` | actuator ON, 204 |
//! | POST or GET | `/gpio/off` | actuator OFF, 204 |

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actuator::Level;

/// HTTP methods used by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flash-resident asset served verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticResource {
    /// Path relative to the filesystem mount root.
    pub path: &'static str,
    pub content_type: &'static str,
}

pub const INDEX_PAGE: StaticResource = StaticResource {
    path: "/index.html",
    content_type: "text/html",
};

pub const STYLESHEET: StaticResource = StaticResource {
    path: "/styling.css",
    content_type: "text/css",
};

pub const SCRIPT: StaticResource = StaticResource {
    path: "/index.js",
    content_type: "application/javascript",
};

/// What a matched route does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Read the resource from flash and return it.
    Static(StaticResource),
    /// Drive the actuator and return 204.
    Actuator(Level),
}

/// One immutable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: &'static str,
    pub handler: Handler,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Route {method} {path} is already registered")]
    Duplicate { method: Method, path: &'static str },

    #[error("Route path {0:?} must start with '/'")]
    InvalidPath(&'static str),
}

/// Collects routes before the server starts.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. Each method/path pair may be registered once.
    pub fn register(
        &mut self,
        method: Method,
        path: &'static str,
        handler: Handler,
    ) -> Result<&mut Self, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path));
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.method == method && entry.path == path)
        {
            return Err(RouteError::Duplicate { method, path });
        }

        self.entries.push(RouteEntry {
            method,
            path,
            handler,
        });
        Ok(self)
    }

    /// Freeze the table. No routes can be added afterwards.
    pub fn build(self) -> RouteTable {
        RouteTable {
            entries: self.entries.into(),
        }
    }
}

/// Frozen, cheaply clonable route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Arc<[RouteEntry]>,
}

impl RouteTable {
    /// Routes of the device control surface.
    ///
    /// `gpio_method` selects the method accepted by the actuator routes.
    pub fn control(gpio_method: Method) -> Self {
        let mut builder = RouteTableBuilder::new();
        let routes = [
            (gpio_method, "/gpio/on", Handler::Actuator(Level::On)),
            (gpio_method, "/gpio/off", Handler::Actuator(Level::Off)),
            (Method::Get, "/", Handler::Static(INDEX_PAGE)),
            (Method::Get, "/index.js", Handler::Static(SCRIPT)),
            (Method::Get, "/styling.css", Handler::Static(STYLESHEET)),
        ];
        for (method, path, handler) in routes {
            let registered = builder.register(method, path, handler);
            debug_assert!(registered.is_ok(), "{:?}", registered.err());
        }
        builder.build()
    }

    /// Find the route for an exact method and path.
    pub fn lookup(&self, method: Method, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.method == method && entry.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
