//! Session synchronization for a server-rendered storefront.
//!
//! SYSTEM CONTEXT
//! ==============
//! A short-lived access credential and a long-lived refresh credential,
//! both carried in cookies, are shared by two runtime contexts:
//!
//! - the server rendering pass, which hydrates the session from the inbound
//!   request cookies before page code runs ([`hydrate`]), and
//! - the client runtime, which recovers from access expiry without failing
//!   in-flight calls ([`gateway`], [`refresh`]).
//!
//! Both contexts write into a [`session::SessionStore`]; the [`guard`] reads it
//! to protect authenticated views. [`runtime::SessionRuntime`] wires one
//! context together.

pub mod claims;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod hydrate;
pub mod refresh;
pub mod routes;
pub mod runtime;
pub mod session;
pub mod transport;

pub use error::{ApiError, ErrorClass, classify};
pub use gateway::{ApiGateway, ClientGateway, ServerGateway};
pub use guard::{GuardDecision, GuardState, RouteGuard};
pub use hydrate::{Hydration, HydrationBootstrapper};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use runtime::{RuntimeContext, SessionRuntime};
pub use session::{SessionRecord, SessionStore};
