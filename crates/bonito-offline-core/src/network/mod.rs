//! Network access for the cache manager.
//!
//! This module provides the request/response types exchanged with the
//! application shell, the `Fetcher` trait the strategies use to reach the
//! network, and `HttpFetcher`, its `reqwest` implementation.
//!
//! Every network attempt carries an explicit timeout; a timeout is reported
//! as a transport failure so strategies can fall back to the cache.

pub mod client;
pub mod error;
pub mod message;

pub use client::{Fetcher, HttpFetcher};
pub use error::FetchError;
pub use message::{Destination, Request, Response};
pub use reqwest::{Method, Url};
