//! HTTP automation gateway for the Power BI REST API.
//!
//! Exposes workspace, report and semantic-model operations as HTTP routes.
//! Every operation acquires a bearer token through the client-credentials
//! flow, issues one or more calls against the Power BI API, and translates
//! the upstream response (or error) into an outbound response.
//!
//! # Modules
//!
//! - `auth`: client-credentials token provider
//! - `configuration`: process settings and credential environment variables
//! - `error`: the operation error taxonomy
//! - `gateway`: bearer-authenticated upstream calls with typed outcomes
//! - `model`: inbound and upstream wire shapes
//! - `powerbi`: the per-capability operations and multi-step workflows
//! - `routes`: the axum inbound surface
//! - `sink`: destination for exported `.pbix` binaries

pub mod auth;
pub mod configuration;
pub mod error;
pub mod gateway;
pub mod model;
pub mod powerbi;
pub mod routes;
pub mod sink;
