//! Sakura Cloud adapter for sakuraform
//!
//! Implements the engine's provider traits over the Sakura Cloud REST API:
//!
//! - [`NosqlApi`]: NoSQL database appliances ([`ApplianceApi`](sakuraform_cloud::ApplianceApi))
//! - [`InternetApi`]: Internet routers and their subnets
//!   ([`SharedParentApi`](sakuraform_cloud::SharedParentApi))
//!
//! # Requirements
//!
//! - An API key pair in `SAKURACLOUD_ACCESS_TOKEN` and
//!   `SAKURACLOUD_ACCESS_TOKEN_SECRET`
//!
//! # Example
//!
//! ```ignore
//! use sakuraform_cloud::ApplianceOrchestrator;
//! use sakuraform_cloud_sakura::{ClientConfig, NosqlApi, SakuraClient};
//!
//! let client = SakuraClient::new(ClientConfig::from_env()?.with_zone("tk1b"));
//! let nosql = ApplianceOrchestrator::new(NosqlApi::new(client)).with_resource_name("NoSQL");
//! let state = nosql.create(&spec).await?;
//! ```

pub mod client;
pub mod error;
pub mod internet;
pub mod nosql;

pub use client::{ClientConfig, DEFAULT_API_ROOT_URL, DEFAULT_ZONE, SakuraClient};
pub use error::{Result, SakuraError};
pub use internet::InternetApi;
pub use nosql::NosqlApi;
