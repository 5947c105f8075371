//! Lark (Feishu) open platform integration.
//!
//! - `client`: HTTP calls (token, instance listing, instance detail, contact user)
//! - `models`: response envelopes and validated record shapes

pub mod client;
pub mod models;

pub use client::{AccessToken, LarkClient, LarkClientError};
pub use models::{InstanceDetail, RemoteInstance, RemoteUser, TransformError};
