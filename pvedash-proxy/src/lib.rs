//! PVEDash proxy : API REST lecture seule devant un cluster Proxmox VE.
//!
//! Les VMs et noeuds sont lus sur l'API du cluster à chaque requête,
//! renommés vers les formes exposées puis filtrés côté serveur.

pub mod config;
pub mod error;
pub mod filter;
pub mod health;
pub mod http;
pub mod labels;
pub mod models;
pub mod service;
pub mod upstream;

pub use config::{ConfigError, ProxyConfig, UpstreamConf};
pub use error::{ProxyError, UpstreamError};
pub use filter::{LabelFilter, VmFilter};
pub use models::{GuestDetail, GuestKind, GuestStatus, Host, VirtualMachine};
