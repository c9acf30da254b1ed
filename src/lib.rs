//! Client-side host library for brokering access to a local inference
//! engine subprocess: one shared engine lease, a binary IPC transport, a
//! chat prompt formatter, and a model registry, fronted by a small async
//! facade.
//!
//! Typical use:
//!
//! ```no_run
//! # async fn run() -> Result<(), pie_client::ClientError> {
//! use pie_client::{ChatParameters, Client, ClientConfig, Content, Interaction};
//!
//! let client = Client::connect(ClientConfig::new("/usr/local/bin/pie-engine".into()))?
//!     .with_default_model("llama-3");
//! let conversation = vec![Interaction { role: Some("user".to_owned()), content: Content::Text("hello".to_owned()) }];
//! let response = client.chat(None, &conversation, ChatParameters::default()).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod context;
mod error;
mod ipc_state;
mod management_bridge;
mod response;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use response::{ClientResponse, Usage};

pub use pie_formatter::conversation::{Content, Interaction, Part};
pub use pie_protocol::{ChatParameters, ClientDelta};
