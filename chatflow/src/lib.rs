//! # Chatflow
//!
//! Chatflow executes conversational automations described as graphs of
//! typed nodes connected by named edges. A hosting service feeds it
//! inbound messages; the engine walks the graph one session at a time,
//! substituting variables, branching, calling external systems, and
//! suspending whenever a node needs a human reply.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chatflow::prelude::*;
//! use std::sync::Arc;
//!
//! # fn load_graph() -> FlowGraph { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = ExecutionContext::builder()
//!         .store(Arc::new(MemorySessionStore::new()))
//!         .channels(Arc::new(
//!             HttpChannels::new()
//!                 .with_whatsapp(WhatsAppClient::new("https://wa.example.com", "key")),
//!         ))
//!         .generator(Arc::new(OpenAiTextClient::new("sk-...")?))
//!         .http(Arc::new(ReqwestHttpClient::new()))
//!         .build()?;
//!
//!     let runner = FlowRunner::new(ctx);
//!     let graph = load_graph();
//!
//!     let mut session = Session::new("inst:5511999990000", ChannelContext::Whatsapp);
//!     session.set_pending_trigger("new-conversation");
//!     runner.start(&graph, &mut session).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! - **chatflow-types**: graph model, sessions, flow variables
//! - **chatflow-engine**: execution loop, substitution, condition evaluator
//! - **chatflow-channels**: WhatsApp/Chatwoot/Dialogy delivery
//! - **chatflow-ai**: text-generation capability
//! - **chatflow-persist**: session stores (in-memory, optional MongoDB)

pub use chatflow_ai as ai;
pub use chatflow_channels as channels;
pub use chatflow_engine as engine;
pub use chatflow_persist as persist;
pub use chatflow_types as types;

pub mod prelude;
