use crate::http::HttpCapability;
use anyhow::{anyhow, Result};
use chatflow_ai::TextGenerator;
use chatflow_channels::ChannelSender;
use chatflow_persist::SessionStore;
use chatflow_types::WorkspaceChannels;
use std::sync::Arc;

/// Capabilities and workspace linkage one execution-loop invocation runs
/// against. Cheap to clone; the graph itself is passed per run.
#[derive(Clone)]
pub struct ExecutionContext {
    pub store: Arc<dyn SessionStore>,
    pub channels: Arc<dyn ChannelSender>,
    pub generator: Arc<dyn TextGenerator>,
    pub http: Arc<dyn HttpCapability>,
    pub workspace: WorkspaceChannels,
}

impl ExecutionContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }
}

/// Builder for an [`ExecutionContext`]; every capability is required.
pub struct ContextBuilder {
    store: Option<Arc<dyn SessionStore>>,
    channels: Option<Arc<dyn ChannelSender>>,
    generator: Option<Arc<dyn TextGenerator>>,
    http: Option<Arc<dyn HttpCapability>>,
    workspace: WorkspaceChannels,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            channels: None,
            generator: None,
            http: None,
            workspace: WorkspaceChannels::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn channels(mut self, channels: Arc<dyn ChannelSender>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn http(mut self, http: Arc<dyn HttpCapability>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn workspace(mut self, workspace: WorkspaceChannels) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn build(self) -> Result<ExecutionContext> {
        Ok(ExecutionContext {
            store: self.store.ok_or_else(|| anyhow!("session store is required"))?,
            channels: self
                .channels
                .ok_or_else(|| anyhow!("channel sender is required"))?,
            generator: self
                .generator
                .ok_or_else(|| anyhow!("text generator is required"))?,
            http: self.http.ok_or_else(|| anyhow!("http capability is required"))?,
            workspace: self.workspace,
        })
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
