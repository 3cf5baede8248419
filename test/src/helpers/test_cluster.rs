use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use log::debug;
use tokio::task::JoinHandle;

use cohort_node::{HandlerRegistry, Node, NodeConfig};
use cohort_shared::{HandlerTag, Member, ViewId};

use crate::{helpers::RecordingApplication, local_hub::LocalHub};

/// Handler answering with the request body
pub const ECHO: HandlerTag = 1;
/// Handler that always fails
pub const FAIL: HandlerTag = 2;

const BASE_PORT: u16 = 7800;

pub struct TestNode {
    pub node: Arc<Node>,
    pub app: Arc<RecordingApplication>,
    tasks: Vec<JoinHandle<()>>,
}

/// A group of nodes wired through one `LocalHub`, each with a pump task
/// feeding it frames and a sweeper. Must be created inside a tokio runtime.
pub struct TestCluster {
    hub: Arc<LocalHub>,
    nodes: Vec<TestNode>,
}

impl TestCluster {
    pub fn new(size: usize) -> Self {
        Self::with_config(size, NodeConfig::default())
    }

    pub fn with_config(size: usize, config: NodeConfig) -> Self {
        let hub = LocalHub::new();
        let nodes = (0..size)
            .map(|index| Self::start_node(&hub, Self::member_at(index), config.clone()))
            .collect();
        Self { hub, nodes }
    }

    pub fn member_at(index: usize) -> Member {
        Member::new(([127, 0, 0, 1], BASE_PORT + index as u16).into())
    }

    pub fn hub(&self) -> &Arc<LocalHub> {
        &self.hub
    }

    pub fn member(&self, index: usize) -> Member {
        *self.nodes[index].node.local()
    }

    pub fn members(&self, indices: &[usize]) -> Vec<Member> {
        indices.iter().map(|index| self.member(*index)).collect()
    }

    pub fn node(&self, index: usize) -> &Arc<Node> {
        &self.nodes[index].node
    }

    pub fn app(&self, index: usize) -> &Arc<RecordingApplication> {
        &self.nodes[index].app
    }

    /// Installs the view made of `indices` on each of those nodes
    pub fn install_view(&self, view_id: ViewId, indices: &[usize]) {
        self.install_view_on(indices, view_id, indices);
    }

    /// Installs the view made of `indices` on the nodes in `on` only
    pub fn install_view_on(&self, on: &[usize], view_id: ViewId, indices: &[usize]) {
        let members = self.members(indices);
        for index in on {
            self.node(*index)
                .on_view_change(members.clone(), view_id)
                .unwrap();
        }
    }

    /// Lets every queued frame reach its node, including frames sent in
    /// reaction to other frames
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn start_node(hub: &Arc<LocalHub>, member: Member, config: NodeConfig) -> TestNode {
        let app = Arc::new(RecordingApplication::new());
        let mut handlers = HandlerRegistry::new();
        handlers.register(ECHO, |_, body| Ok(body)).unwrap();
        handlers
            .register(FAIL, |from, _: Bytes| Err(format!("refusing {}", from)))
            .unwrap();

        let node = Arc::new(Node::new(
            member,
            config,
            hub.link(member),
            app.clone(),
            handlers,
        ));

        let mut inbound = hub.attach(member);
        let pump_node = node.clone();
        let pump = tokio::spawn(async move {
            while let Some((sender, frame)) = inbound.recv().await {
                if let Err(error) = pump_node.on_packet(sender, &frame) {
                    debug!("{} rejected frame from {}: {}", member, sender, error);
                }
            }
        });
        let sweeper = node.spawn_sweeper();

        TestNode {
            node,
            app,
            tasks: vec![pump, sweeper],
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        for node in &self.nodes {
            for task in &node.tasks {
                task.abort();
            }
        }
    }
}
