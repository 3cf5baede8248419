mod node_config;
pub use node_config::NodeConfig;

mod node;
pub use node::Node;
