mod dispatcher_config;
pub use dispatcher_config::{CallOptions, DispatcherConfig};

mod handler;
pub use handler::HandlerRegistry;

mod pending_call;

mod response_future;
pub use response_future::ResponseFuture;

mod dispatcher;
pub use dispatcher::Dispatcher;
