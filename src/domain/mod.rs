// Domain layer: the document model and the ports the client is built against.

pub mod model;
pub mod ports;
