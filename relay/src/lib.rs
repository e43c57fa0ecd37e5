// TagMirror relay service internals
pub mod drain;
pub mod gate;
pub mod mongo;
pub mod queue;
pub mod sink;
pub mod udp;
