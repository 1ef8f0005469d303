pub use net_types::{NetError, NetResult};
