pub mod channel;
pub mod error;
pub mod network;
pub mod routing;
pub mod settlement;

pub use channel::{Channel, ChannelId, FeePolicy, NodeId, Side};
pub use error::{NetworkError, PaymentError, RouteError};
pub use network::{ChannelState, Network, NetworkSnapshot, Node};
pub use routing::{Hop, Route};
pub use settlement::{PayError, Settlement};
