//! The network collaborator boundary: outbound peer RPCs (`PeerTransport`),
//! broadhash consensus tracking (`Peers`), and batched outbound announcements
//! (`Broadcaster`).

mod broadcaster;
mod peers;
mod transport;

pub use broadcaster::Broadcaster;
pub use peers::Peers;
pub use transport::{PeerId, PeerInfo, PeerTransport};
