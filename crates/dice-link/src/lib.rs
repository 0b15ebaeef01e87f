//! `dice-link` — keeps a serial-over-Bluetooth link to each die alive.
//!
//! Each die carries a Bluetooth-serial radio. The OS binds the radio's
//! hardware address to an rfcomm slot, and a `picocom` subprocess attached
//! to `/dev/rfcomm<slot>` streams the rolled sides. Radios drop, bindings
//! fail, and payloads arrive malformed; this crate recovers from all of it
//! without operator intervention.
//!
//! # Architecture
//!
//! ```text
//! DieConfig (address + rfcomm slot)
//!     │
//!     ▼
//! Transport       ← rfcomm bind/release + picocom spawn (trait seam)
//!     │
//!     ▼
//! SerialChannel   ← merged stdout-chunk / stderr-line event stream
//!     │
//!     ▼
//! DeviceSupervisor ← per-die task: bind → connect → supervise → restart
//!     │
//!     ▼
//! LinkEvent        ← Connected / Disconnected / SideChanged, broadcast
//! ```

pub mod channel;
pub mod decode;
pub mod error;
pub mod supervisor;
pub mod transport;

pub use channel::{ChannelEvent, SerialChannel};
pub use decode::decode_side;
pub use error::LinkError;
pub use supervisor::{DeviceSupervisor, LinkEvent, SupervisorOptions};
pub use transport::{RfcommTransport, Transport};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LinkError>;
