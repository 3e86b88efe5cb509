//! Streaming machinery for driftlog files.
//!
//! Producers push typed values into channel writers; a writer multiplexes
//! many channels into one append-only stream of marker-aligned frames.
//! Readers demultiplex, decode, and can time-locate any point in historical
//! data:
//!
//! ```text
//! bytes -> Scanner (frame-aligned) -> Framing + Envelope -> codec -> Value
//! ```
//!
//! The pieces, leaves first:
//!
//! - [`PeekStream`]: buffered input with record/rewind for speculative reads
//! - [`Scanner`]: marker-resync byte stream exposing frame boundaries
//! - [`Seeker`]: scanner over a seekable stream, with [`SeekScan::seek_time`]
//!   time bisection
//! - [`Codec`]/[`CodecRegistry`]: uniform payload codec interface, looked up
//!   by encoding string
//! - [`ChannelWriter`]/[`ChannelReader`]: single-channel framing with
//!   keyframe/delta interleaving
//! - [`MultiChannelWriter`]/[`MultiChannelReader`]: routing across channels
//! - [`Filter`]: glob predicates over `(application, channel)`
//! - [`ScannerGroup`]/[`SeekerGroup`]: time-ordered merge across inputs
//!
//! Everything here is single-threaded and blocking; a reader or writer must
//! not be shared across threads.

mod bisect;
pub mod codec;
mod error;
mod filter;
mod group;
mod host;
pub mod json;
mod multichannel;
mod peek;
mod reader;
mod scanner;
mod seeker;
mod writer;

pub use codec::{Binary, Codec, CodecFactory, CodecRegistry, PlainText, Value, ValueKind};
pub use error::{Result, StreamError};
pub use filter::{ChannelPattern, Filter, FilterScanner, FilterSeeker};
pub use group::{ScannerGroup, SeekerGroup};
pub use host::{FixedHostName, HostName, SystemHostName};
pub use multichannel::{MultiChannelReader, MultiChannelWriter};
pub use peek::PeekStream;
pub use reader::{ChannelPathReader, ChannelReader};
pub use scanner::{PathScanner, Scan, Scanner};
pub use seeker::{PathSeeker, SeekScan, Seeker};
pub use writer::{ChannelPathWriter, ChannelWriter};
