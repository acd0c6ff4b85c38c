//! Identity-preserving, cycle-safe graph codec.
//!
//! [`serialize`] flattens the graph reachable from a [`Value`] into a
//! sequence of [`Record`]s whose element 0 is the root; [`deserialize`]
//! rebuilds an equivalent graph. Shared references and cycles survive the
//! round trip, nominal types go through a caller-supplied [`Registry`], and
//! an [`IdentityMap`] carries object identity across calls for incremental
//! re-serialization and in-place patching.
//!
//! [`Value`]: knot_value::Value

pub mod collab;
pub mod config;
pub mod de;
pub mod error;
pub mod identity;
pub mod options;
pub mod record;
pub mod registry;
pub mod ser;
pub mod tag;

pub use collab::{AmbientConstructor, DescriptorCodec, ErrorCodec, NoAmbientTypes, TypeLookup, WellKnownTypes};
pub use config::{CodecConfig, ConfigError};
pub use de::deserialize;
pub use error::{CodecError, Result};
pub use identity::IdentityMap;
pub use options::{Convention, DeserializeOptions, Limits, Mode, SerializeOptions, UnknownTypes};
pub use record::{Entry, ErrorDescriptor, Literal, Payload, Record, Ref, Sentinel, StableId};
pub use registry::{ClassEntry, Constructor, DecodeHook, EncodeHook, Extension, HookPair, Projection, Registry};
pub use ser::serialize;
pub use tag::{Kind, Tag};
