//! Parameter encoder.
//!
//! Builds request parcels byte-for-byte in the layout the remote stub
//! unmarshals, and reads reply parcels back.
//!
//! ```text
//! +------------------+-----------------+------------------+-----+
//! | interface header | interface token |      arg 0       | ... |
//! | (policy, ws,     | (String16)      | (per-kind layout)|     |
//! |  'SYST')         |                 |                  |     |
//! +------------------+-----------------+------------------+-----+
//! ```

mod arg;
mod parcelable;
mod reader;
mod writer;

pub use arg::{encode, Arg, ArgKind, EncodeFn, TextMode};
pub use parcelable::{Account, ComponentName, ParcelUuid, Parcelable, RawParcelable, Uri};
pub use reader::ParcelReader;
pub use writer::Parcel;
