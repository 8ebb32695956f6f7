//! Protocol module containing the kernel event codes and the record codec.

pub mod codes;
pub mod record;

pub use codes::RecordKind;
pub use record::{decode_record, encode_record, RawRecord, RecordDecoder, RecordError, RecordLayout};
