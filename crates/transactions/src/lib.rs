//! Transaction data model shared by the sources and the poller: lifecycle
//! statuses and their finality, the loosely-typed wire record, and the
//! strongly-typed local record produced at the boundary.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod de;
mod details;
mod error;
mod record;
mod status;

pub use details::{AmountInfo, FeeInfo, TransactionDetails, TransferPeer};
pub use error::DecodeError;
pub use record::{RawTransaction, TransactionRecord};
pub use status::TransactionStatus;
