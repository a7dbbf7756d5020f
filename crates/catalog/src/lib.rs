//! `stockroom-catalog` — product registry domain slice.
//!
//! Owns the product record and the validated commands that create and edit
//! it. Stock mutations caused by movements live in `stockroom-ledger`; a
//! direct stock overwrite through [`ProductPatch`] is an out-of-band
//! correction, not a transactional event.

pub mod product;

pub use product::{PatchFields, Product, ProductDraft, ProductFields, ProductPatch};
