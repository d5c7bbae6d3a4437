#![no_std]

extern crate alloc;

pub mod asset;
pub mod codec;
pub mod commitment;
pub mod error;
pub mod file;
pub mod meta;
pub mod mssmt;
pub mod proof;
pub mod tlv;

pub use codec::{is_proof_file, is_single_proof, FileVersion, TransitionVersion};
pub use error::Error;
pub use file::File;
pub use proof::Proof;
