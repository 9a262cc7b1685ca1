//! Transaction construction, fee balancing and signing for CKB.
//!
//! The crate covers the path from live cells to a broadcastable transaction:
//!
//! - a hand-implemented [Molecule](molecule) codec for every on-chain type,
//!   used both for transaction hashing and for byte-exact fee estimation;
//! - the core data model ([`types`]): scripts, cells, transactions, witness
//!   arguments and script groups;
//! - a [transaction builder](transaction) that partitions inputs/outputs into
//!   script groups, lets pluggable script handlers pre-fill witness
//!   placeholders and cell deps, and runs a greedy cell-selection loop until
//!   capacity covers outputs plus fee;
//! - a [signer registry](transaction::signer) producing valid witnesses for
//!   sighash, multisig, anyone-can-pay and omnilock scripts;
//! - the [Nervos DAO calculator](dao) for withdraw rewards and unlock times.
//!
//! JSON-RPC plumbing and the textual address encoding are deliberately out of
//! scope; callers hand in decoded [`Address`](address::Address)es and a
//! live-cell iterator.

mod fixed_hash;

pub mod address;
pub mod constants;
pub mod crypto;
pub mod dao;
pub mod hash;
pub mod molecule;
pub mod transaction;
pub mod types;

pub use fixed_hash::{FromSliceError, FromStrError, H160, H256};
