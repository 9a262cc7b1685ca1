//! Well-known system-script constants.
//!
//! Code hashes and genesis dep cells for the scripts every CKB chain ships
//! with. Anyone-can-pay and omnilock are deployed per chain outside the
//! genesis block, so their handlers take deps explicitly; only their code
//! hashes are recorded here.

use lazy_static::lazy_static;

use crate::{
    fixed_hash::H256,
    types::{CellDep, DepType, OutPoint},
};

/// The transaction format version this crate produces.
pub const TX_VERSION: u32 = 0;

/// Byte length of a secp256k1 recoverable signature.
pub const SECP_SIGNATURE_SIZE: usize = 65;

/// Byte length of a blake160 key hash.
pub const BLAKE160_SIZE: usize = 20;

/// The DAO withdraw lock cycle, in epochs.
pub const DAO_LOCK_PERIOD_EPOCHS: u64 = 180;

/// Which chain the well-known constants refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkType {
    /// The main chain, "lina".
    Mainnet,
    /// The test chain, "aggron".
    Testnet,
}

lazy_static! {
    /// Code hash of the secp256k1-blake160 sighash-all lock.
    pub static ref CODE_HASH_SIGHASH_ALL: H256 =
        "9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8"
            .parse()
            .expect("parse code hash");
    /// Code hash of the secp256k1-blake160 multisig-all lock.
    pub static ref CODE_HASH_MULTISIG_ALL: H256 =
        "5c5069eb0857efc65e1bca0c07df34c31663b3622fd3876c876320fc9634e2a8"
            .parse()
            .expect("parse code hash");
    /// Code hash of the Nervos DAO type script.
    pub static ref CODE_HASH_DAO: H256 =
        "82d76d1b75fe2fd9a27dfbaa65a039221a380d76c926f378d3f81cf3e7e13f2e"
            .parse()
            .expect("parse code hash");
    /// Code hash of the anyone-can-pay lock, mainnet deployment.
    pub static ref CODE_HASH_ACP_MAINNET: H256 =
        "d369597ff47f29fbc0d47d2e3775370d1250b85140c670e4718af712983a2354"
            .parse()
            .expect("parse code hash");
    /// Code hash of the anyone-can-pay lock, testnet deployment.
    pub static ref CODE_HASH_ACP_TESTNET: H256 =
        "3419a1c09eb2567f6552ee7a8ecffd64155cffe0f1796e6e61ec088d740c1356"
            .parse()
            .expect("parse code hash");
    /// Code hash of the omnilock, mainnet deployment.
    pub static ref CODE_HASH_OMNILOCK_MAINNET: H256 =
        "9b819793a64463aed77c615d6cb226eea5487ccfc0783043a587254cda2b6f26"
            .parse()
            .expect("parse code hash");
    /// Code hash of the omnilock, testnet deployment.
    pub static ref CODE_HASH_OMNILOCK_TESTNET: H256 =
        "f329effd1c475a2978453c8600e1eaf0bc2087ee093c3ee64cc96ec6847752cb"
            .parse()
            .expect("parse code hash");

    static ref GENESIS_DEP_GROUP_TX_MAINNET: H256 =
        "71a7ba8fc96349fea0ed3a5c47992e3b4084b031a42264a018e0072e8172e46c"
            .parse()
            .expect("parse tx hash");
    static ref GENESIS_DEP_GROUP_TX_TESTNET: H256 =
        "f8de3bb47d055cdf460d93a2a6e1b05f7432f9777c8c474abf4eec1d4aee5d37"
            .parse()
            .expect("parse tx hash");
    static ref GENESIS_TX_MAINNET: H256 =
        "e2fb199810d49a4d8beec56718ba2593b665db9d52299a0f9e6e75416d73ff5c"
            .parse()
            .expect("parse tx hash");
    static ref GENESIS_TX_TESTNET: H256 =
        "8f8c79eb6671709633fe6a46de93c0fedc9c1b8a6527a18d3983879542635c9f"
            .parse()
            .expect("parse tx hash");
}

/// The genesis dep group expanding to the sighash-all lock and its deps.
pub fn sighash_dep(network: NetworkType) -> CellDep {
    let tx_hash = match network {
        NetworkType::Mainnet => *GENESIS_DEP_GROUP_TX_MAINNET,
        NetworkType::Testnet => *GENESIS_DEP_GROUP_TX_TESTNET,
    };
    CellDep::new(OutPoint::new(tx_hash, 0), DepType::DepGroup)
}

/// The genesis dep group expanding to the multisig-all lock and its deps.
pub fn multisig_dep(network: NetworkType) -> CellDep {
    let tx_hash = match network {
        NetworkType::Mainnet => *GENESIS_DEP_GROUP_TX_MAINNET,
        NetworkType::Testnet => *GENESIS_DEP_GROUP_TX_TESTNET,
    };
    CellDep::new(OutPoint::new(tx_hash, 1), DepType::DepGroup)
}

/// The genesis code cell of the Nervos DAO type script.
pub fn dao_dep(network: NetworkType) -> CellDep {
    let tx_hash = match network {
        NetworkType::Mainnet => *GENESIS_TX_MAINNET,
        NetworkType::Testnet => *GENESIS_TX_TESTNET,
    };
    CellDep::new(OutPoint::new(tx_hash, 2), DepType::Code)
}

/// The anyone-can-pay code hash for `network`.
pub fn acp_code_hash(network: NetworkType) -> H256 {
    match network {
        NetworkType::Mainnet => *CODE_HASH_ACP_MAINNET,
        NetworkType::Testnet => *CODE_HASH_ACP_TESTNET,
    }
}

/// The omnilock code hash for `network`.
pub fn omnilock_code_hash(network: NetworkType) -> H256 {
    match network {
        NetworkType::Mainnet => *CODE_HASH_OMNILOCK_MAINNET,
        NetworkType::Testnet => *CODE_HASH_OMNILOCK_TESTNET,
    }
}
