//! Nervos DAO reward and unlock-time calculation.
//!
//! Pure functions over header fields; nothing here touches the chain. The
//! reward formula follows the consensus rule: the counted part of a deposit
//! (capacity above the occupied floor) grows with the ratio of the
//! accumulated rates (`AR`) between the deposit and withdraw headers, while
//! the occupied part earns nothing.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use thiserror::Error;

use crate::{
    constants::DAO_LOCK_PERIOD_EPOCHS,
    types::{Capacity, CapacityError, CellOutput, EpochNumberWithFraction, Since},
};

/// Errors from the DAO arithmetic.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DaoError {
    /// The withdraw header does not come after the deposit header.
    #[error("withdraw header must be newer than the deposit header")]
    InvalidWithdrawHeader,
    /// A capacity sum or ratio overflows `u64`.
    #[error("dao arithmetic overflow")]
    Overflow,
}

impl From<CapacityError> for DaoError {
    fn from(_: CapacityError) -> DaoError {
        DaoError::Overflow
    }
}

/// Extracts the accumulated rate from a header's 32-byte `dao` field.
pub fn extract_ar(dao: &[u8; 32]) -> u64 {
    LittleEndian::read_u64(&dao[8..16])
}

/// The maximum capacity a deposited cell can withdraw between the deposit
/// and withdraw headers.
///
/// Integer arithmetic throughout: the counted capacity is scaled by
/// `withdraw_ar / deposit_ar` in `u128` with truncating division, then the
/// occupied part is added back.
pub fn maximum_withdraw(
    output: &CellOutput,
    output_data: &Bytes,
    deposit_dao: &[u8; 32],
    withdraw_dao: &[u8; 32],
) -> Result<Capacity, DaoError> {
    let deposit_ar = extract_ar(deposit_dao);
    let withdraw_ar = extract_ar(withdraw_dao);

    let occupied = output.occupied_capacity(Capacity::bytes(output_data.len())?)?;
    let counted = output.capacity.safe_sub(occupied)?;
    let withdraw_counted =
        u128::from(counted.as_u64()) * u128::from(withdraw_ar) / u128::from(deposit_ar);
    let withdraw_counted = u64::try_from(withdraw_counted).map_err(|_| DaoError::Overflow)?;
    Capacity::shannons(withdraw_counted)
        .safe_add(occupied)
        .map_err(Into::into)
}

/// The interest part of [`maximum_withdraw`]: what the balance loop feeds in
/// as extra available capacity when claiming.
pub fn reward(
    output: &CellOutput,
    output_data: &Bytes,
    deposit_dao: &[u8; 32],
    withdraw_dao: &[u8; 32],
) -> Result<u64, DaoError> {
    let maximum = maximum_withdraw(output, output_data, deposit_dao, withdraw_dao)?;
    maximum
        .safe_sub(output.capacity)
        .map(Capacity::as_u64)
        .map_err(Into::into)
}

/// The earliest `since` a claim input may carry.
///
/// A deposit unlocks on a 180-epoch cycle: the deposited span is rounded up
/// to whole cycles and added to the deposit epoch, keeping the deposit
/// epoch's fraction.
pub fn minimum_since(
    deposit_epoch: EpochNumberWithFraction,
    withdraw_epoch: EpochNumberWithFraction,
) -> Since {
    let mut deposited_epochs = withdraw_epoch.number() - deposit_epoch.number();
    // a started fraction of an epoch counts as a whole one
    if withdraw_epoch.index() * deposit_epoch.length()
        > deposit_epoch.index() * withdraw_epoch.length()
    {
        deposited_epochs += 1;
    }
    let lock_epochs = deposited_epochs.div_ceil(DAO_LOCK_PERIOD_EPOCHS) * DAO_LOCK_PERIOD_EPOCHS;
    Since::new_absolute_epoch(EpochNumberWithFraction::new(
        deposit_epoch.number() + lock_epochs,
        deposit_epoch.index(),
        deposit_epoch.length(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixed_hash::H256,
        types::{Script, ScriptHashType},
    };

    fn dao_field(ar: u64) -> [u8; 32] {
        let mut dao = [0u8; 32];
        LittleEndian::write_u64(&mut dao[8..16], ar);
        dao
    }

    fn deposit_cell(capacity: u64) -> (CellOutput, Bytes) {
        let lock = Script::new(H256([1; 32]), ScriptHashType::Type, vec![0u8; 20].into());
        let type_ = Script::new(H256([2; 32]), ScriptHashType::Type, Bytes::new());
        (
            CellOutput::new(Capacity::shannons(capacity), lock, Some(type_)),
            Bytes::from(vec![0u8; 8]),
        )
    }

    #[test]
    fn withdraw_grows_with_ar() {
        let (output, data) = deposit_cell(1_000_000_000_000);
        let deposit = dao_field(10_000_000_000_000);
        let withdraw = dao_field(10_001_000_000_000);
        let maximum = maximum_withdraw(&output, &data, &deposit, &withdraw).unwrap();
        assert!(maximum >= output.capacity);
        let interest = reward(&output, &data, &deposit, &withdraw).unwrap();
        assert_eq!(maximum.as_u64() - output.capacity.as_u64(), interest);
        // occupied part (102 bytes) earns nothing; the rest grows by 1/10000
        let counted = 1_000_000_000_000 - 10_200_000_000;
        assert_eq!(interest, counted / 10_000);
    }

    #[test]
    fn same_ar_means_no_reward() {
        let (output, data) = deposit_cell(500_000_000_000);
        let dao = dao_field(10_000_000_000_000);
        assert_eq!(reward(&output, &data, &dao, &dao).unwrap(), 0);
        assert_eq!(
            maximum_withdraw(&output, &data, &dao, &dao).unwrap(),
            output.capacity
        );
    }

    #[test]
    fn minimum_since_rounds_up_to_cycles() {
        // deposit in epoch 5, withdraw in epoch 100: one cycle
        let since = minimum_since(
            EpochNumberWithFraction::new(5, 100, 1800),
            EpochNumberWithFraction::new(100, 100, 1800),
        );
        let epoch = EpochNumberWithFraction::from_full_value(since.value());
        assert_eq!(epoch.number(), 185);
        assert_eq!(epoch.index(), 100);
        assert_eq!(epoch.length(), 1800);

        // a started fraction pushes over the cycle boundary
        let since = minimum_since(
            EpochNumberWithFraction::new(5, 0, 1800),
            EpochNumberWithFraction::new(185, 1, 1800),
        );
        let epoch = EpochNumberWithFraction::from_full_value(since.value());
        assert_eq!(epoch.number(), 365);
    }
}
