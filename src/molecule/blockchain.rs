//! Canonical layouts for the on-chain blockchain types.

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    build_bytes, build_dynvec, build_fixvec, parse_bytes, parse_dynvec, parse_fixvec, parse_table,
    Entity, VerificationError, VerificationResult,
};
use crate::{
    fixed_hash::H256,
    types::{
        Capacity, CellDep, CellInput, CellOutput, DepType, OutPoint, Script, ScriptHashType,
        Transaction, WitnessArgs,
    },
};

fn parse_byte32(name: &'static str, slice: &[u8]) -> VerificationResult<H256> {
    H256::from_slice(slice)
        .map_err(|_| VerificationError::TotalSizeNotMatch(name, H256::SIZE, slice.len()))
}

fn parse_u32(name: &'static str, slice: &[u8]) -> VerificationResult<u32> {
    if slice.len() != 4 {
        return Err(VerificationError::TotalSizeNotMatch(name, 4, slice.len()));
    }
    let mut le = [0u8; 4];
    le.copy_from_slice(slice);
    Ok(u32::from_le_bytes(le))
}

fn parse_u64(name: &'static str, slice: &[u8]) -> VerificationResult<u64> {
    if slice.len() != 8 {
        return Err(VerificationError::TotalSizeNotMatch(name, 8, slice.len()));
    }
    let mut le = [0u8; 8];
    le.copy_from_slice(slice);
    Ok(u64::from_le_bytes(le))
}

impl Entity for Bytes {
    const NAME: &'static str = "Bytes";

    fn to_bytes(&self) -> Bytes {
        build_bytes(self)
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        parse_bytes(Self::NAME, slice).map(Bytes::copy_from_slice)
    }
}

impl Entity for Script {
    const NAME: &'static str = "Script";

    fn to_bytes(&self) -> Bytes {
        build_dynvec(&[
            Bytes::copy_from_slice(self.code_hash.as_bytes()),
            Bytes::copy_from_slice(&[self.hash_type.into()]),
            build_bytes(&self.args),
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 3)?;
        let code_hash = parse_byte32(Self::NAME, fields[0])?;
        if fields[1].len() != 1 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                1,
                fields[1].len(),
            ));
        }
        let hash_type = ScriptHashType::from_u8(fields[1][0]).ok_or_else(|| {
            VerificationError::InvalidData(
                Self::NAME,
                format!("unknown hash type {}", fields[1][0]),
            )
        })?;
        let args = Bytes::copy_from_slice(parse_bytes(Self::NAME, fields[2])?);
        Ok(Script {
            code_hash,
            hash_type,
            args,
        })
    }
}

impl Entity for OutPoint {
    const NAME: &'static str = "OutPoint";

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(36);
        buf.put_slice(self.tx_hash.as_bytes());
        buf.put_u32_le(self.index);
        buf.freeze()
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        if slice.len() != 36 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                36,
                slice.len(),
            ));
        }
        Ok(OutPoint {
            tx_hash: parse_byte32(Self::NAME, &slice[..32])?,
            index: parse_u32("Uint32", &slice[32..])?,
        })
    }
}

impl Entity for CellInput {
    const NAME: &'static str = "CellInput";

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(44);
        buf.put_u64_le(self.since);
        buf.put_slice(&self.previous_output.to_bytes());
        buf.freeze()
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        if slice.len() != 44 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                44,
                slice.len(),
            ));
        }
        Ok(CellInput {
            since: parse_u64("Uint64", &slice[..8])?,
            previous_output: OutPoint::from_slice(&slice[8..])?,
        })
    }
}

impl Entity for CellDep {
    const NAME: &'static str = "CellDep";

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(37);
        buf.put_slice(&self.out_point.to_bytes());
        buf.put_u8(self.dep_type.into());
        buf.freeze()
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        if slice.len() != 37 {
            return Err(VerificationError::TotalSizeNotMatch(
                Self::NAME,
                37,
                slice.len(),
            ));
        }
        let dep_type = DepType::from_u8(slice[36]).ok_or_else(|| {
            VerificationError::InvalidData(Self::NAME, format!("unknown dep type {}", slice[36]))
        })?;
        Ok(CellDep {
            out_point: OutPoint::from_slice(&slice[..36])?,
            dep_type,
        })
    }
}

impl Entity for CellOutput {
    const NAME: &'static str = "CellOutput";

    fn to_bytes(&self) -> Bytes {
        let type_ = match &self.type_ {
            Some(script) => script.to_bytes(),
            None => Bytes::new(),
        };
        build_dynvec(&[
            Bytes::copy_from_slice(&self.capacity.as_u64().to_le_bytes()),
            self.lock.to_bytes(),
            type_,
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 3)?;
        let capacity = Capacity::shannons(parse_u64("Uint64", fields[0])?);
        let lock = Script::from_slice(fields[1])?;
        let type_ = if fields[2].is_empty() {
            None
        } else {
            Some(Script::from_slice(fields[2])?)
        };
        Ok(CellOutput {
            capacity,
            lock,
            type_,
        })
    }
}

impl Entity for WitnessArgs {
    const NAME: &'static str = "WitnessArgs";

    fn to_bytes(&self) -> Bytes {
        let pack_opt = |field: &Option<Bytes>| match field {
            Some(data) => build_bytes(data),
            None => Bytes::new(),
        };
        build_dynvec(&[
            pack_opt(&self.lock),
            pack_opt(&self.input_type),
            pack_opt(&self.output_type),
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let fields = parse_table(Self::NAME, slice, 3)?;
        let parse_opt = |field: &[u8]| -> VerificationResult<Option<Bytes>> {
            if field.is_empty() {
                Ok(None)
            } else {
                parse_bytes(Self::NAME, field).map(|data| Some(Bytes::copy_from_slice(data)))
            }
        };
        Ok(WitnessArgs {
            lock: parse_opt(fields[0])?,
            input_type: parse_opt(fields[1])?,
            output_type: parse_opt(fields[2])?,
        })
    }
}

/// Packs the raw part of a transaction, the hashed portion that excludes
/// witnesses.
pub(crate) fn pack_raw_transaction(tx: &Transaction) -> Bytes {
    build_dynvec(&[
        Bytes::copy_from_slice(&tx.version.to_le_bytes()),
        build_fixvec(&tx.cell_deps.iter().map(Entity::to_bytes).collect::<Vec<_>>()),
        build_fixvec(
            &tx.header_deps
                .iter()
                .map(|hash| Bytes::copy_from_slice(hash.as_bytes()))
                .collect::<Vec<_>>(),
        ),
        build_fixvec(&tx.inputs.iter().map(Entity::to_bytes).collect::<Vec<_>>()),
        build_dynvec(&tx.outputs.iter().map(Entity::to_bytes).collect::<Vec<_>>()),
        build_dynvec(&tx.outputs_data.iter().map(|data| build_bytes(data)).collect::<Vec<_>>()),
    ])
}

impl Entity for Transaction {
    const NAME: &'static str = "Transaction";

    fn to_bytes(&self) -> Bytes {
        build_dynvec(&[
            pack_raw_transaction(self),
            build_dynvec(
                &self
                    .witnesses
                    .iter()
                    .map(|witness| build_bytes(witness))
                    .collect::<Vec<_>>(),
            ),
        ])
    }

    fn from_slice(slice: &[u8]) -> VerificationResult<Self> {
        let outer = parse_table(Self::NAME, slice, 2)?;
        let raw = parse_table("RawTransaction", outer[0], 6)?;
        let version = parse_u32("Uint32", raw[0])?;
        let cell_deps = parse_fixvec("CellDepVec", raw[1], 37)?
            .into_iter()
            .map(CellDep::from_slice)
            .collect::<VerificationResult<Vec<_>>>()?;
        let header_deps = parse_fixvec("Byte32Vec", raw[2], 32)?
            .into_iter()
            .map(|item| parse_byte32("Byte32", item))
            .collect::<VerificationResult<Vec<_>>>()?;
        let inputs = parse_fixvec("CellInputVec", raw[3], 44)?
            .into_iter()
            .map(CellInput::from_slice)
            .collect::<VerificationResult<Vec<_>>>()?;
        let outputs = parse_dynvec("CellOutputVec", raw[4])?
            .into_iter()
            .map(CellOutput::from_slice)
            .collect::<VerificationResult<Vec<_>>>()?;
        let outputs_data = parse_dynvec("BytesVec", raw[5])?
            .into_iter()
            .map(|item| parse_bytes("Bytes", item).map(Bytes::copy_from_slice))
            .collect::<VerificationResult<Vec<_>>>()?;
        let witnesses = parse_dynvec("BytesVec", outer[1])?
            .into_iter()
            .map(|item| parse_bytes("Bytes", item).map(Bytes::copy_from_slice))
            .collect::<VerificationResult<Vec<_>>>()?;
        Ok(Transaction {
            version,
            cell_deps,
            header_deps,
            inputs,
            outputs,
            outputs_data,
            witnesses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_script() -> Script {
        Script {
            code_hash: H256([0x35; 32]),
            hash_type: ScriptHashType::Type,
            args: Bytes::from_static(&[0x11; 20]),
        }
    }

    #[test]
    fn script_serialized_size() {
        // 16-byte table header + 32-byte code hash + 1-byte hash type
        // + (4 + 20)-byte args
        assert_eq!(sample_script().to_bytes().len(), 73);
    }

    #[test]
    fn witness_args_serialized_size() {
        let witness = WitnessArgs {
            lock: Some(Bytes::from(vec![0u8; 65])),
            input_type: None,
            output_type: None,
        };
        assert_eq!(witness.to_bytes().len(), 85);
        assert_eq!(WitnessArgs::default().to_bytes().len(), 16);
    }

    #[test]
    fn script_round_trip() {
        let script = sample_script();
        assert_eq!(Script::from_slice(&script.to_bytes()).unwrap(), script);
    }

    #[test]
    fn script_rejects_unknown_hash_type() {
        let mut packed = sample_script().to_bytes().to_vec();
        packed[16 + 32] = 9;
        assert!(matches!(
            Script::from_slice(&packed),
            Err(VerificationError::InvalidData(..))
        ));
    }

    #[test]
    fn transaction_rejects_truncation() {
        let tx = Transaction::default();
        let packed = tx.to_bytes();
        for cut in 1..packed.len() {
            assert!(Transaction::from_slice(&packed[..cut]).is_err());
        }
    }

    fn arb_bytes(max: usize) -> impl Strategy<Value = Bytes> {
        prop::collection::vec(any::<u8>(), 0..max).prop_map(Bytes::from)
    }

    fn arb_script() -> impl Strategy<Value = Script> {
        (any::<[u8; 32]>(), 0u8..3, arb_bytes(40)).prop_map(|(hash, ht, args)| Script {
            code_hash: H256(hash),
            hash_type: ScriptHashType::from_u8(ht).unwrap(),
            args,
        })
    }

    fn arb_out_point() -> impl Strategy<Value = OutPoint> {
        (any::<[u8; 32]>(), any::<u32>()).prop_map(|(hash, index)| OutPoint {
            tx_hash: H256(hash),
            index,
        })
    }

    fn arb_transaction() -> impl Strategy<Value = Transaction> {
        let cell_dep = (arb_out_point(), prop::bool::ANY).prop_map(|(out_point, group)| CellDep {
            out_point,
            dep_type: if group { DepType::DepGroup } else { DepType::Code },
        });
        let input = (arb_out_point(), any::<u64>()).prop_map(|(previous_output, since)| {
            CellInput {
                since,
                previous_output,
            }
        });
        let output = (any::<u64>(), arb_script(), prop::option::of(arb_script())).prop_map(
            |(capacity, lock, type_)| CellOutput {
                capacity: Capacity::shannons(capacity),
                lock,
                type_,
            },
        );
        (
            prop::collection::vec(cell_dep, 0..3),
            prop::collection::vec(any::<[u8; 32]>(), 0..3),
            prop::collection::vec(input, 0..4),
            prop::collection::vec((output, arb_bytes(16)), 0..4),
            prop::collection::vec(arb_bytes(100), 0..4),
        )
            .prop_map(|(cell_deps, header_deps, inputs, outputs, witnesses)| {
                let (outputs, outputs_data) = outputs.into_iter().unzip();
                Transaction {
                    version: 0,
                    cell_deps,
                    header_deps: header_deps.into_iter().map(H256).collect(),
                    inputs,
                    outputs,
                    outputs_data,
                    witnesses,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_script_round_trip(script in arb_script()) {
            prop_assert_eq!(Script::from_slice(&script.to_bytes()).unwrap(), script);
        }

        #[test]
        fn prop_witness_args_round_trip(
            lock in prop::option::of(arb_bytes(80)),
            input_type in prop::option::of(arb_bytes(16)),
            output_type in prop::option::of(arb_bytes(16)),
        ) {
            let witness = WitnessArgs { lock, input_type, output_type };
            prop_assert_eq!(WitnessArgs::from_slice(&witness.to_bytes()).unwrap(), witness);
        }

        #[test]
        fn prop_transaction_round_trip(tx in arb_transaction()) {
            prop_assert_eq!(Transaction::from_slice(&tx.to_bytes()).unwrap(), tx);
        }
    }
}
