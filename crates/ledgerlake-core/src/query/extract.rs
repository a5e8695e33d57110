//! Per-ledger extraction of transaction and event records.
//!
//! Every metadata version is reduced to one ordered envelope list that is
//! paired by index with the ledger's `tx_processing` results:
//!
//! ```text
//! V0  tx_set.txs ─────────────────────────────────────────────┐
//! V1/V2 phases ─┬─ V0 components ─ txs ───────────────────────┼─▶ envelopes[i] ⇄ tx_processing[i]
//!               └─ V1 stages ─ clusters ─ txs ────────────────┘
//! ```

use crate::error::LakeError;
use crate::meta::{
    BatchCodec, ContractEvent, ContractEventType, GeneralizedTransactionSet, LedgerCloseMeta,
    TransactionEnvelope, TransactionEventStage, TransactionMeta, TransactionPhase,
    TransactionResultMeta, WireValue,
};
use crate::records::{EventRecord, TransactionRecord};

use super::filter::{EventFilter, TransactionFilter};

/// All envelopes of a ledger in result order.
pub fn envelopes(meta: &LedgerCloseMeta) -> Vec<&TransactionEnvelope> {
    match meta {
        LedgerCloseMeta::V0(m) => m.tx_set.txs.iter().collect(),
        LedgerCloseMeta::V1(m) => flatten(&m.tx_set),
        LedgerCloseMeta::V2(m) => flatten(&m.tx_set),
    }
}

fn flatten(set: &GeneralizedTransactionSet) -> Vec<&TransactionEnvelope> {
    let mut out = Vec::new();
    for phase in &set.phases {
        match phase {
            TransactionPhase::V0(components) => {
                for component in components {
                    out.extend(component.txs.iter());
                }
            }
            TransactionPhase::V1(parallel) => {
                for stage in &parallel.execution_stages {
                    for cluster in &stage.clusters {
                        out.extend(cluster.txs.iter());
                    }
                }
            }
        }
    }
    out
}

/// Envelopes paired by index with their results. Fails if the counts differ.
pub fn paired(
    meta: &LedgerCloseMeta,
) -> Result<Vec<(&TransactionEnvelope, &TransactionResultMeta)>, LakeError> {
    let envelopes = envelopes(meta);
    let results = meta.tx_processing();
    if envelopes.len() != results.len() {
        return Err(LakeError::ResultCountMismatch {
            ledger: meta.ledger_sequence(),
            envelopes: envelopes.len(),
            results: results.len(),
        });
    }
    Ok(envelopes.into_iter().zip(results).collect())
}

/// Transactions of one ledger passing `filter`, in apply order.
pub fn transactions(
    meta: &LedgerCloseMeta,
    filter: &TransactionFilter,
    codec: &dyn BatchCodec,
) -> Result<Vec<TransactionRecord>, LakeError> {
    let header = meta.header();
    let mut out = Vec::new();
    for (index, (envelope, processed)) in paired(meta)?.into_iter().enumerate() {
        let pair = &processed.result;
        let successful = pair.result.code.is_success();
        if !filter.matches(envelope, successful) {
            continue;
        }
        out.push(TransactionRecord {
            hash: hex::encode(pair.transaction_hash),
            ledger_sequence: header.ledger_seq,
            ledger_close_time: header.close_time,
            source_account: envelope.source_account().to_string(),
            fee_charged: pair.result.fee_charged,
            max_fee: envelope.max_fee(),
            operation_count: envelope.operations().len() as u32,
            successful,
            application_order: index as u32 + 1,
            fee_bump: envelope.is_fee_bump(),
            envelope: encode(codec, WireValue::Envelope(envelope))?,
            result: encode(codec, WireValue::Result(pair))?,
            result_meta: encode(codec, WireValue::Meta(&processed.tx_apply_processing))?,
        });
    }
    Ok(out)
}

fn encode(codec: &dyn BatchCodec, value: WireValue<'_>) -> Result<Vec<u8>, LakeError> {
    codec.encode(value).map_err(|source| LakeError::Encode {
        what: value.name(),
        source,
    })
}

/// Events of one ledger passing `filter`.
///
/// Order per transaction: primary events (for V4, transaction events staged
/// before all transactions, then operation events, then the remaining
/// transaction events), followed by diagnostic events. The primary
/// collections contribute only contract and system events and the
/// diagnostic collection only diagnostic ones, so no event is emitted twice.
pub fn events(meta: &LedgerCloseMeta, filter: &EventFilter) -> Vec<EventRecord> {
    let header = meta.header();
    let mut out = Vec::new();
    if matches!(meta, LedgerCloseMeta::V0(_)) {
        return out;
    }
    let diagnostics = filter.scans_diagnostics();

    for processed in meta.tx_processing() {
        let successful = processed.result.result.code.is_success();
        let mut sink = Sink {
            filter,
            out: &mut out,
            ledger_sequence: header.ledger_seq,
            ledger_close_time: header.close_time,
            transaction_hash: hex::encode(processed.result.transaction_hash),
            transaction_successful: successful,
        };

        match &processed.tx_apply_processing {
            TransactionMeta::V2(_) => {}
            TransactionMeta::V3(m) => {
                let Some(soroban) = &m.soroban_meta else {
                    continue;
                };
                for event in &soroban.events {
                    sink.primary(event, None);
                }
                if diagnostics {
                    for d in &soroban.diagnostic_events {
                        sink.diagnostic(&d.event, d.in_successful_contract_call);
                    }
                }
            }
            TransactionMeta::V4(m) => {
                let (before, after): (Vec<_>, Vec<_>) = m
                    .events
                    .iter()
                    .partition(|e| e.stage == TransactionEventStage::BeforeAllTxs);
                for e in before {
                    sink.primary(&e.event, None);
                }
                for (index, op) in m.operations.iter().enumerate() {
                    for event in &op.events {
                        sink.primary(event, Some(index as u32));
                    }
                }
                for e in after {
                    sink.primary(&e.event, None);
                }
                if diagnostics {
                    for d in &m.diagnostic_events {
                        sink.diagnostic(&d.event, d.in_successful_contract_call);
                    }
                }
            }
        }
    }
    out
}

struct Sink<'a> {
    filter: &'a EventFilter,
    out: &'a mut Vec<EventRecord>,
    ledger_sequence: u32,
    ledger_close_time: u64,
    transaction_hash: String,
    transaction_successful: bool,
}

impl Sink<'_> {
    fn primary(&mut self, event: &ContractEvent, operation_index: Option<u32>) {
        if event.kind != ContractEventType::Diagnostic {
            self.push(event, operation_index, self.transaction_successful);
        }
    }

    fn diagnostic(&mut self, event: &ContractEvent, in_successful_contract_call: bool) {
        if event.kind == ContractEventType::Diagnostic {
            self.push(event, None, in_successful_contract_call);
        }
    }

    fn push(
        &mut self,
        event: &ContractEvent,
        operation_index: Option<u32>,
        in_successful_contract_call: bool,
    ) {
        if !self.filter.matches(event) {
            return;
        }
        self.out.push(EventRecord {
            ledger_sequence: self.ledger_sequence,
            ledger_close_time: self.ledger_close_time,
            transaction_hash: self.transaction_hash.clone(),
            contract_id: event.contract_id.clone().unwrap_or_default(),
            kind: event.kind,
            topics: event.topics.clone(),
            value: event.data.clone(),
            operation_index,
            in_successful_contract_call,
            transaction_successful: self.transaction_successful,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{
        BorshBatchCodec, DependentTxCluster, DiagnosticEvent, LedgerCloseMetaV0,
        LedgerCloseMetaV1, LedgerCloseMetaV2, LedgerHeader, OperationBody, OperationMetaV2,
        ParallelTxExecutionStage, ParallelTxsComponent, ScVal, SorobanTransactionMeta,
        Transaction, TransactionEvent, TransactionMetaV2, TransactionMetaV3, TransactionMetaV4,
        TransactionResult, TransactionResultCode, TransactionResultPair, TransactionSet,
        TxSetComponent, Operation,
    };

    fn header(seq: u32) -> LedgerHeader {
        LedgerHeader {
            ledger_seq: seq,
            close_time: 1_700_000_000 + seq as u64,
            protocol_version: 22,
            previous_ledger_hash: [0; 32],
            hash: [0; 32],
        }
    }

    fn tx(source: &str) -> TransactionEnvelope {
        TransactionEnvelope::Tx(Transaction {
            source_account: source.into(),
            fee: 100,
            seq_num: 1,
            memo: None,
            operations: vec![Operation {
                source_account: None,
                body: OperationBody::RestoreFootprint,
            }],
            signatures: vec![],
        })
    }

    fn result(tag: u8, ok: bool, meta: TransactionMeta) -> TransactionResultMeta {
        TransactionResultMeta {
            result: TransactionResultPair {
                transaction_hash: [tag; 32],
                result: TransactionResult {
                    fee_charged: 100,
                    code: if ok {
                        TransactionResultCode::Success
                    } else {
                        TransactionResultCode::Failed
                    },
                },
            },
            fee_processing: vec![],
            tx_apply_processing: meta,
        }
    }

    fn classic() -> TransactionMeta {
        TransactionMeta::V2(TransactionMetaV2::default())
    }

    fn event(kind: ContractEventType, topic: &str) -> ContractEvent {
        ContractEvent {
            contract_id: Some("C1".into()),
            kind,
            topics: vec![ScVal::Symbol(topic.into())],
            data: ScVal::U32(1),
        }
    }

    fn gset(phases: Vec<TransactionPhase>) -> GeneralizedTransactionSet {
        GeneralizedTransactionSet {
            previous_ledger_hash: [0; 32],
            phases,
        }
    }

    #[test]
    fn legacy_pairs_by_index_and_has_no_events() {
        let meta = LedgerCloseMeta::V0(LedgerCloseMetaV0 {
            header: header(10),
            tx_set: TransactionSet {
                previous_ledger_hash: [0; 32],
                txs: vec![tx("GA"), tx("GB")],
            },
            tx_processing: vec![result(1, true, classic()), result(2, false, classic())],
        });
        let all = transactions(&meta, &TransactionFilter::new().include_failed(true), &BorshBatchCodec)
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source_account, "GA");
        assert_eq!(all[0].hash, hex::encode([1u8; 32]));
        assert_eq!(all[1].source_account, "GB");
        assert_eq!(all[1].application_order, 2);
        assert!(!all[1].successful);
        assert!(events(&meta, &EventFilter::new()).is_empty());
    }

    #[test]
    fn generalized_sets_flatten_across_phases_and_clusters() {
        let set = gset(vec![
            TransactionPhase::V0(vec![TxSetComponent {
                base_fee: None,
                txs: vec![tx("GA")],
            }]),
            TransactionPhase::V1(ParallelTxsComponent {
                base_fee: Some(100),
                execution_stages: vec![ParallelTxExecutionStage {
                    clusters: vec![
                        DependentTxCluster { txs: vec![tx("GB")] },
                        DependentTxCluster { txs: vec![tx("GC"), tx("GD")] },
                    ],
                }],
            }),
        ]);
        let meta = LedgerCloseMeta::V2(LedgerCloseMetaV2 {
            header: header(11),
            tx_set: set,
            tx_processing: (1..=4).map(|i| result(i, true, classic())).collect(),
            total_byte_size_of_live_soroban_state: 0,
            evicted_keys: vec![],
        });
        let sources: Vec<_> = transactions(&meta, &TransactionFilter::new(), &BorshBatchCodec)
            .unwrap()
            .into_iter()
            .map(|r| r.source_account)
            .collect();
        assert_eq!(sources, ["GA", "GB", "GC", "GD"]);
    }

    #[test]
    fn count_mismatch_fails_loudly() {
        let meta = LedgerCloseMeta::V1(LedgerCloseMetaV1 {
            header: header(12),
            tx_set: gset(vec![TransactionPhase::V0(vec![TxSetComponent {
                base_fee: None,
                txs: vec![tx("GA"), tx("GB")],
            }])]),
            tx_processing: vec![result(1, true, classic())],
            total_byte_size_of_bucket_list: 0,
            evicted_temporary_ledger_keys: vec![],
        });
        match transactions(&meta, &TransactionFilter::new(), &BorshBatchCodec) {
            Err(LakeError::ResultCountMismatch {
                ledger,
                envelopes,
                results,
            }) => assert_eq!((ledger, envelopes, results), (12, 2, 1)),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn v1_with(metas: Vec<TransactionMeta>) -> LedgerCloseMeta {
        LedgerCloseMeta::V1(LedgerCloseMetaV1 {
            header: header(20),
            tx_set: gset(vec![TransactionPhase::V0(vec![TxSetComponent {
                base_fee: None,
                txs: metas.iter().map(|_| tx("GA")).collect(),
            }])]),
            tx_processing: metas
                .into_iter()
                .enumerate()
                .map(|(i, m)| result(i as u8, true, m))
                .collect(),
            total_byte_size_of_bucket_list: 0,
            evicted_temporary_ledger_keys: vec![],
        })
    }

    #[test]
    fn v3_diagnostics_are_not_double_counted() {
        let meta = v1_with(vec![TransactionMeta::V3(TransactionMetaV3 {
            soroban_meta: Some(SorobanTransactionMeta {
                events: vec![
                    event(ContractEventType::Contract, "transfer"),
                    event(ContractEventType::Diagnostic, "stray"),
                ],
                return_value: ScVal::Void,
                diagnostic_events: vec![
                    DiagnosticEvent {
                        in_successful_contract_call: true,
                        event: event(ContractEventType::Contract, "transfer"),
                    },
                    DiagnosticEvent {
                        in_successful_contract_call: false,
                        event: event(ContractEventType::Diagnostic, "fn_call"),
                    },
                ],
            }),
            ..Default::default()
        })]);

        let all = events(&meta, &EventFilter::new());
        let topics: Vec<_> = all.iter().map(|e| e.topics[0].to_string()).collect();
        assert_eq!(topics, ["sym:transfer", "sym:fn_call"]);
        assert!(!all[1].in_successful_contract_call);

        let contract_only = events(&meta, &EventFilter::new().kind(ContractEventType::Contract));
        assert_eq!(contract_only.len(), 1);
        let diag_only = events(&meta, &EventFilter::new().kind(ContractEventType::Diagnostic));
        assert_eq!(diag_only.len(), 1);
        assert_eq!(diag_only[0].kind, ContractEventType::Diagnostic);
    }

    #[test]
    fn v4_orders_tx_op_and_diagnostic_events() {
        let meta = v1_with(vec![TransactionMeta::V4(TransactionMetaV4 {
            operations: vec![
                OperationMetaV2 {
                    changes: vec![],
                    events: vec![event(ContractEventType::Contract, "op0")],
                },
                OperationMetaV2 {
                    changes: vec![],
                    events: vec![event(ContractEventType::Contract, "op1")],
                },
            ],
            events: vec![
                TransactionEvent {
                    stage: TransactionEventStage::AfterTx,
                    event: event(ContractEventType::System, "refund"),
                },
                TransactionEvent {
                    stage: TransactionEventStage::BeforeAllTxs,
                    event: event(ContractEventType::System, "fee"),
                },
            ],
            diagnostic_events: vec![DiagnosticEvent {
                in_successful_contract_call: true,
                event: event(ContractEventType::Diagnostic, "log"),
            }],
            ..Default::default()
        })]);

        let all = events(&meta, &EventFilter::new());
        let seen: Vec<_> = all
            .iter()
            .map(|e| (e.topics[0].to_string(), e.operation_index))
            .collect();
        assert_eq!(
            seen,
            [
                ("sym:fee".to_string(), None),
                ("sym:op0".to_string(), Some(0)),
                ("sym:op1".to_string(), Some(1)),
                ("sym:refund".to_string(), None),
                ("sym:log".to_string(), None),
            ]
        );
        assert!(all.iter().all(|e| e.transaction_successful && e.contract_id == "C1"));
    }

    #[test]
    fn classic_meta_in_generalized_ledger_yields_nothing() {
        let meta = v1_with(vec![classic()]);
        assert!(events(&meta, &EventFilter::new()).is_empty());
    }
}
