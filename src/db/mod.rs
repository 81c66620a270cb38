//! Database layer: endpoint routing, routed transactions and queries.

pub mod inspection_items;
pub mod inspections;
pub mod masters;
pub mod router;
pub mod store;
pub mod transaction;

pub use router::{DbRouter, Endpoint, EndpointChooser, OperationKind, ReadReplicaRouting, SingleEndpoint};
pub use store::{
    ExportFilter, InspectionRecords, InspectionStore, ItemStore, MasterData, NewInspection,
    NewInspectionItem, StoreTransaction, TransactionSource, finish,
};
pub use transaction::RoutedTransaction;
