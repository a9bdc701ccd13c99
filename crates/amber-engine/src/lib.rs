//! The commission lifecycle engine.
//!
//! Owns the indication state machine and everything it drags along:
//! installment generation on approval, reconciliation on reversal, the
//! overdue scan, and the dashboard read models. The HTTP layer and the
//! background scheduler only ever call into this crate.

mod error;
mod generator;
mod lifecycle;
mod overdue;
mod reconciliation;
mod reports;

pub use error::EngineError;
pub use generator::InstallmentGenerator;
pub use lifecycle::{LifecycleManager, TransitionOutcome};
pub use overdue::{OverdueScanOutcome, OverdueScanner};
pub use reconciliation::ReconciliationService;
pub use reports::{
    ActiveAmbassadorStats, CommissionSummary, DashboardStats, MonthlyCommission,
    MonthlyIndications, ReportAggregator, ReportOptions, ReportScope, SegmentConversion,
    TopAmbassador,
};
