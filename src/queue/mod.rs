//! Queue state: membership tracking, eligibility, and processing scheduling

pub mod eligibility;
pub mod membership;
pub mod scheduler;

pub use eligibility::{EligibilityGate, GateDecision, RejectReason};
pub use membership::MembershipTracker;
pub use scheduler::ProcessingScheduler;
