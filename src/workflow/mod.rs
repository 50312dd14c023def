//! Decision logic with no I/O: who may move a request where, and which
//! weekdays an employee still has to plan.

pub mod approval;
pub mod planning;
