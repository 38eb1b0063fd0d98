//! Portfolio growth projection: a monthly-compounding forward model and
//! bisection solvers for the return, contribution or horizon a target needs.

pub mod api;
pub mod core;
