//! Property test harness: algebraic laws and randomized histories.

mod region_algebra;
