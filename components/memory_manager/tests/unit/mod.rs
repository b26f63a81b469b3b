//! Unit tests for the allocation front end.

mod test_growable;
